//! Built-in edit plugin

use chrono::Utc;
use node_fs::{NormalizedPath, io};

use crate::context::ManagerContext;
use crate::host::Definition;
use crate::identity;
use crate::plugin::{Edit, EditOutcome};
use crate::repository::RepositorySet;
use crate::version::{self, Bump};
use crate::{Error, Result};

const TITLE: &str = "Edit definition";

/// Edits local definitions in place and copies everything else into the
/// edit directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEdit;

impl DefaultEdit {
    /// A definition can be edited where it lives when it is a local file we
    /// can write and it does not belong to a repository.
    fn editable_in_place(repos: &RepositorySet, path: &NormalizedPath) -> bool {
        if repos.is_managed(path) {
            return false;
        }
        let dir_writable = path.parent().is_some_and(|dir| io::is_writable(dir.as_ref()));
        io::is_writable(path.as_ref()) && dir_writable
    }

    fn edit_in_place(
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        definition: &Definition,
        node: &str,
        new_version: Option<&str>,
    ) -> Result<EditOutcome> {
        let Some(version) = new_version else {
            tracing::info!(path = %definition.library_path, "Editing definition in place");
            return Ok(EditOutcome::InPlace {
                type_name: definition.type_name.clone(),
            });
        };

        let type_name = identity::rename(&definition.type_name, None, None, Some(version));
        ctx.host
            .copy_definition_to_file(definition, &definition.library_path, Some(&type_name))?;

        // An indexed edit copy is re-read so the registry sees the new version.
        let holder = repos
            .repo_holding_path(&definition.library_path)
            .map(str::to_string);
        match holder {
            Some(name) => {
                let repo = repos.require_mut(&name)?;
                repo.remove_file(ctx.host.as_ref(), &definition.library_path)?;
                repo.process_node_definition_file(ctx.host.as_ref(), &definition.library_path, true)?;
            }
            None => ctx.host.install(&definition.library_path)?,
        }
        ctx.host.change_node_type(node, &type_name)?;

        tracing::info!(path = %definition.library_path, type_name = %type_name, "Versioned definition in place");
        Ok(EditOutcome::InPlace { type_name })
    }

    /// Copy into the edit directory without a repository to index it.
    fn standalone_copy(
        ctx: &ManagerContext,
        definition: &Definition,
        new_version: Option<&str>,
    ) -> Result<(NormalizedPath, Option<String>)> {
        let renamed = new_version.map(|v| identity::rename(&definition.type_name, None, None, Some(v)));
        let dest = identity::editable_path(
            &ctx.edit_dir,
            &definition.category,
            &definition.type_name,
            None,
            None,
            Utc::now().timestamp(),
        );
        ctx.host
            .copy_definition_to_file(definition, &dest, renamed.as_deref())?;
        ctx.host.install(&dest)?;
        Ok((dest, renamed))
    }
}

impl Edit for DefaultEdit {
    fn name(&self) -> &str {
        "DefaultEdit"
    }

    fn edit_definition(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        bump: Option<Bump>,
    ) -> Result<EditOutcome> {
        let definition = ctx
            .host
            .definition_from_node(node)?
            .ok_or_else(|| Error::NotADigitalAsset {
                node: node.to_string(),
            })?;

        if !repos.is_latest_version(&definition) {
            let message = format!(
                "{} is not the latest version of this node type.\nEdit it anyway?",
                definition.type_name
            );
            if !ctx.host.confirm(&message, TITLE) {
                tracing::info!(type_name = %definition.type_name, "Edit cancelled by user");
                return Ok(EditOutcome::Cancelled);
            }
        }

        let new_version = match bump {
            Some(bump) => {
                let current = definition.version().ok_or_else(|| Error::InvalidVersion {
                    version: definition.type_name.clone(),
                })?;
                Some(version::edit_version(&current, bump)?)
            }
            None => None,
        };

        if Self::editable_in_place(repos, &definition.library_path) {
            return Self::edit_in_place(ctx, repos, &definition, node, new_version.as_deref());
        }

        let (path, renamed) = match repos.release_target(ctx, &definition) {
            Ok(name) => repos.require_mut(&name)?.add_definition_copy(
                ctx,
                &definition,
                None,
                None,
                new_version.as_deref(),
            )?,
            Err(Error::RepositoryNotFound { .. }) => {
                tracing::debug!(type_name = %definition.type_name, "No repository for definition, copying standalone");
                Self::standalone_copy(ctx, &definition, new_version.as_deref())?
            }
            Err(e) => return Err(e),
        };

        if let Some(type_name) = &renamed {
            ctx.host.change_node_type(node, type_name)?;
        }

        if !repos.is_managed(&definition.library_path) {
            tracing::debug!(path = %definition.library_path, "Uninstalling untracked original");
            repos.remove_definition_anywhere(ctx.host.as_ref(), &definition)?;
        }

        let type_name = renamed.unwrap_or(definition.type_name);
        tracing::info!(path = %path, type_name = %type_name, "Definition is editable");
        Ok(EditOutcome::Copied { path, type_name })
    }
}
