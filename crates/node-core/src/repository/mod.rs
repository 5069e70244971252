//! Repository model
//!
//! A [`Repository`] is one source of node definitions. Its directory layout
//! is worked out by the load plugin ([`RepositoryContext`]), its sidecar holds
//! the release baseline ([`RepoConfig`]), and its [`NodeRegistry`] indexes
//! every definition loaded from it.

mod config;
mod set;

pub use config::{RepoConfig, SIDECAR_PATH};
pub use set::RepositorySet;

use std::sync::Arc;

use chrono::Utc;
use node_fs::NormalizedPath;

use crate::context::ManagerContext;
use crate::host::{Definition, Host};
use crate::identity;
use crate::plugin::Load;
use crate::registry::{NodeRegistry, NodeTypeVersion};
use crate::Result;

/// Definition file extensions a load directory is scanned for.
pub const RECOGNISED_EXTENSIONS: [&str; 4] = [".hda", ".hdanc", ".otl", ".otlnc"];

/// Directory layout of one repository, as resolved by its load plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryContext {
    /// Stable repository name
    pub name: String,
    /// Location as configured: a directory, remote URL or package root
    pub location: String,
    /// Root of everything the manager keeps for this repository
    pub work_root: NormalizedPath,
    /// Source-control working copy, for git-backed repositories
    pub clone_dir: Option<NormalizedPath>,
    /// Directory holding the installable definition files
    pub load_path: NormalizedPath,
    /// Sidecar configuration file
    pub config_path: NormalizedPath,
    pub backup_dir: NormalizedPath,
    /// Scratch space for expanding definitions during a release
    pub release_dir: NormalizedPath,
    /// Remote releases are pushed to
    pub remote_url: Option<String>,
}

impl RepositoryContext {
    /// Directories whose files belong to this repository.
    pub fn roots(&self) -> Vec<&NormalizedPath> {
        let mut roots = vec![&self.work_root, &self.load_path];
        if let Some(clone) = &self.clone_dir {
            roots.push(clone);
        }
        roots
    }
}

/// One source of node definitions.
pub struct Repository {
    context: RepositoryContext,
    loader: Arc<dyn Load>,
    registry: NodeRegistry,
    config: RepoConfig,
}

impl Repository {
    /// Resolve the repository at `location` and read its sidecar.
    pub fn new(ctx: &ManagerContext, location: &str, loader: Arc<dyn Load>) -> Result<Self> {
        let context = loader.resolve(ctx, location)?;
        Self::from_context(context, loader)
    }

    pub fn from_context(context: RepositoryContext, loader: Arc<dyn Load>) -> Result<Self> {
        let config = RepoConfig::load(&context.config_path)?;
        tracing::debug!(repo = %context.name, location = %context.location, "Initialised repository");
        Ok(Self {
            context,
            loader,
            registry: NodeRegistry::new(),
            config,
        })
    }

    /// Name derived from the location or the sidecar; stable across reloads.
    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn context(&self) -> &RepositoryContext {
        &self.context
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn loader(&self) -> &Arc<dyn Load> {
        &self.loader
    }

    /// Whether `path` lives under one of the repository roots.
    pub fn owns_path(&self, path: &NormalizedPath) -> bool {
        self.context.roots().into_iter().any(|root| path.starts_with(root))
    }

    /// Point the repository at a new location; takes effect on the next
    /// forced [`Repository::load_nodes`].
    pub fn relocate(&mut self, location: impl Into<String>) {
        self.context.location = location.into();
    }

    /// Reload the sidecar from disk.
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = RepoConfig::load(&self.context.config_path)?;
        Ok(())
    }

    /// Record a new release baseline in the sidecar.
    pub fn set_baseline(&mut self, version: &str) -> Result<()> {
        self.config.version = Some(version.to_string());
        self.config.save(&self.context.config_path)
    }

    /// Load every definition file the load plugin provides.
    ///
    /// `force` uninstalls what was loaded before, clears the registry and
    /// resolves the repository layout again. Returns the number of files
    /// processed.
    pub fn load_nodes(&mut self, ctx: &ManagerContext, force: bool) -> Result<usize> {
        if force {
            self.unload(ctx.host.as_ref())?;
            let name = self.context.name.clone();
            self.context = self.loader.resolve(ctx, &self.context.location)?;
            if self.context.name != name {
                tracing::warn!(old = %name, new = %self.context.name, "Repository name changed on reload");
            }
        }

        let files = self.loader.load(ctx, &self.context)?;
        self.reload_config()?;

        for file in &files {
            self.process_node_definition_file(ctx.host.as_ref(), file, true)?;
        }

        tracing::info!(
            repo = %self.context.name,
            files = files.len(),
            node_types = self.registry.len(),
            "Loaded repository"
        );
        Ok(files.len())
    }

    fn unload(&mut self, host: &dyn Host) -> Result<()> {
        let mut installed: Vec<NormalizedPath> = self
            .registry
            .node_types()
            .values()
            .flat_map(|t| t.all_versions().values())
            .flatten()
            .filter(|v| v.installed)
            .map(|v| v.path.clone())
            .collect();
        installed.sort();
        installed.dedup();

        for path in &installed {
            host.uninstall(path)?;
        }
        self.registry.clear();
        Ok(())
    }

    /// Index every definition inside one library file.
    ///
    /// Types matching the sidecar `ophide` list are hidden when installed.
    pub fn process_node_definition_file(
        &mut self,
        host: &dyn Host,
        path: &NormalizedPath,
        install: bool,
    ) -> Result<Vec<Definition>> {
        let definitions = host.definitions_in_file(path)?;
        if definitions.is_empty() {
            tracing::debug!(path = %path, "No definitions in file");
        }

        for definition in &definitions {
            let hidden = self.config.is_hidden(&definition.type_name);
            let entry = self.registry.process_definition(definition.clone(), hidden);
            if install {
                entry.install(host)?;
            }
        }
        Ok(definitions)
    }

    pub fn process_definition(&mut self, definition: Definition, hidden: bool) -> &mut NodeTypeVersion {
        self.registry.process_definition(definition, hidden)
    }

    /// Remove a definition from the registry, uninstalling it if it was
    /// installed through this repository.
    pub fn remove_definition(&mut self, host: &dyn Host, definition: &Definition) -> Result<NodeTypeVersion> {
        let removed = self.registry.remove_definition(definition)?;
        if removed.installed {
            host.uninstall(&removed.path)?;
        }
        tracing::debug!(repo = %self.context.name, type_name = %definition.type_name, "Removed definition");
        Ok(removed)
    }

    /// Remove every registry entry loaded from `path`.
    pub fn remove_file(&mut self, host: &dyn Host, path: &NormalizedPath) -> Result<usize> {
        let definitions: Vec<Definition> = self
            .registry
            .node_types()
            .values()
            .flat_map(|t| t.all_versions().values())
            .flatten()
            .filter(|v| &v.path == path)
            .map(|v| v.definition.clone())
            .collect();

        for definition in &definitions {
            self.remove_definition(host, definition)?;
        }
        Ok(definitions.len())
    }

    /// Copy a definition into the edit directory, optionally renaming it.
    ///
    /// The copy is indexed and installed straight away. Returns the new file
    /// and the new type name, or `None` when the identity is unchanged.
    pub fn add_definition_copy(
        &mut self,
        ctx: &ManagerContext,
        definition: &Definition,
        namespace: Option<&str>,
        name: Option<&str>,
        version: Option<&str>,
    ) -> Result<(NormalizedPath, Option<String>)> {
        let renamed = (namespace.is_some() || name.is_some() || version.is_some())
            .then(|| identity::rename(&definition.type_name, namespace, name, version));

        let dest = identity::editable_path(
            &ctx.edit_dir,
            &definition.category,
            &definition.type_name,
            namespace,
            name,
            Utc::now().timestamp(),
        );

        ctx.host
            .copy_definition_to_file(definition, &dest, renamed.as_deref())?;
        self.process_node_definition_file(ctx.host.as_ref(), &dest, true)?;

        tracing::info!(
            repo = %self.context.name,
            path = %dest,
            type_name = renamed.as_deref().unwrap_or(&definition.type_name),
            "Created editable copy"
        );
        Ok((dest, renamed))
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("context", &self.context)
            .field("loader", &self.loader.name())
            .field("node_types", &self.registry.len())
            .finish()
    }
}
