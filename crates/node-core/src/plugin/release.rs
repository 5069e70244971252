//! Built-in release plugins
//!
//! [`DefaultRelease`] copies the definition straight into the repository's
//! load directory. [`GitRelease`] expands it into a clone of the repository
//! and runs the branch/commit/tag/merge sequence. [`PackageRelease`] does the
//! same and then runs the package release command on the tagged clone.
//!
//! A source-control failure aborts the release where it happened. The
//! release branch and staging directory are left behind for inspection.

use chrono::Utc;
use node_fs::{NormalizedPath, io};
use node_git::{DEFAULT_MAIN_BRANCH, GitCheckout, SourceControl};

use crate::backup::BackupManager;
use crate::context::ManagerContext;
use crate::host::Definition;
use crate::identity;
use crate::plugin::{EXPANDED_SUBDIR, Release, ReleaseOutcome};
use crate::repository::{RepoConfig, Repository, RepositorySet, SIDECAR_PATH};
use crate::tools::ReleaseCommand;
use crate::version::{self, Bump, Version};
use crate::{Error, Result};

const TITLE: &str = "Publish definition";

/// Commit message of the sidecar version bump.
pub const VERSION_UP_MESSAGE: &str = "Version up";

fn default_comment(definition: &Definition) -> String {
    format!("Updated {}", definition.name())
}

/// Whether `dir` or any registry holds another version of the definition
/// with the same major.
fn same_major_exists(repos: &RepositorySet, definition: &Definition, dir: &NormalizedPath) -> Result<bool> {
    let Some(current) = definition.version().and_then(|v| v.parse::<Version>().ok()) else {
        return Ok(false);
    };
    if repos.has_same_major(definition) {
        return Ok(true);
    }
    if !dir.is_dir() {
        return Ok(false);
    }

    let pattern = version::same_major_pattern(
        definition.namespace().as_deref(),
        &definition.name(),
        current.major,
    )?;
    let entries = std::fs::read_dir(dir.to_native()).map_err(|e| node_fs::Error::io(dir.to_native(), e))?;
    Ok(entries
        .filter_map(|entry| entry.ok())
        .any(|entry| pattern.is_match(&entry.file_name().to_string_lossy())))
}

/// Drop the edited copy once its content lives in a repository.
fn retire_edited_copy(ctx: &ManagerContext, repos: &mut RepositorySet, definition: &Definition) -> Result<()> {
    if repos.is_managed(&definition.library_path) {
        return Ok(());
    }
    repos.remove_file_anywhere(ctx.host.as_ref(), &definition.library_path)
}

/// Copies definitions into the repository load directory.
///
/// A file already at the target is moved to the repository backup
/// directory first.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRelease;

impl Release for DefaultRelease {
    fn name(&self) -> &str {
        "DefaultRelease"
    }

    fn release(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        comment: Option<&str>,
    ) -> Result<ReleaseOutcome> {
        let definition = ctx.host.update_definition_from_node(node)?;
        let repo_name = repos.release_target(ctx, &definition)?;
        let comment = comment.map(str::to_string).unwrap_or_else(|| default_comment(&definition));

        let (load_path, backup_dir, baseline) = {
            let repo = repos.require_mut(&repo_name)?;
            (
                repo.context().load_path.clone(),
                repo.context().backup_dir.clone(),
                repo.config().baseline().to_string(),
            )
        };

        let target = load_path.join(&definition.expanded_name());
        let target_exists = target.is_file();
        let bump = Bump::classify(target_exists, same_major_exists(repos, &definition, &load_path)?);
        let version = version::release_version::<&str>(&baseline, bump, &[])?;
        tracing::info!(
            repo = %repo_name,
            type_name = %definition.type_name,
            %bump,
            %version,
            comment = %comment,
            "Releasing definition"
        );

        let repo = repos.require_mut(&repo_name)?;
        if target_exists {
            repo.remove_file(ctx.host.as_ref(), &target)?;
            if target != definition.library_path {
                BackupManager::new(backup_dir).backup_file(&target, "release")?;
            }
        }
        ctx.host.copy_definition_to_file(&definition, &target, None)?;
        repo.process_node_definition_file(ctx.host.as_ref(), &target, true)?;
        repo.set_baseline(&version.to_string())?;

        retire_edited_copy(ctx, repos, &definition)?;

        ctx.host.display_message(
            &format!(
                "Released {} to '{}' as version {}",
                definition.type_name, repo_name, version
            ),
            TITLE,
        );
        Ok(ReleaseOutcome::Released {
            version,
            branch: None,
            path: target,
        })
    }
}

/// Runs after the release tag is pushed and before the branch is merged.
type AfterTag<'a> = dyn Fn(&ManagerContext, &mut Repository, &GitCheckout, &Version) -> Result<()> + 'a;

/// The source-control release sequence shared by [`GitRelease`] and
/// [`PackageRelease`].
fn run_git_release(
    ctx: &ManagerContext,
    repos: &mut RepositorySet,
    node: &str,
    comment: Option<&str>,
    after_tag: &AfterTag<'_>,
) -> Result<ReleaseOutcome> {
    let definition = ctx.host.update_definition_from_node(node)?;
    let repo_name = repos.release_target(ctx, &definition)?;
    let comment = comment.map(str::to_string).unwrap_or_else(|| default_comment(&definition));

    let (clone_dir, remote, release_dir) = {
        let repo = repos.require_mut(&repo_name)?;
        let context = repo.context();
        let clone_dir = context.clone_dir.clone().ok_or_else(|| {
            Error::configuration(format!("repository '{}' has no clone directory", repo_name))
        })?;
        let remote = context.remote_url.clone().ok_or_else(|| {
            Error::configuration(format!("repository '{}' has no release remote", repo_name))
        })?;
        (clone_dir, remote, context.release_dir.clone())
    };

    let checkout = GitCheckout::open_or_clone(&remote, &clone_dir, None)?;
    if checkout.current_branch()? != DEFAULT_MAIN_BRANCH {
        checkout.checkout(DEFAULT_MAIN_BRANCH)?;
        checkout.pull(None, Some(DEFAULT_MAIN_BRANCH))?;
    }
    checkout.fetch_tags(None)?;

    let expanded_name = definition.expanded_name();
    let now = Utc::now();
    let staging = release_dir.join(&format!("release_{}", now.format("%Y%m%d%H%M%S%f")));
    let expanded = staging.join(&expanded_name);
    std::fs::create_dir_all(staging.to_native()).map_err(|e| node_fs::Error::io(staging.to_native(), e))?;
    ctx.archive.expand(definition.library_path.as_ref(), expanded.as_ref())?;

    let branch = identity::release_branch_name(&definition.category, &definition.type_name, now);
    checkout.create_branch(&branch)?;
    checkout.checkout(&branch)?;

    let hda_dir = clone_dir.join(EXPANDED_SUBDIR);
    let target = hda_dir.join(&expanded_name);
    let target_exists = target.is_dir();
    if target_exists {
        std::fs::remove_dir_all(target.to_native()).map_err(|e| node_fs::Error::io(target.to_native(), e))?;
    }
    let bump = Bump::classify(target_exists, same_major_exists(repos, &definition, &hda_dir)?);

    let sidecar_path = clone_dir.join(SIDECAR_PATH);
    let mut sidecar = RepoConfig::load(&sidecar_path)?;
    let taken = checkout.tags()?;
    let version = version::release_version(sidecar.baseline(), bump, &taken)?;
    tracing::info!(
        repo = %repo_name,
        type_name = %definition.type_name,
        branch = %branch,
        %bump,
        %version,
        "Releasing definition"
    );

    io::copy_dir_all(expanded.as_ref(), target.as_ref())?;
    if !checkout.has_changes()? {
        tracing::info!(type_name = %definition.type_name, "Nothing changed, abandoning release");
        checkout.checkout(DEFAULT_MAIN_BRANCH)?;
        checkout.delete_branch(&branch)?;
        ctx.host.display_message(
            &format!("{} is identical to the released definition", definition.type_name),
            TITLE,
        );
        return Ok(ReleaseOutcome::NoChanges);
    }

    checkout.add_all()?;
    checkout.commit(&comment)?;
    checkout.push(None, Some(&branch), true)?;

    sidecar.version = Some(version.to_string());
    sidecar.save(&sidecar_path)?;
    checkout.add_all()?;
    checkout.commit(VERSION_UP_MESSAGE)?;
    checkout.push(None, Some(&branch), false)?;

    let tag = version.to_string();
    checkout.create_tag(&tag, &format!("Release {}", tag))?;
    checkout.push_tag(None, &tag)?;

    after_tag(ctx, repos.require_mut(&repo_name)?, &checkout, &version)?;

    checkout.reset_hard()?;
    checkout.checkout(DEFAULT_MAIN_BRANCH)?;
    checkout.pull(None, Some(DEFAULT_MAIN_BRANCH))?;
    checkout.merge_no_ff(&branch)?;
    checkout.push(None, Some(DEFAULT_MAIN_BRANCH), false)?;
    checkout.delete_remote_branch(None, &branch)?;
    checkout.delete_branch(&branch)?;

    retire_edited_copy(ctx, repos, &definition)?;
    let repo = repos.require_mut(&repo_name)?;
    repo.load_nodes(ctx, true)?;

    ctx.host.display_message(
        &format!(
            "Released {} to '{}' as version {}",
            definition.type_name, repo_name, version
        ),
        TITLE,
    );
    Ok(ReleaseOutcome::Released {
        version,
        branch: Some(branch),
        path: repo.context().load_path.join(&expanded_name),
    })
}

/// Releases through a git remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRelease;

impl Release for GitRelease {
    fn name(&self) -> &str {
        "GitRelease"
    }

    fn release(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        comment: Option<&str>,
    ) -> Result<ReleaseOutcome> {
        run_git_release(ctx, repos, node, comment, &|_, _, _, _| Ok(()))
    }
}

/// [`GitRelease`] followed by the package release command.
///
/// The command runs in the clone with the release tag checked out and must
/// produce `{packages_root}/{repo}/{version}`. The repository is then
/// reloaded from that package.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageRelease;

impl Release for PackageRelease {
    fn name(&self) -> &str {
        "PackageRelease"
    }

    fn release(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        comment: Option<&str>,
    ) -> Result<ReleaseOutcome> {
        let command = ctx
            .config
            .release_command
            .as_deref()
            .ok_or_else(|| Error::configuration("package release needs a release command"))
            .and_then(ReleaseCommand::parse)?;
        let packages_root = ctx
            .config
            .packages_root
            .as_ref()
            .map(NormalizedPath::new)
            .ok_or_else(|| Error::configuration("package release needs a packages root"))?;

        run_git_release(ctx, repos, node, comment, &|_, repo, checkout, version| {
            command.run(checkout.root().as_ref())?;

            let artifact = packages_root.join(repo.name()).join(&version.to_string());
            if !artifact.is_dir() {
                return Err(Error::MissingArtifact {
                    path: artifact.to_native(),
                });
            }
            tracing::info!(repo = %repo.name(), package = %artifact, "Package released");
            repo.relocate(artifact.as_str());
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_comment_uses_name() {
        let definition = Definition::new("studio::box::2.0", "Sop", "/edit/box.hda");
        assert_eq!(default_comment(&definition), "Updated box");
    }

    #[test]
    fn test_same_major_found_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("Sop_studio.box.2.1.hda")).unwrap();
        let dir = NormalizedPath::new(temp.path());
        let repos = RepositorySet::default();

        let same = Definition::new("studio::box::2.0", "Sop", "/edit/box.hda");
        let other = Definition::new("studio::box::3.0", "Sop", "/edit/box.hda");
        assert!(same_major_exists(&repos, &same, &dir).unwrap());
        assert!(!same_major_exists(&repos, &other, &dir).unwrap());
    }

    #[test]
    fn test_same_major_without_version() {
        let repos = RepositorySet::default();
        let definition = Definition::new("box", "Sop", "/edit/box.hda");
        assert!(!same_major_exists(&repos, &definition, &NormalizedPath::new("/nowhere")).unwrap());
    }
}
