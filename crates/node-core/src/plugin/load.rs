//! Built-in load plugins
//!
//! - [`DefaultLoad`]: a plain directory of definition files
//! - [`GitLoad`]: a git remote holding expanded definitions
//! - [`PackageLoad`]: a resolved package root, laid out as
//!   `{packages_root}/{name}/{version}`

use node_fs::{NormalizedPath, io};
use node_git::GitCheckout;

use crate::context::ManagerContext;
use crate::plugin::Load;
use crate::repository::{RECOGNISED_EXTENSIONS, RepoConfig, RepositoryContext, SIDECAR_PATH};
use crate::{Error, Result};

/// Where expanded definitions live inside a repository or package.
pub const EXPANDED_SUBDIR: &str = "dcc/houdini/hda";

const CLONE_DEPTH: i32 = 1;

/// Definition files directly inside `dir`, sorted.
fn definition_files(dir: &NormalizedPath) -> Result<Vec<NormalizedPath>> {
    if !dir.is_dir() {
        return Err(Error::LoadPathMissing {
            path: dir.to_native(),
        });
    }
    let files = io::list_files_with_extensions(dir.as_ref(), &RECOGNISED_EXTENSIONS)?;
    Ok(files.into_iter().map(NormalizedPath::new).collect())
}

/// Repository name from a remote URL.
///
/// `git@host:studio/tools.git` -> `tools`
fn repo_name_from_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':', '\\']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// A plain directory of definition files.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLoad;

impl Load for DefaultLoad {
    fn name(&self) -> &str {
        "DefaultLoad"
    }

    fn resolve(&self, ctx: &ManagerContext, location: &str) -> Result<RepositoryContext> {
        let root = NormalizedPath::canonical(location);
        let config_path = root.join(SIDECAR_PATH);
        let config = RepoConfig::load(&config_path)?;
        let name = config
            .name
            .or_else(|| root.file_name().map(str::to_string))
            .unwrap_or_else(|| location.to_string());

        Ok(RepositoryContext {
            location: location.to_string(),
            work_root: root.clone(),
            clone_dir: None,
            load_path: root,
            config_path,
            backup_dir: ctx.base_subdir("backup", &name),
            release_dir: ctx.base_subdir("release", &name),
            remote_url: None,
            name,
        })
    }

    fn load(&self, _ctx: &ManagerContext, repo: &RepositoryContext) -> Result<Vec<NormalizedPath>> {
        definition_files(&repo.load_path)
    }
}

/// A git remote holding definitions expanded under [`EXPANDED_SUBDIR`].
///
/// The remote is cloned into `{base}/repos/{name}/clone` and every expanded
/// definition is collapsed into `{base}/repos/{name}/load`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitLoad;

impl Load for GitLoad {
    fn name(&self) -> &str {
        "GitLoad"
    }

    fn resolve(&self, ctx: &ManagerContext, location: &str) -> Result<RepositoryContext> {
        let name = repo_name_from_url(location);
        if name.is_empty() {
            return Err(Error::configuration(format!(
                "cannot derive a repository name from '{}'",
                location
            )));
        }
        let work_root = ctx.base_subdir("repos", &name);
        let clone_dir = work_root.join("clone");

        Ok(RepositoryContext {
            location: location.to_string(),
            config_path: clone_dir.join(SIDECAR_PATH),
            load_path: work_root.join("load"),
            backup_dir: work_root.join("backup"),
            release_dir: work_root.join("release"),
            clone_dir: Some(clone_dir),
            remote_url: Some(location.to_string()),
            work_root,
            name,
        })
    }

    fn load(&self, ctx: &ManagerContext, repo: &RepositoryContext) -> Result<Vec<NormalizedPath>> {
        let clone_dir = repo.clone_dir.as_ref().ok_or_else(|| {
            Error::configuration(format!("repository '{}' has no clone directory", repo.name))
        })?;
        let url = repo.remote_url.as_deref().unwrap_or(&repo.location);

        GitCheckout::open_or_clone(url, clone_dir, Some(CLONE_DEPTH))?;

        std::fs::create_dir_all(repo.load_path.to_native())
            .map_err(|e| node_fs::Error::io(repo.load_path.to_native(), e))?;

        let expanded_root = clone_dir.join(EXPANDED_SUBDIR);
        if !expanded_root.is_dir() {
            tracing::warn!(repo = %repo.name, path = %expanded_root, "Repository has no expanded definitions");
            return definition_files(&repo.load_path);
        }

        let mut expanded: Vec<_> = std::fs::read_dir(expanded_root.to_native())
            .map_err(|e| node_fs::Error::io(expanded_root.to_native(), e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        expanded.sort();

        for dir in &expanded {
            let Some(file_name) = dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let dest = repo.load_path.join(file_name);
            ctx.archive.collapse(dir, dest.as_ref())?;
        }
        tracing::debug!(repo = %repo.name, collapsed = expanded.len(), "Collapsed expanded definitions");

        definition_files(&repo.load_path)
    }
}

/// A package root produced by the package release command.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageLoad;

impl Load for PackageLoad {
    fn name(&self) -> &str {
        "PackageLoad"
    }

    fn resolve(&self, ctx: &ManagerContext, location: &str) -> Result<RepositoryContext> {
        let root = NormalizedPath::canonical(location);
        let config_path = root.join(SIDECAR_PATH);
        let config = RepoConfig::load(&config_path)?;
        let name = config
            .name
            .clone()
            .or_else(|| root.parent().and_then(|p| p.file_name().map(str::to_string)))
            .or_else(|| root.file_name().map(str::to_string))
            .unwrap_or_else(|| location.to_string());
        let work_root = ctx.base_subdir("repos", &name);

        Ok(RepositoryContext {
            location: location.to_string(),
            load_path: root.join(EXPANDED_SUBDIR),
            config_path,
            clone_dir: Some(work_root.join("clone")),
            backup_dir: work_root.join("backup"),
            release_dir: work_root.join("release"),
            remote_url: config.repo_url,
            work_root,
            name,
        })
    }

    fn load(&self, _ctx: &ManagerContext, repo: &RepositoryContext) -> Result<Vec<NormalizedPath>> {
        definition_files(&repo.load_path)
    }
}
