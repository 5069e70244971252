//! Every repository the manager has discovered

use std::collections::BTreeMap;

use node_fs::NormalizedPath;

use crate::context::ManagerContext;
use crate::host::{Definition, Host};
use crate::repository::Repository;
use crate::version::Version;
use crate::{Error, Result};

/// Repositories keyed by name.
#[derive(Debug, Default)]
pub struct RepositorySet {
    repos: BTreeMap<String, Repository>,
}

impl RepositorySet {
    pub fn new(repos: BTreeMap<String, Repository>) -> Self {
        Self { repos }
    }

    pub fn insert(&mut self, repo: Repository) {
        self.repos.insert(repo.name().to_string(), repo);
    }

    pub fn get(&self, name: &str) -> Option<&Repository> {
        self.repos.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Repository> {
        self.repos.get_mut(name)
    }

    /// Like [`RepositorySet::get_mut`], failing when the name is unknown.
    pub fn require_mut(&mut self, name: &str) -> Result<&mut Repository> {
        self.repos
            .get_mut(name)
            .ok_or_else(|| Error::RepositoryNotFound {
                target: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Repository> {
        self.repos.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Repository> {
        self.repos.values_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.repos.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    /// Repository whose roots contain `path`.
    ///
    /// Only a strict prefix match counts; there is no fallback repository.
    pub fn repo_for_file(&self, path: &NormalizedPath) -> Option<&Repository> {
        self.repos.values().find(|repo| repo.owns_path(path))
    }

    /// Whether `path` belongs to a repository rather than a local edit.
    pub fn is_managed(&self, path: &NormalizedPath) -> bool {
        self.repo_for_file(path).is_some()
    }

    /// Name of the repository whose registry indexes `path`.
    pub fn repo_holding_path(&self, path: &NormalizedPath) -> Option<&str> {
        self.repos
            .values()
            .find(|repo| repo.registry().contains_path(path))
            .map(Repository::name)
    }

    fn known_versions<'a>(&'a self, definition: &'a Definition) -> impl Iterator<Item = Version> + 'a {
        let key = definition.lookup_key();
        self.repos
            .values()
            .filter_map(move |repo| repo.registry().get(&key))
            .flat_map(|node_type| node_type.all_versions().keys())
            .filter_map(|v| v.parse().ok())
    }

    /// Whether no loaded version of the node type is newer than `definition`.
    ///
    /// Definitions without a parsable version count as latest.
    pub fn is_latest_version(&self, definition: &Definition) -> bool {
        let Some(current) = definition.version().and_then(|v| v.parse::<Version>().ok()) else {
            return true;
        };
        self.known_versions(definition).all(|v| v <= current)
    }

    /// Whether another file provides a version with the same major.
    pub fn has_same_major(&self, definition: &Definition) -> bool {
        let Some(current) = definition.version().and_then(|v| v.parse::<Version>().ok()) else {
            return false;
        };
        let key = definition.lookup_key();
        self.repos
            .values()
            .filter_map(|repo| repo.registry().get(&key))
            .any(|node_type| node_type.has_major(current.major, definition))
    }

    /// Repository a definition should be released into.
    ///
    /// In order: the repository owning the file, the repository whose
    /// registry indexes it, then the configured release repository.
    pub fn release_target(&self, ctx: &ManagerContext, definition: &Definition) -> Result<String> {
        if let Some(repo) = self.repo_for_file(&definition.library_path) {
            return Ok(repo.name().to_string());
        }
        if let Some(name) = self.repo_holding_path(&definition.library_path) {
            return Ok(name.to_string());
        }
        match &ctx.config.release_repo {
            Some(name) if self.repos.contains_key(name) => Ok(name.clone()),
            Some(name) => Err(Error::RepositoryNotFound {
                target: name.clone(),
            }),
            None => Err(Error::RepositoryNotFound {
                target: definition.library_path.to_string(),
            }),
        }
    }

    /// Remove a definition from whichever registry indexes its file, or just
    /// uninstall it when none does.
    pub fn remove_definition_anywhere(&mut self, host: &dyn Host, definition: &Definition) -> Result<()> {
        let holder = self
            .repo_holding_path(&definition.library_path)
            .map(str::to_string);
        match holder {
            Some(name) => {
                self.require_mut(&name)?.remove_definition(host, definition)?;
            }
            None => host.uninstall(&definition.library_path)?,
        }
        Ok(())
    }

    /// Drop every entry indexed from `path` and uninstall the file.
    pub fn remove_file_anywhere(&mut self, host: &dyn Host, path: &NormalizedPath) -> Result<()> {
        let holder = self.repo_holding_path(path).map(str::to_string);
        if let Some(name) = holder {
            let removed = self.require_mut(&name)?.remove_file(host, path)?;
            tracing::debug!(repo = %name, path = %path, removed, "Removed indexed file");
        }
        host.uninstall(path)?;
        Ok(())
    }

    /// Load every repository.
    pub fn load_all(&mut self, ctx: &ManagerContext, force: bool) -> Result<usize> {
        let mut files = 0;
        for repo in self.repos.values_mut() {
            files += repo.load_nodes(ctx, force)?;
        }
        Ok(files)
    }
}
