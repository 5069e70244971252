//! git2-backed working copy

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{BranchType, IndexAddOption, ObjectType, Repository, ResetType, StatusOptions};
use node_fs::NormalizedPath;

use crate::helpers;
use crate::naming::validate_branch_name;
use crate::provider::SourceControl;
use crate::{DEFAULT_REMOTE, Error, Result};

/// A local git working copy.
///
/// The repository is reopened for every operation, so a `GitCheckout` is
/// cheap to hold and safe to move between threads.
#[derive(Debug, Clone)]
pub struct GitCheckout {
    root: NormalizedPath,
}

impl GitCheckout {
    /// Open an existing working copy.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        Repository::open(root).map_err(|_| Error::NotARepository {
            path: root.to_path_buf(),
        })?;
        Ok(Self {
            root: NormalizedPath::new(root),
        })
    }

    /// Clone `url` into `dest`.
    pub fn clone(url: &str, dest: impl AsRef<Path>, depth: Option<i32>) -> Result<Self> {
        let dest = dest.as_ref();
        tracing::info!(url = %url, dest = %dest.display(), "Cloning repository");
        helpers::clone_repo(url, dest, depth)?;
        Ok(Self {
            root: NormalizedPath::new(dest),
        })
    }

    /// Open `dest` when it already holds a working copy, otherwise clone
    /// `url` into it.
    ///
    /// An existing working copy is pulled on its current branch.
    pub fn open_or_clone(url: &str, dest: impl AsRef<Path>, depth: Option<i32>) -> Result<Self> {
        let dest = dest.as_ref();
        if dest.join(".git").exists() {
            let checkout = Self::open(dest)?;
            checkout.pull(None, None)?;
            return Ok(checkout);
        }
        Self::clone(url, dest, depth)
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(self.root.to_native()).map_err(|_| Error::NotARepository {
            path: self.root.to_native(),
        })
    }
}

impl SourceControl for GitCheckout {
    fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn current_branch(&self) -> Result<String> {
        let repo = self.repo()?;
        let head = repo.head()?;
        if !head.is_branch() {
            return Err(Error::DetachedHead {
                path: self.root.to_native(),
            });
        }
        head.shorthand()
            .map(str::to_string)
            .ok_or_else(|| Error::DetachedHead {
                path: self.root.to_native(),
            })
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        validate_branch_name(name)?;
        let repo = self.repo()?;
        let head_commit = repo.head()?.peel_to_commit()?;
        repo.branch(name, &head_commit, false)?;
        tracing::debug!(branch = %name, "Created branch");
        Ok(())
    }

    fn checkout(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let refname = format!("refs/heads/{}", name);
        let target = repo
            .revparse_single(&refname)
            .map_err(|_| Error::BranchNotFound {
                name: name.to_string(),
            })?;
        repo.checkout_tree(&target, Some(CheckoutBuilder::new().force()))?;
        repo.set_head(&refname)?;
        tracing::debug!(branch = %name, "Checked out");
        Ok(())
    }

    fn add_all(&self) -> Result<()> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;
        Ok(())
    }

    fn has_changes(&self) -> Result<bool> {
        let repo = self.repo()?;
        let mut options = StatusOptions::new();
        options.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    fn commit(&self, message: &str) -> Result<String> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let sig = helpers::signature(&repo)?;

        let parent = match repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        tracing::debug!(commit = %oid, "Committed");
        Ok(oid.to_string())
    }

    fn push(&self, remote: Option<&str>, branch: Option<&str>, set_upstream: bool) -> Result<()> {
        let repo = self.repo()?;
        let remote = remote.unwrap_or(DEFAULT_REMOTE);
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch()?,
        };

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        helpers::push_refspecs(&repo, remote, &[refspec.as_str()])?;

        if set_upstream {
            let mut config = repo.config()?;
            config.set_str(&format!("branch.{}.remote", branch), remote)?;
            config.set_str(
                &format!("branch.{}.merge", branch),
                &format!("refs/heads/{}", branch),
            )?;
        }
        Ok(())
    }

    fn pull(&self, remote: Option<&str>, branch: Option<&str>) -> Result<()> {
        let repo = self.repo()?;
        let remote = remote.unwrap_or(DEFAULT_REMOTE);
        let branch = match branch {
            Some(b) => b.to_string(),
            None => self.current_branch()?,
        };
        helpers::pull(&repo, remote, &branch)
    }

    fn create_tag(&self, name: &str, message: &str) -> Result<()> {
        let repo = self.repo()?;
        let target = repo.head()?.peel(ObjectType::Commit)?;
        let sig = helpers::signature(&repo)?;
        repo.tag(name, &target, &sig, message, false)?;
        tracing::debug!(tag = %name, "Created tag");
        Ok(())
    }

    fn push_tag(&self, remote: Option<&str>, tag: &str) -> Result<()> {
        let repo = self.repo()?;
        let refspec = format!("refs/tags/{0}:refs/tags/{0}", tag);
        helpers::push_refspecs(&repo, remote.unwrap_or(DEFAULT_REMOTE), &[refspec.as_str()])
    }

    fn fetch_tags(&self, remote: Option<&str>) -> Result<()> {
        let repo = self.repo()?;
        helpers::fetch_tags(&repo, remote.unwrap_or(DEFAULT_REMOTE))
    }

    fn tags(&self) -> Result<Vec<String>> {
        let repo = self.repo()?;
        let names = repo.tag_names(None)?;
        Ok(names.iter().flatten().map(str::to_string).collect())
    }

    fn merge_no_ff(&self, source: &str) -> Result<()> {
        let repo = self.repo()?;
        helpers::merge_no_ff(&repo, source)
    }

    fn delete_remote_branch(&self, remote: Option<&str>, branch: &str) -> Result<()> {
        let repo = self.repo()?;
        let refspec = format!(":refs/heads/{}", branch);
        helpers::push_refspecs(&repo, remote.unwrap_or(DEFAULT_REMOTE), &[refspec.as_str()])
    }

    fn delete_branch(&self, name: &str) -> Result<()> {
        let repo = self.repo()?;
        let mut branch =
            repo.find_branch(name, BranchType::Local)
                .map_err(|_| Error::BranchNotFound {
                    name: name.to_string(),
                })?;
        branch.delete()?;
        Ok(())
    }

    fn reset_hard(&self) -> Result<()> {
        let repo = self.repo()?;
        let head = repo.head()?.peel(ObjectType::Commit)?;
        repo.reset(&head, ResetType::Hard, None)?;
        Ok(())
    }
}
