//! Source-control trait consumed by the release workflow

use crate::Result;
use node_fs::NormalizedPath;

/// Source-control primitives for a single working copy.
///
/// Every method is synchronous and blocking. Implementations must not retry
/// internally: a failed push or merge is reported to the caller as-is.
pub trait SourceControl {
    /// Root of the working copy.
    fn root(&self) -> &NormalizedPath;

    /// Name of the branch HEAD points at.
    fn current_branch(&self) -> Result<String>;

    /// Create a local branch at the current HEAD commit.
    fn create_branch(&self, name: &str) -> Result<()>;

    /// Force-checkout a local branch.
    fn checkout(&self, name: &str) -> Result<()>;

    /// Stage every change in the working tree, including deletions.
    fn add_all(&self) -> Result<()>;

    /// Whether the working tree has modified or untracked files.
    fn has_changes(&self) -> Result<bool>;

    /// Commit the index on top of HEAD, returning the new commit id.
    fn commit(&self, message: &str) -> Result<String>;

    /// Push a branch.
    ///
    /// - `remote`: defaults to `origin`
    /// - `branch`: defaults to the current branch
    /// - `set_upstream`: record the remote branch as the upstream
    fn push(&self, remote: Option<&str>, branch: Option<&str>, set_upstream: bool) -> Result<()>;

    /// Fetch and fast-forward a branch from a remote.
    fn pull(&self, remote: Option<&str>, branch: Option<&str>) -> Result<()>;

    /// Create an annotated tag at HEAD.
    fn create_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push a single tag.
    fn push_tag(&self, remote: Option<&str>, tag: &str) -> Result<()>;

    /// Fetch every tag the remote has.
    fn fetch_tags(&self, remote: Option<&str>) -> Result<()>;

    /// All tag names known locally.
    fn tags(&self) -> Result<Vec<String>>;

    /// Merge `source` into the current branch, always creating a merge commit.
    fn merge_no_ff(&self, source: &str) -> Result<()>;

    /// Delete a branch on the remote.
    fn delete_remote_branch(&self, remote: Option<&str>, branch: &str) -> Result<()>;

    /// Delete a local branch.
    fn delete_branch(&self, name: &str) -> Result<()>;

    /// Discard uncommitted changes in the working tree and index.
    fn reset_hard(&self) -> Result<()>;
}
