//! Error types for node-git

use std::path::PathBuf;

/// Result type for node-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in node-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] node_fs::Error),

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    #[error("Branch '{name}' not found")]
    BranchNotFound { name: String },

    #[error("Remote '{name}' not found")]
    RemoteNotFound { name: String },

    #[error("Push failed: {message}")]
    PushFailed { message: String },

    #[error("Pull failed: {message}")]
    PullFailed { message: String },

    #[error("{message}")]
    CannotFastForward { message: String },

    #[error("{message}")]
    MergeConflict { message: String },

    #[error("Invalid branch name: {name}")]
    InvalidBranchName { name: String },

    #[error("HEAD is detached in {path}")]
    DetachedHead { path: PathBuf },
}
