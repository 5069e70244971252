//! Error types for node-core

use std::path::PathBuf;

use crate::plugin::PluginRole;

/// Result type for node-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in node-core operations
///
/// Every variant is fatal to the operation that raised it. A user cancelling
/// a dialog is not an error; see [`crate::EditOutcome`] and
/// [`crate::ReleaseOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Setup mistake in configuration or repository layout
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A configured plugin name is not registered
    #[error("No {role} plugin named '{name}' is registered")]
    PluginNotFound { role: PluginRole, name: String },

    /// Version increment flags were absent or ambiguous
    #[error("Invalid version increment: {message}")]
    InvalidBump { message: String },

    /// Discovery returned no repositories
    #[error("No node repositories found")]
    NoRepositories,

    /// An external tool exited with a non-zero status
    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    /// An external step reported success but its output is missing
    #[error("Expected release artifact is missing: {path}")]
    MissingArtifact { path: PathBuf },

    /// Every release version candidate was already taken
    #[error("Failed to generate a free release version after {attempts} attempts (last tried {last})")]
    VersionExhausted { attempts: usize, last: String },

    /// A version string could not be parsed
    #[error("Invalid version: '{version}'")]
    InvalidVersion { version: String },

    /// No node type is registered under the lookup key
    #[error("Node type not found: {key}")]
    NodeTypeNotFound { key: String },

    /// The node type exists but no version entry matches the definition file
    #[error("No version of {key} is loaded from {path}")]
    VersionNotFound { key: String, path: String },

    /// No repository matches a path or name
    #[error("Repository not found for {target}")]
    RepositoryNotFound { target: String },

    /// A repository's load path does not exist
    #[error("Couldn't load from {path}")]
    LoadPathMissing { path: PathBuf },

    /// The node does not carry a digital asset definition
    #[error("{node} is not a digital asset")]
    NotADigitalAsset { node: String },

    /// Discarding a definition that a repository owns
    #[error("Refusing to discard {path}: it belongs to repository '{repo}'")]
    DiscardManaged { path: String, repo: String },

    /// A menu callback ran before the session was initialised
    #[error("Node Manager has not been initialised")]
    NotInitialised,

    /// The session lock was poisoned by a panicking holder
    #[error("Node Manager session is unusable after a panic")]
    SessionPoisoned,

    /// The background initialisation thread panicked
    #[error("Background initialisation panicked")]
    WorkerPanicked,

    /// Failure reported by the host application
    #[error("Host error: {message}")]
    Host { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from node-fs
    #[error(transparent)]
    Fs(#[from] node_fs::Error),

    /// Git error from node-git
    #[error(transparent)]
    Git(#[from] node_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }
}
