//! Plugin contract
//!
//! The pipeline has four roles. Each role is a trait; the implementation used
//! for a role is picked by name from a [`PluginRegistry`] at startup.
//!
//! - [`Discover`] turns the configured locations into [`Repository`] values
//! - [`Load`] makes a repository's definitions available locally
//! - [`Edit`] makes a definition editable
//! - [`Release`] publishes an edited definition back into a repository

mod discover;
mod edit;
mod load;
mod registry;
mod release;

pub use discover::DefaultDiscover;
pub use edit::DefaultEdit;
pub use load::{DefaultLoad, EXPANDED_SUBDIR, GitLoad, PackageLoad};
pub use registry::PluginRegistry;
pub use release::{DefaultRelease, GitRelease, PackageRelease};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use node_fs::NormalizedPath;

use crate::Result;
use crate::context::ManagerContext;
use crate::repository::{Repository, RepositoryContext, RepositorySet};
use crate::version::{Bump, Version};

/// The four pipeline roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginRole {
    Discover,
    Load,
    Edit,
    Release,
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discover => write!(f, "discover"),
            Self::Load => write!(f, "load"),
            Self::Edit => write!(f, "edit"),
            Self::Release => write!(f, "release"),
        }
    }
}

/// Builds one repository per configured location.
pub trait Discover: Send + Sync {
    fn name(&self) -> &str;

    /// Repositories keyed by name. `loader` is handed to every repository.
    fn discover(
        &self,
        ctx: &ManagerContext,
        loader: Arc<dyn Load>,
    ) -> Result<BTreeMap<String, Repository>>;
}

/// Makes a repository's definitions available on disk.
pub trait Load: Send + Sync {
    fn name(&self) -> &str;

    /// Work out the directory layout of the repository at `location`.
    fn resolve(&self, ctx: &ManagerContext, location: &str) -> Result<RepositoryContext>;

    /// Fetch or build the definitions, returning their files in load order.
    fn load(&self, ctx: &ManagerContext, repo: &RepositoryContext) -> Result<Vec<NormalizedPath>>;
}

/// Result of making a definition editable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// The definition was edited where it lives
    InPlace { type_name: String },
    /// An editable copy was written to the edit directory
    Copied {
        path: NormalizedPath,
        type_name: String,
    },
    /// The user declined to continue
    Cancelled,
}

/// Makes a node's definition editable.
pub trait Edit: Send + Sync {
    fn name(&self) -> &str;

    fn edit_definition(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        bump: Option<Bump>,
    ) -> Result<EditOutcome>;
}

/// Result of publishing a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released {
        version: Version,
        /// Release branch, for source-controlled repositories
        branch: Option<String>,
        /// Where the released definition now lives
        path: NormalizedPath,
    },
    /// Nothing differed from what the repository already holds
    NoChanges,
    /// Validation failed; nothing was touched
    Rejected { problems: Vec<String> },
    /// The user declined to continue
    Cancelled,
}

impl ReleaseOutcome {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released { .. })
    }
}

/// Publishes a node's definition into a repository.
pub trait Release: Send + Sync {
    fn name(&self) -> &str;

    fn release(
        &self,
        ctx: &ManagerContext,
        repos: &mut RepositorySet,
        node: &str,
        comment: Option<&str>,
    ) -> Result<ReleaseOutcome>;
}
