//! Core orchestration layer for Node Manager
//!
//! This crate indexes node definitions discovered in repositories and drives
//! the edit/discard/publish cycle on top of the Layer 0 crates:
//!
//! - **Identity utilities**: parsing `namespace::name::version` type names
//! - **Version resolution**: major/minor/patch classification and
//!   collision-free release versions
//! - **Registry**: per-repository index of node types and their versions
//! - **Plugins**: the Discover/Load/Edit/Release roles and their built-in
//!   implementations, selected by name from a static [`PluginRegistry`]
//! - **Manager**: the [`NodeManager`] state machine, the process-wide
//!   [`session`] behind the menu callbacks, and background initialisation
//!
//! # Architecture
//!
//! ```text
//!        host menu callbacks
//!                |
//!      session / NodeManager
//!                |
//!   plugins (discover/load/edit/release)
//!                |
//!   repository + registry + version
//!                |
//!        node-fs     node-git
//! ```

pub mod background;
pub mod backup;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod identity;
pub mod logging;
pub mod manager;
pub mod menu;
pub mod plugin;
pub mod registry;
pub mod repository;
pub mod session;
pub mod tools;
pub mod version;

pub use background::InitTask;
pub use backup::{BackupManager, BackupRecord};
pub use config::ManagerConfig;
pub use context::ManagerContext;
pub use error::{Error, Result};
pub use host::{Definition, Host};
pub use manager::NodeManager;
pub use plugin::{
    Discover, Edit, EditOutcome, Load, PluginRegistry, PluginRole, Release, ReleaseOutcome,
};
pub use registry::{NodeRegistry, NodeType, NodeTypeVersion};
pub use repository::{RepoConfig, Repository, RepositoryContext, RepositorySet};
pub use session::ManagerHandle;
pub use tools::{ArchiveTool, Hotl, ReleaseCommand};
pub use version::{Bump, Version};
