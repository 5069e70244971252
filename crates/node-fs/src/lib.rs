//! Filesystem abstraction for Node Manager
//!
//! Provides normalized path handling, atomic writes, recursive directory
//! copies and the JSON sidecar store used by node repositories.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::JsonStore;
pub use error::{Error, Result};
pub use path::NormalizedPath;
