//! Shared test utilities for the Node Manager workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`host`] — [`FakeHost`], an in-memory host session over JSON definition files
//! - [`archive`] — [`FakeArchiveTool`], a file-copying stand-in for `hotl`
//! - [`git`] — bare remote fixtures and assertions
//! - [`repo`] — [`TestNodeRepo`] builder for directory repositories

pub mod archive;
pub mod git;
pub mod host;
pub mod repo;

pub use archive::FakeArchiveTool;
pub use host::{DefinitionFile, FakeDefinition, FakeHost};
pub use repo::TestNodeRepo;
