//! Git abstraction for Node Manager
//!
//! Exposes the small set of source-control primitives the release workflow
//! needs (clone, pull, branch, commit, tag, merge, push) behind the
//! [`SourceControl`] trait, with a `git2` implementation in [`GitCheckout`].
//!
//! None of these operations retry. A failure surfaces immediately and leaves
//! the working copy as it was at the point of failure.

pub mod checkout;
pub mod error;
pub mod helpers;
pub mod naming;
pub mod provider;

pub use checkout::GitCheckout;
pub use error::{Error, Result};
pub use provider::SourceControl;

/// Remote used when callers do not name one.
pub const DEFAULT_REMOTE: &str = "origin";

/// Main line that release branches are merged back into.
pub const DEFAULT_MAIN_BRANCH: &str = "main";
