//! Host menu entry points
//!
//! Each callback takes the path of the node the menu was opened on and acts
//! on the session manager. Errors are logged here and returned for the host
//! to show.

use crate::plugin::{EditOutcome, ReleaseOutcome};
use crate::session;
use crate::Result;

fn logged<T>(action: &str, node: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::error!(action, node, error = %e, "Menu action failed");
    }
    result
}

/// Edit without changing the version.
pub fn edit(node: &str) -> Result<EditOutcome> {
    logged("edit", node, session::with_manager(|m| m.edit_definition(node, false, false)))
}

/// Edit as the next major version.
pub fn edit_major(node: &str) -> Result<EditOutcome> {
    logged("edit_major", node, session::with_manager(|m| m.edit_definition(node, true, false)))
}

/// Edit as the next minor version.
pub fn edit_minor(node: &str) -> Result<EditOutcome> {
    logged("edit_minor", node, session::with_manager(|m| m.edit_definition(node, false, true)))
}

pub fn discard(node: &str) -> Result<()> {
    logged("discard", node, session::with_manager(|m| m.discard_definition(node)))
}

pub fn prepare_publish(node: &str) -> Result<ReleaseOutcome> {
    logged("prepare_publish", node, session::with_manager(|m| m.prepare_publish(node)))
}
