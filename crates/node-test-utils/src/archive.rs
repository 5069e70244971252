//! File-copying archive tool.
//!
//! Expanding a library writes it to `{dest}/contents.json`; collapsing copies
//! that file back out. Fixtures that seed expanded definitions write the
//! library JSON to the same place.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use node_core::{ArchiveTool, Error, Result};

/// File an expanded definition directory holds.
pub const CONTENTS_FILE: &str = "contents.json";

/// Archive tool stand-in that records its calls.
#[derive(Debug, Default)]
pub struct FakeArchiveTool {
    fail: bool,
    calls: Mutex<Vec<(String, PathBuf, PathBuf)>>,
}

impl FakeArchiveTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tool whose every call exits with status 1.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(operation, src, dest)` for every call so far.
    pub fn calls(&self) -> Vec<(String, PathBuf, PathBuf)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, op: &str, src: &Path, dest: &Path) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((op.to_string(), src.to_path_buf(), dest.to_path_buf()));
        }
        if self.fail {
            return Err(Error::ToolFailed {
                tool: "fake-hotl".to_string(),
                code: 1,
                stderr: format!("{} failed", op),
            });
        }
        Ok(())
    }
}

impl ArchiveTool for FakeArchiveTool {
    fn expand(&self, src: &Path, dest: &Path) -> Result<()> {
        self.record("expand", src, dest)?;
        fs::create_dir_all(dest)?;
        fs::copy(src, dest.join(CONTENTS_FILE))?;
        Ok(())
    }

    fn collapse(&self, src: &Path, dest: &Path) -> Result<()> {
        self.record("collapse", src, dest)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src.join(CONTENTS_FILE), dest)?;
        Ok(())
    }
}
