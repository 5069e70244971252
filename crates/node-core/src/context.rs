//! Manager-level context shared with every plugin

use std::sync::Arc;

use node_fs::NormalizedPath;

use crate::config::ManagerConfig;
use crate::host::Host;
use crate::tools::ArchiveTool;
use crate::Result;

/// Directory under the base root holding per-user edit directories.
pub const EDIT_DIR: &str = "edit";

/// Resolved paths and collaborators of one manager instance.
///
/// Plugins receive this by reference; anything repository-specific they
/// compute goes into a [`crate::RepositoryContext`] instead.
#[derive(Clone)]
pub struct ManagerContext {
    pub config: ManagerConfig,
    /// Working root: the configured base, or the manager temp directory
    pub base_dir: NormalizedPath,
    /// Scratch directory removed when the manager is dropped
    pub temp_dir: NormalizedPath,
    /// Where editable copies are written, `{base}/edit/{user}`
    pub edit_dir: NormalizedPath,
    pub host: Arc<dyn Host>,
    pub archive: Arc<dyn ArchiveTool>,
}

impl ManagerContext {
    /// Resolve the directory layout and create the edit directory.
    pub fn new(
        config: ManagerConfig,
        temp_dir: NormalizedPath,
        host: Arc<dyn Host>,
        archive: Arc<dyn ArchiveTool>,
    ) -> Result<Self> {
        let base_dir = match &config.base {
            Some(base) => NormalizedPath::new(base),
            None => temp_dir.clone(),
        };
        let edit_dir = base_dir.join(EDIT_DIR).join(&config.user);
        std::fs::create_dir_all(edit_dir.to_native())
            .map_err(|e| node_fs::Error::io(edit_dir.to_native(), e))?;

        tracing::debug!(base = %base_dir, edit = %edit_dir, "Resolved manager directories");
        Ok(Self {
            config,
            base_dir,
            temp_dir,
            edit_dir,
            host,
            archive,
        })
    }

    /// `{base}/{segment}/{name}`, e.g. the working root of a cloned repository.
    pub fn base_subdir(&self, segment: &str, name: &str) -> NormalizedPath {
        self.base_dir.join(segment).join(name)
    }
}

impl std::fmt::Debug for ManagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerContext")
            .field("config", &self.config)
            .field("base_dir", &self.base_dir)
            .field("temp_dir", &self.temp_dir)
            .field("edit_dir", &self.edit_dir)
            .finish_non_exhaustive()
    }
}
