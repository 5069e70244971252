//! A single loaded version of a node type

use node_fs::NormalizedPath;

use crate::host::{Definition, Host};
use crate::Result;

/// One definition file providing a version of a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeVersion {
    pub path: NormalizedPath,
    pub definition: Definition,
    pub installed: bool,
    pub hidden: bool,
}

impl NodeTypeVersion {
    pub fn new(definition: Definition, hidden: bool) -> Self {
        Self {
            path: definition.library_path.clone(),
            definition,
            installed: false,
            hidden,
        }
    }

    /// Install the definition's library into the host session.
    pub fn install(&mut self, host: &dyn Host) -> Result<()> {
        host.install(&self.path)?;
        if self.hidden {
            host.set_hidden(&self.definition, true)?;
        }
        self.installed = true;
        tracing::info!(path = %self.path, "Installed definition");
        Ok(())
    }
}
