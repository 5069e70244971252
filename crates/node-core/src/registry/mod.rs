//! In-memory index of the node types a repository provides
//!
//! Node types are keyed by lookup key (`namespace::category/name`), so every
//! version of a conceptual node type lands in the same [`NodeType`].

mod node_type;
mod node_type_version;

pub use node_type::{NO_VERSION, NodeType};
pub use node_type_version::NodeTypeVersion;

use std::collections::BTreeMap;

use node_fs::NormalizedPath;

use crate::host::Definition;
use crate::{Error, Result};

/// Node types owned by one repository.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    node_types: BTreeMap<String, NodeType>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a definition, creating its node type on first sight.
    pub fn process_definition(&mut self, definition: Definition, hidden: bool) -> &mut NodeTypeVersion {
        let key = definition.lookup_key();
        let version = definition.version();
        let node_type = self
            .node_types
            .entry(key)
            .or_insert_with(|| NodeType::new(definition.name(), definition.namespace()));
        node_type.add_version(version.as_deref(), definition, hidden)
    }

    /// Remove the entry for `definition`, dropping its node type when it was
    /// the last one.
    pub fn remove_definition(&mut self, definition: &Definition) -> Result<NodeTypeVersion> {
        let key = definition.lookup_key();
        let node_type = self
            .node_types
            .get_mut(&key)
            .ok_or_else(|| Error::NodeTypeNotFound { key: key.clone() })?;

        let removed = node_type.remove_version(definition)?;
        if node_type.is_empty() {
            tracing::debug!(key = %key, "Last version removed, dropping node type");
            self.node_types.remove(&key);
        }
        Ok(removed)
    }

    pub fn get(&self, key: &str) -> Option<&NodeType> {
        self.node_types.get(key)
    }

    pub fn node_types(&self) -> &BTreeMap<String, NodeType> {
        &self.node_types
    }

    /// Entry loaded from `path`, if any.
    pub fn find_by_path(&self, path: &NormalizedPath) -> Option<&NodeTypeVersion> {
        self.node_types
            .values()
            .flat_map(|t| t.all_versions().values())
            .flatten()
            .find(|v| &v.path == path)
    }

    pub fn contains_path(&self, path: &NormalizedPath) -> bool {
        self.find_by_path(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.node_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_types.is_empty()
    }

    pub fn clear(&mut self) {
        self.node_types.clear();
    }
}
