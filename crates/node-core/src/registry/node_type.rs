//! Every known version of one node type

use std::collections::BTreeMap;

use crate::host::Definition;
use crate::registry::NodeTypeVersion;
use crate::version::Version;
use crate::{Error, Result};

/// Version key used for definitions whose type name carries no version.
pub const NO_VERSION: &str = "no version";

/// A node type and the versions loaded for it.
///
/// Several entries may share a version key when distinct files declare the
/// same version; they are kept side by side.
#[derive(Debug, Clone)]
pub struct NodeType {
    name: String,
    namespace: Option<String>,
    versions: BTreeMap<String, Vec<NodeTypeVersion>>,
}

impl NodeType {
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        let node_type = Self {
            name: name.into(),
            namespace,
            versions: BTreeMap::new(),
        };
        tracing::debug!(
            namespace = node_type.namespace.as_deref().unwrap_or(""),
            name = %node_type.name,
            "Initialised node type"
        );
        node_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Record a definition under `version`.
    pub fn add_version(
        &mut self,
        version: Option<&str>,
        definition: Definition,
        hidden: bool,
    ) -> &mut NodeTypeVersion {
        let key = version.unwrap_or(NO_VERSION).to_string();
        tracing::debug!(version = %key, path = %definition.library_path, "Adding version");
        let entries = self.versions.entry(key).or_default();
        entries.push(NodeTypeVersion::new(definition, hidden));
        let last = entries.len() - 1;
        &mut entries[last]
    }

    /// Remove the entry loaded from the same file as `definition`.
    ///
    /// Empty version keys are dropped. Fails when no entry matches, which
    /// means the definition was never added.
    pub fn remove_version(&mut self, definition: &Definition) -> Result<NodeTypeVersion> {
        let key = definition.version().unwrap_or_else(|| NO_VERSION.to_string());
        let not_found = || Error::VersionNotFound {
            key: format!("{}@{}", definition.lookup_key(), key),
            path: definition.library_path.to_string(),
        };

        let entries = self.versions.get_mut(&key).ok_or_else(not_found)?;
        let idx = entries
            .iter()
            .position(|v| v.path == definition.library_path)
            .ok_or_else(not_found)?;
        let removed = entries.remove(idx);

        if entries.is_empty() {
            self.versions.remove(&key);
        }
        Ok(removed)
    }

    pub fn all_versions(&self) -> &BTreeMap<String, Vec<NodeTypeVersion>> {
        &self.versions
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Number of entries across every version key.
    pub fn entry_count(&self) -> usize {
        self.versions.values().map(Vec::len).sum()
    }

    /// Highest parsable version key.
    pub fn latest_version(&self) -> Option<Version> {
        self.versions.keys().filter_map(|k| k.parse().ok()).max()
    }

    /// Entries whose version shares `major`, excluding those loaded from
    /// `exclude`.
    pub fn has_major(&self, major: u64, exclude: &Definition) -> bool {
        self.versions.iter().any(|(key, entries)| {
            key.parse::<Version>().is_ok_and(|v| v.major == major)
                && entries.iter().any(|e| e.path != exclude.library_path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn definition(type_name: &str, path: &str) -> Definition {
        Definition::new(type_name, "Sop", path)
    }

    #[test]
    fn test_add_version_groups_by_version() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        node_type.add_version(Some("1.0"), definition("studio::box::1.0", "/r/a.hda"), false);
        node_type.add_version(Some("2.0"), definition("studio::box::2.0", "/r/b.hda"), false);

        assert_eq!(node_type.all_versions().len(), 2);
        assert_eq!(node_type.entry_count(), 2);
    }

    #[test]
    fn test_missing_version_uses_sentinel() {
        let mut node_type = NodeType::new("box", None);
        node_type.add_version(None, definition("box", "/r/box.hda"), false);
        assert!(node_type.all_versions().contains_key(NO_VERSION));

        node_type.remove_version(&definition("box", "/r/box.hda")).unwrap();
        assert!(node_type.is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        let def = definition("studio::box::1.0", "/r/a.hda");
        node_type.add_version(Some("1.0"), def.clone(), false);
        node_type.add_version(Some("1.0"), def, false);

        assert_eq!(node_type.all_versions()["1.0"].len(), 2);
    }

    #[test]
    fn test_remove_version_matches_path() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        node_type.add_version(Some("1.0"), definition("studio::box::1.0", "/r/a.hda"), false);
        node_type.add_version(Some("1.0"), definition("studio::box::1.0", "/r/b.hda"), false);

        let removed = node_type
            .remove_version(&definition("studio::box::1.0", "/r/b.hda"))
            .unwrap();

        assert_eq!(removed.path.as_str(), "/r/b.hda");
        assert_eq!(node_type.all_versions()["1.0"].len(), 1);
        assert_eq!(node_type.all_versions()["1.0"][0].path.as_str(), "/r/a.hda");
    }

    #[test]
    fn test_remove_unknown_version_fails() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        node_type.add_version(Some("1.0"), definition("studio::box::1.0", "/r/a.hda"), false);

        let wrong_path = node_type.remove_version(&definition("studio::box::1.0", "/r/x.hda"));
        assert!(matches!(wrong_path, Err(Error::VersionNotFound { .. })));

        let wrong_version = node_type.remove_version(&definition("studio::box::9.0", "/r/a.hda"));
        assert!(matches!(wrong_version, Err(Error::VersionNotFound { .. })));
        assert_eq!(node_type.entry_count(), 1);
    }

    #[test]
    fn test_latest_version_uses_numeric_order() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        for v in ["2.0", "10.0", "9.1"] {
            node_type.add_version(
                Some(v),
                definition(&format!("studio::box::{}", v), &format!("/r/{}.hda", v)),
                false,
            );
        }
        assert_eq!(node_type.latest_version(), Some(Version::new(10, 0, 0)));
    }

    #[test]
    fn test_has_major_excludes_own_file() {
        let mut node_type = NodeType::new("box", Some("studio".to_string()));
        let own = definition("studio::box::2.0", "/edit/box.hda");
        node_type.add_version(Some("2.0"), own.clone(), false);

        assert!(!node_type.has_major(2, &own));

        node_type.add_version(Some("2.1"), definition("studio::box::2.1", "/r/box.hda"), false);
        assert!(node_type.has_major(2, &own));
        assert!(!node_type.has_major(3, &own));
    }
}
