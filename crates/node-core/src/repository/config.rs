//! Repository sidecar configuration
//!
//! Stored as `config/config.json` inside a repository. Unknown keys survive a
//! load/save cycle untouched.

use node_fs::{JsonStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::version::INITIAL_VERSION;

/// Sidecar location relative to the repository root.
pub const SIDECAR_PATH: &str = "config/config.json";

/// Contents of a repository sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Last released version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Type name substrings hidden from the tab menu on install
    #[serde(default)]
    pub ophide: Vec<String>,

    /// Remote a packaged repository was released from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepoConfig {
    /// Load a sidecar; a missing file yields the defaults.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(JsonStore::new().load_or_default(path)?)
    }

    pub fn save(&self, path: &NormalizedPath) -> Result<()> {
        JsonStore::new().save(path, self)?;
        tracing::debug!(path = %path, "Saved repository config");
        Ok(())
    }

    /// Release baseline, `0.0.0` when nothing was released yet.
    pub fn baseline(&self) -> &str {
        self.version.as_deref().unwrap_or(INITIAL_VERSION)
    }

    pub fn is_hidden(&self, type_name: &str) -> bool {
        self.ophide.iter().any(|pattern| type_name.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_sidecar_defaults() {
        let temp = TempDir::new().unwrap();
        let config = RepoConfig::load(&NormalizedPath::new(temp.path().join(SIDECAR_PATH))).unwrap();
        assert_eq!(config, RepoConfig::default());
        assert_eq!(config.baseline(), "0.0.0");
        assert!(!config.is_hidden("studio::box::1.0"));
    }

    #[test]
    fn test_unknown_keys_survive_save() {
        let temp = TempDir::new().unwrap();
        let path = NormalizedPath::new(temp.path().join(SIDECAR_PATH));
        std::fs::create_dir_all(temp.path().join("config")).unwrap();
        std::fs::write(
            path.to_native(),
            r#"{"version": "2.3.1", "ophide": ["internal"], "owner": "lookdev"}"#,
        )
        .unwrap();

        let mut config = RepoConfig::load(&path).unwrap();
        assert_eq!(config.baseline(), "2.3.1");
        config.version = Some("3.0.0".to_string());
        config.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path.to_native()).unwrap()).unwrap();
        assert_eq!(raw["version"], "3.0.0");
        assert_eq!(raw["owner"], "lookdev");
        assert_eq!(raw["ophide"][0], "internal");
    }

    #[test]
    fn test_ophide_matches_substrings() {
        let config = RepoConfig {
            ophide: vec!["internal".to_string()],
            ..Default::default()
        };
        assert!(config.is_hidden("studio.internal::box::1.0"));
        assert!(!config.is_hidden("studio::box::1.0"));
    }
}
