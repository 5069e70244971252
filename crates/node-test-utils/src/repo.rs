//! [`TestNodeRepo`] builder for directory repositories.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::host::{FakeDefinition, write_definition_file};

/// A directory repository with a sidecar and definition files.
///
/// # Example
///
/// ```rust,no_run
/// use node_test_utils::TestNodeRepo;
///
/// let temp = tempfile::TempDir::new().unwrap();
/// let repo = TestNodeRepo::new(temp.path(), "tools")
///     .with_version("1.0.0")
///     .with_definition("Sop_studio.box.1.0.hda", &[("studio::box::1.0", "Sop")]);
/// assert!(repo.path().join("config/config.json").is_file());
/// ```
#[derive(Debug)]
pub struct TestNodeRepo {
    dir: PathBuf,
    sidecar: Map<String, Value>,
}

impl TestNodeRepo {
    /// Create `{root}/{name}`.
    pub fn new(root: &Path, name: &str) -> Self {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        Self {
            dir,
            sidecar: Map::new(),
        }
    }

    fn write_sidecar(self) -> Self {
        let path = self.dir.join("config/config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(&self.sidecar).unwrap()).unwrap();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.sidecar
            .insert("version".to_string(), Value::String(version.to_string()));
        self.write_sidecar()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.sidecar
            .insert("name".to_string(), Value::String(name.to_string()));
        self.write_sidecar()
    }

    pub fn with_ophide(mut self, patterns: &[&str]) -> Self {
        let patterns = patterns.iter().map(|p| Value::String(p.to_string())).collect();
        self.sidecar.insert("ophide".to_string(), Value::Array(patterns));
        self.write_sidecar()
    }

    /// Add a library file holding `(type_name, category)` definitions.
    pub fn with_definition(self, file_name: &str, definitions: &[(&str, &str)]) -> Self {
        let definitions: Vec<FakeDefinition> = definitions
            .iter()
            .map(|(type_name, category)| FakeDefinition::new(type_name, category, type_name))
            .collect();
        write_definition_file(&self.dir.join(file_name), &definitions);
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Location string for the manager configuration.
    pub fn location(&self) -> String {
        self.dir.to_string_lossy().to_string()
    }

    pub fn file(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Current sidecar `version`, read back from disk.
    pub fn sidecar_version(&self) -> Option<String> {
        let text = fs::read_to_string(self.dir.join("config/config.json")).ok()?;
        let value: Value = serde_json::from_str(&text).ok()?;
        value.get("version")?.as_str().map(str::to_string)
    }
}
