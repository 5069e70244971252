//! In-memory host session.
//!
//! Definition library files are JSON documents:
//!
//! ```json
//! {"definitions": [{"type_name": "studio::box::1.0", "category": "Sop", "content": "..."}]}
//! ```
//!
//! A node resolves to the most recently installed file that defines its type,
//! the way a host prefers the last library it loaded.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use node_core::{Definition, Error, Host, Result};
use node_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

/// One definition inside a library file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FakeDefinition {
    pub type_name: String,
    pub category: String,
    #[serde(default)]
    pub content: String,
}

impl FakeDefinition {
    pub fn new(type_name: &str, category: &str, content: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            category: category.to_string(),
            content: content.to_string(),
        }
    }
}

/// A library file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub definitions: Vec<FakeDefinition>,
}

impl DefinitionFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::host(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::host(format!("invalid definition file {}: {}", path.display(), e)))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json())?;
        Ok(())
    }

    /// Pretty JSON, as written to disk.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    fn find(&self, type_name: &str, category: &str) -> Option<&FakeDefinition> {
        self.definitions
            .iter()
            .find(|d| d.type_name == type_name && d.category == category)
    }

    /// Insert or replace the definition with the same type and category.
    fn upsert(&mut self, definition: FakeDefinition) {
        match self
            .definitions
            .iter_mut()
            .find(|d| d.type_name == definition.type_name && d.category == definition.category)
        {
            Some(existing) => *existing = definition,
            None => self.definitions.push(definition),
        }
    }
}

/// Write a library file holding `definitions`.
pub fn write_definition_file(path: &Path, definitions: &[FakeDefinition]) {
    DefinitionFile {
        definitions: definitions.to_vec(),
    }
    .write(path)
    .unwrap_or_else(|e| panic!("write_definition_file: {e}"));
}

#[derive(Debug, Clone)]
struct FakeNode {
    type_name: String,
    category: String,
    /// Edits not yet pushed into the definition
    pending: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    /// Installed files, oldest first
    installed: Vec<NormalizedPath>,
    hidden: BTreeSet<String>,
    nodes: BTreeMap<String, FakeNode>,
    confirms: VecDeque<bool>,
    inputs: VecDeque<Option<String>>,
    prompts: Vec<String>,
    messages: Vec<(String, String)>,
}

/// Host session fake. Confirmations default to "yes" and text prompts to an
/// empty answer unless responses are queued.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place a node of the given type in the scene.
    pub fn add_node(&self, node: &str, type_name: &str, category: &str) {
        self.state().nodes.insert(
            node.to_string(),
            FakeNode {
                type_name: type_name.to_string(),
                category: category.to_string(),
                pending: None,
            },
        );
    }

    /// Change the node's contents without saving them to its definition.
    pub fn modify_node(&self, node: &str, content: &str) {
        if let Some(n) = self.state().nodes.get_mut(node) {
            n.pending = Some(content.to_string());
        }
    }

    pub fn node_type(&self, node: &str) -> Option<String> {
        self.state().nodes.get(node).map(|n| n.type_name.clone())
    }

    pub fn queue_confirm(&self, answer: bool) {
        self.state().confirms.push_back(answer);
    }

    pub fn queue_input(&self, answer: Option<&str>) {
        self.state().inputs.push_back(answer.map(str::to_string));
    }

    pub fn installed(&self) -> Vec<NormalizedPath> {
        self.state().installed.clone()
    }

    pub fn is_installed(&self, path: impl AsRef<Path>) -> bool {
        let path = NormalizedPath::new(path);
        self.state().installed.contains(&path)
    }

    pub fn is_hidden(&self, type_name: &str) -> bool {
        self.state().hidden.contains(type_name)
    }

    /// Confirmation prompts shown so far.
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// `(title, message)` pairs shown so far.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state().messages.clone()
    }

    fn resolve(state: &State, node: &FakeNode) -> Option<Definition> {
        state.installed.iter().rev().find_map(|path| {
            let file = DefinitionFile::read(path.as_ref()).ok()?;
            file.find(&node.type_name, &node.category)
                .map(|_| Definition::new(node.type_name.clone(), node.category.clone(), path.clone()))
        })
    }

    fn node_definition(&self, node: &str) -> Result<(Definition, Option<String>)> {
        let state = self.state();
        let fake = state
            .nodes
            .get(node)
            .ok_or_else(|| Error::host(format!("no node at {}", node)))?;
        let definition = Self::resolve(&state, fake).ok_or_else(|| Error::NotADigitalAsset {
            node: node.to_string(),
        })?;
        Ok((definition, fake.pending.clone()))
    }

    fn content_of(definition: &Definition) -> Result<String> {
        let file = DefinitionFile::read(definition.library_path.as_ref())?;
        file.find(&definition.type_name, &definition.category)
            .map(|d| d.content.clone())
            .ok_or_else(|| {
                Error::host(format!(
                    "{} is not defined in {}",
                    definition.type_name, definition.library_path
                ))
            })
    }

    fn write_into(dest: &NormalizedPath, definition: FakeDefinition) -> Result<()> {
        let mut file = if dest.is_file() {
            DefinitionFile::read(dest.as_ref())?
        } else {
            DefinitionFile::default()
        };
        file.upsert(definition);
        file.write(dest.as_ref())
    }

    fn clear_pending(&self, node: &str) {
        if let Some(n) = self.state().nodes.get_mut(node) {
            n.pending = None;
        }
    }
}

impl Host for FakeHost {
    fn install(&self, path: &NormalizedPath) -> Result<()> {
        if !path.is_file() {
            return Err(Error::host(format!("cannot install missing file {}", path)));
        }
        let mut state = self.state();
        state.installed.retain(|p| p != path);
        state.installed.push(path.clone());
        Ok(())
    }

    fn uninstall(&self, path: &NormalizedPath) -> Result<()> {
        self.state().installed.retain(|p| p != path);
        Ok(())
    }

    fn set_hidden(&self, definition: &Definition, hidden: bool) -> Result<()> {
        let mut state = self.state();
        if hidden {
            state.hidden.insert(definition.type_name.clone());
        } else {
            state.hidden.remove(&definition.type_name);
        }
        Ok(())
    }

    fn definitions_in_file(&self, path: &NormalizedPath) -> Result<Vec<Definition>> {
        let file = DefinitionFile::read(path.as_ref())?;
        Ok(file
            .definitions
            .into_iter()
            .map(|d| Definition::new(d.type_name, d.category, path.clone()))
            .collect())
    }

    fn is_digital_asset(&self, node: &str) -> bool {
        self.node_definition(node).is_ok()
    }

    fn definition_from_node(&self, node: &str) -> Result<Option<Definition>> {
        let state = self.state();
        Ok(state
            .nodes
            .get(node)
            .and_then(|fake| Self::resolve(&state, fake)))
    }

    fn copy_definition_to_file(
        &self,
        definition: &Definition,
        dest: &NormalizedPath,
        new_type_name: Option<&str>,
    ) -> Result<Definition> {
        let content = Self::content_of(definition)?;
        let type_name = new_type_name.unwrap_or(&definition.type_name).to_string();
        Self::write_into(
            dest,
            FakeDefinition::new(&type_name, &definition.category, &content),
        )?;
        Ok(Definition::new(type_name, definition.category.clone(), dest.clone()))
    }

    fn change_node_type(&self, node: &str, type_name: &str) -> Result<()> {
        let mut state = self.state();
        let fake = state
            .nodes
            .get_mut(node)
            .ok_or_else(|| Error::host(format!("no node at {}", node)))?;
        fake.type_name = type_name.to_string();
        Ok(())
    }

    fn update_definition_from_node(&self, node: &str) -> Result<Definition> {
        let (definition, pending) = self.node_definition(node)?;
        if let Some(content) = pending {
            Self::write_into(
                &definition.library_path,
                FakeDefinition::new(&definition.type_name, &definition.category, &content),
            )?;
            self.clear_pending(node);
        }
        Ok(definition)
    }

    fn save_definition(&self, node: &str, dest: &NormalizedPath) -> Result<()> {
        let (definition, pending) = self.node_definition(node)?;
        let content = match pending {
            Some(content) => content,
            None => Self::content_of(&definition)?,
        };
        Self::write_into(
            dest,
            FakeDefinition::new(&definition.type_name, &definition.category, &content),
        )?;
        self.clear_pending(node);
        Ok(())
    }

    fn has_unsaved_changes(&self, node: &str) -> bool {
        self.state()
            .nodes
            .get(node)
            .is_some_and(|n| n.pending.is_some())
    }

    fn confirm(&self, message: &str, _title: &str) -> bool {
        let mut state = self.state();
        state.prompts.push(message.to_string());
        state.confirms.pop_front().unwrap_or(true)
    }

    fn read_input(&self, message: &str, _title: &str) -> Option<String> {
        let mut state = self.state();
        state.prompts.push(message.to_string());
        state.inputs.pop_front().unwrap_or_else(|| Some(String::new()))
    }

    fn display_message(&self, message: &str, title: &str) {
        self.state()
            .messages
            .push((title.to_string(), message.to_string()));
    }
}
