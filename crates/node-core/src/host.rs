//! Host application collaborator interface
//!
//! The node graph, the asset libraries installed into the running session
//! and the user-facing dialogs all belong to the host application. The
//! manager only reaches them through [`Host`].

use node_fs::NormalizedPath;

use crate::Result;
use crate::identity;

/// A node definition as seen by the manager.
///
/// Identifies one definition inside one library file. Several definitions
/// can share a library file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Definition {
    /// Qualified node type name, `namespace::name::version`
    pub type_name: String,
    /// Node type category, e.g. `Sop` or `Object`
    pub category: String,
    /// Library file holding the definition
    pub library_path: NormalizedPath,
}

impl Definition {
    pub fn new(
        type_name: impl Into<String>,
        category: impl Into<String>,
        library_path: impl Into<NormalizedPath>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            category: category.into(),
            library_path: library_path.into(),
        }
    }

    pub fn namespace(&self) -> Option<String> {
        identity::namespace(&self.type_name, None)
    }

    pub fn name(&self) -> String {
        identity::name(&self.type_name, None)
    }

    pub fn version(&self) -> Option<String> {
        identity::version(&self.type_name, None)
    }

    /// Registry key; opaque for invalid type names.
    pub fn lookup_key(&self) -> String {
        identity::registry_key(&self.type_name, &self.category)
    }

    pub fn expanded_name(&self) -> String {
        identity::expanded_name(&self.category, &self.type_name)
    }
}

/// Operations the manager needs from the host application.
///
/// Nodes are addressed by their path in the host's node graph.
pub trait Host: Send + Sync {
    /// Install a library file into the running session.
    fn install(&self, path: &NormalizedPath) -> Result<()>;

    /// Remove a library file from the running session.
    fn uninstall(&self, path: &NormalizedPath) -> Result<()>;

    /// Hide or show a node type in the user's tab menu.
    fn set_hidden(&self, definition: &Definition, hidden: bool) -> Result<()>;

    /// Every definition stored in a library file.
    fn definitions_in_file(&self, path: &NormalizedPath) -> Result<Vec<Definition>>;

    /// Whether the node is an instance of a digital asset.
    fn is_digital_asset(&self, node: &str) -> bool;

    /// Definition the node is an instance of, if any.
    fn definition_from_node(&self, node: &str) -> Result<Option<Definition>>;

    /// Write `definition` into `dest`, optionally under a new type name.
    ///
    /// Returns the definition as it now exists in `dest`.
    fn copy_definition_to_file(
        &self,
        definition: &Definition,
        dest: &NormalizedPath,
        new_type_name: Option<&str>,
    ) -> Result<Definition>;

    /// Switch a node to another installed node type.
    fn change_node_type(&self, node: &str, type_name: &str) -> Result<()>;

    /// Push the node's current contents into its definition.
    fn update_definition_from_node(&self, node: &str) -> Result<Definition>;

    /// Save the node's definition to `dest`.
    fn save_definition(&self, node: &str, dest: &NormalizedPath) -> Result<()>;

    /// Whether the node has modifications not yet saved to its definition.
    fn has_unsaved_changes(&self, node: &str) -> bool;

    /// Ask the user to confirm; `false` means cancel.
    fn confirm(&self, message: &str, title: &str) -> bool;

    /// Ask the user for text; `None` means cancel.
    fn read_input(&self, message: &str, title: &str) -> Option<String>;

    /// Show a message without waiting for an answer.
    fn display_message(&self, message: &str, title: &str);
}
