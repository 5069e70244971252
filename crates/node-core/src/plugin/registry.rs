//! Static table of available plugins

use std::collections::HashMap;
use std::sync::Arc;

use crate::plugin::{
    DefaultDiscover, DefaultEdit, DefaultLoad, DefaultRelease, Discover, Edit, GitLoad,
    GitRelease, Load, PackageLoad, PackageRelease, PluginRole, Release,
};
use crate::{Error, Result};

/// Plugins available to the manager, by role and name.
///
/// Built-ins are registered by [`PluginRegistry::with_builtins`]; embedders
/// register their own before constructing the manager.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    discover: HashMap<String, Arc<dyn Discover>>,
    load: HashMap<String, Arc<dyn Load>>,
    edit: HashMap<String, Arc<dyn Edit>>,
    release: HashMap<String, Arc<dyn Release>>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in plugin.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_discover(Arc::new(DefaultDiscover));
        registry.register_load(Arc::new(DefaultLoad));
        registry.register_load(Arc::new(GitLoad));
        registry.register_load(Arc::new(PackageLoad));
        registry.register_edit(Arc::new(DefaultEdit));
        registry.register_release(Arc::new(DefaultRelease));
        registry.register_release(Arc::new(GitRelease));
        registry.register_release(Arc::new(PackageRelease));
        registry
    }

    /// Register a plugin, replacing any with the same name.
    pub fn register_discover(&mut self, plugin: Arc<dyn Discover>) {
        self.discover.insert(plugin.name().to_string(), plugin);
    }

    pub fn register_load(&mut self, plugin: Arc<dyn Load>) {
        self.load.insert(plugin.name().to_string(), plugin);
    }

    pub fn register_edit(&mut self, plugin: Arc<dyn Edit>) {
        self.edit.insert(plugin.name().to_string(), plugin);
    }

    pub fn register_release(&mut self, plugin: Arc<dyn Release>) {
        self.release.insert(plugin.name().to_string(), plugin);
    }

    pub fn discover(&self, name: &str) -> Result<Arc<dyn Discover>> {
        lookup(&self.discover, PluginRole::Discover, name)
    }

    pub fn load(&self, name: &str) -> Result<Arc<dyn Load>> {
        lookup(&self.load, PluginRole::Load, name)
    }

    pub fn edit(&self, name: &str) -> Result<Arc<dyn Edit>> {
        lookup(&self.edit, PluginRole::Edit, name)
    }

    pub fn release(&self, name: &str) -> Result<Arc<dyn Release>> {
        lookup(&self.release, PluginRole::Release, name)
    }

    /// Registered names for a role (sorted).
    pub fn names(&self, role: PluginRole) -> Vec<String> {
        let mut names: Vec<String> = match role {
            PluginRole::Discover => self.discover.keys().cloned().collect(),
            PluginRole::Load => self.load.keys().cloned().collect(),
            PluginRole::Edit => self.edit.keys().cloned().collect(),
            PluginRole::Release => self.release.keys().cloned().collect(),
        };
        names.sort();
        names
    }
}

fn lookup<T: ?Sized>(
    table: &HashMap<String, Arc<T>>,
    role: PluginRole,
    name: &str,
) -> Result<Arc<T>> {
    table.get(name).cloned().ok_or_else(|| Error::PluginNotFound {
        role,
        name: name.to_string(),
    })
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("discover", &self.names(PluginRole::Discover))
            .field("load", &self.names(PluginRole::Load))
            .field("edit", &self.names(PluginRole::Edit))
            .field("release", &self.names(PluginRole::Release))
            .finish()
    }
}
