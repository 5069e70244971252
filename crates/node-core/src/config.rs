//! Manager configuration resolution
//!
//! Configuration is resolved in layers, later layers overriding earlier ones:
//! 1. Built-in defaults
//! 2. The JSON file named by `NODE_MANAGER_CONFIG`, if set
//! 3. Individual `NODE_MANAGER_*` environment variables

use std::path::PathBuf;

use node_fs::{JsonStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::Result;

pub const ENV_CONFIG: &str = "NODE_MANAGER_CONFIG";
pub const ENV_REPOS: &str = "NODE_MANAGER_REPOS";
pub const ENV_BASE: &str = "NODE_MANAGER_BASE";
pub const ENV_DISCOVER_PLUGIN: &str = "NODE_MANAGER_DISCOVER_PLUGIN";
pub const ENV_LOAD_PLUGIN: &str = "NODE_MANAGER_LOAD_PLUGIN";
pub const ENV_EDIT_PLUGIN: &str = "NODE_MANAGER_EDIT_PLUGIN";
pub const ENV_RELEASE_PLUGIN: &str = "NODE_MANAGER_RELEASE_PLUGIN";
pub const ENV_RELEASE_REPO: &str = "NODE_MANAGER_RELEASE_REPO";
pub const ENV_ARCHIVE_TOOL: &str = "NODE_MANAGER_ARCHIVE_TOOL";
pub const ENV_APPRENTICE: &str = "NODE_MANAGER_APPRENTICE";
pub const ENV_PACKAGES_ROOT: &str = "NODE_MANAGER_PACKAGES_ROOT";
pub const ENV_RELEASE_COMMAND: &str = "NODE_MANAGER_RELEASE_COMMAND";
pub const ENV_USER: &str = "NODE_MANAGER_USER";
pub const ENV_NAMESPACES: &str = "NODE_MANAGER_NAMESPACES";

pub const DEFAULT_DISCOVER_PLUGIN: &str = "DefaultDiscover";
pub const DEFAULT_LOAD_PLUGIN: &str = "DefaultLoad";
pub const DEFAULT_EDIT_PLUGIN: &str = "DefaultEdit";
pub const DEFAULT_RELEASE_PLUGIN: &str = "DefaultRelease";
pub const DEFAULT_ARCHIVE_TOOL: &str = "hotl";

/// Effective manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Repository locations: directories, git remotes or package roots
    pub repositories: Vec<String>,

    /// Working root; a fresh temp directory when unset
    pub base: Option<PathBuf>,

    pub discover_plugin: String,
    pub load_plugin: String,
    pub edit_plugin: String,
    pub release_plugin: String,

    /// Repository that releases of untracked definitions go to
    pub release_repo: Option<String>,

    /// Archive tool executable used to expand and collapse definitions
    pub archive_tool: String,

    /// Use the archive tool's apprentice-licence flags
    pub apprentice: bool,

    /// Root the package release command publishes into
    pub packages_root: Option<PathBuf>,

    /// Package release command line, run inside the repository clone
    pub release_command: Option<String>,

    /// Owner of the edit directory
    pub user: String,

    /// Namespaces definitions may be published under; empty allows any
    pub namespaces: Vec<String>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            base: None,
            discover_plugin: DEFAULT_DISCOVER_PLUGIN.to_string(),
            load_plugin: DEFAULT_LOAD_PLUGIN.to_string(),
            edit_plugin: DEFAULT_EDIT_PLUGIN.to_string(),
            release_plugin: DEFAULT_RELEASE_PLUGIN.to_string(),
            release_repo: None,
            archive_tool: DEFAULT_ARCHIVE_TOOL.to_string(),
            apprentice: false,
            packages_root: None,
            release_command: None,
            user: "user".to_string(),
            namespaces: Vec::new(),
        }
    }
}

impl ManagerConfig {
    /// Resolve from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = match get(ENV_CONFIG) {
            Some(path) => {
                let path = NormalizedPath::new(path.trim());
                tracing::debug!(path = %path, "Loading manager configuration file");
                JsonStore::new().load(&path)?
            }
            None => Self::default(),
        };

        if let Some(repos) = get(ENV_REPOS) {
            config.repositories = split_locations(&repos);
        }
        if let Some(base) = get(ENV_BASE) {
            config.base = Some(PathBuf::from(base));
        }
        if let Some(name) = get(ENV_DISCOVER_PLUGIN) {
            config.discover_plugin = name;
        }
        if let Some(name) = get(ENV_LOAD_PLUGIN) {
            config.load_plugin = name;
        }
        if let Some(name) = get(ENV_EDIT_PLUGIN) {
            config.edit_plugin = name;
        }
        if let Some(name) = get(ENV_RELEASE_PLUGIN) {
            config.release_plugin = name;
        }
        if let Some(repo) = get(ENV_RELEASE_REPO) {
            config.release_repo = Some(repo);
        }
        if let Some(tool) = get(ENV_ARCHIVE_TOOL) {
            config.archive_tool = tool;
        }
        if let Some(flag) = get(ENV_APPRENTICE) {
            config.apprentice = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(root) = get(ENV_PACKAGES_ROOT) {
            config.packages_root = Some(PathBuf::from(root));
        }
        if let Some(command) = get(ENV_RELEASE_COMMAND) {
            config.release_command = Some(command);
        }
        if let Some(namespaces) = get(ENV_NAMESPACES) {
            config.namespaces = split_locations(&namespaces);
        }
        if let Some(user) = get(ENV_USER).or_else(|| get("USER")).or_else(|| get("USERNAME")) {
            config.user = user;
        }

        Ok(config)
    }
}

/// Split a location list on `,` and `;`.
///
/// `:` is not a separator because it appears in remote URLs.
pub fn split_locations(raw: &str) -> Vec<String> {
    raw.split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
