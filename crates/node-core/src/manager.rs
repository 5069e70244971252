//! The orchestrator
//!
//! [`NodeManager`] owns the discovered repositories and drives definitions
//! through their lifecycle:
//!
//! ```text
//! Published --edit--> Editable --publish--> Published
//!                        |
//!                        +--discard--> Discarded
//! ```
//!
//! Editing an older version needs the user's confirmation. Discarding is
//! only allowed for definitions no repository owns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use node_fs::NormalizedPath;
use tempfile::TempDir;

use crate::backup::BackupManager;
use crate::config::ManagerConfig;
use crate::context::ManagerContext;
use crate::host::{Definition, Host};
use crate::plugin::{Discover, Edit, EditOutcome, Load, PluginRegistry, Release, ReleaseOutcome};
use crate::repository::{Repository, RepositorySet};
use crate::tools::ArchiveTool;
use crate::version::Bump;
use crate::{Error, Result};

const PUBLISH_TITLE: &str = "Publish definition";

/// Backup subdirectory for discarded edits that no repository indexed.
const DISCARD_BACKUP_DIR: &str = "backup/discarded";

/// Lifecycle manager for node definitions.
pub struct NodeManager {
    context: ManagerContext,
    plugins: PluginRegistry,
    discover: Arc<dyn Discover>,
    loader: Arc<dyn Load>,
    editor: Arc<dyn Edit>,
    releaser: Arc<dyn Release>,
    repositories: RepositorySet,
    loaded: bool,
    stats: BTreeMap<String, f64>,
    _temp: TempDir,
}

impl NodeManager {
    /// Create a manager using the built-in plugins.
    pub fn new(config: ManagerConfig, host: Arc<dyn Host>, archive: Arc<dyn ArchiveTool>) -> Result<Self> {
        Self::with_plugins(config, PluginRegistry::with_builtins(), host, archive)
    }

    /// Create a manager picking its plugins from `plugins`.
    ///
    /// Fails when a configured plugin name is not registered.
    pub fn with_plugins(
        config: ManagerConfig,
        plugins: PluginRegistry,
        host: Arc<dyn Host>,
        archive: Arc<dyn ArchiveTool>,
    ) -> Result<Self> {
        let start = Instant::now();

        let discover = plugins.discover(&config.discover_plugin)?;
        let loader = plugins.load(&config.load_plugin)?;
        let editor = plugins.edit(&config.edit_plugin)?;
        let releaser = plugins.release(&config.release_plugin)?;

        let temp = tempfile::Builder::new().prefix("node-manager-").tempdir()?;
        let context = ManagerContext::new(config, NormalizedPath::new(temp.path()), host, archive)?;

        let mut stats = BTreeMap::new();
        stats.insert("init".to_string(), start.elapsed().as_secs_f64());

        tracing::info!(
            discover = discover.name(),
            load = loader.name(),
            edit = editor.name(),
            release = releaser.name(),
            base = %context.base_dir,
            "Node Manager initialised"
        );

        Ok(Self {
            context,
            plugins,
            discover,
            loader,
            editor,
            releaser,
            repositories: RepositorySet::default(),
            loaded: false,
            stats,
            _temp: temp,
        })
    }

    pub fn context(&self) -> &ManagerContext {
        &self.context
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    pub fn repositories(&self) -> &RepositorySet {
        &self.repositories
    }

    pub fn repositories_mut(&mut self) -> &mut RepositorySet {
        &mut self.repositories
    }

    /// Timings in seconds, keyed by phase (`init`, `load_nodes`).
    pub fn stats(&self) -> &BTreeMap<String, f64> {
        &self.stats
    }

    /// Whether [`NodeManager::load`] has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Discover the repositories and load every definition.
    pub fn load(&mut self) -> Result<usize> {
        self.initialise_repos()?;
        let files = self.load_all(false)?;
        self.loaded = true;
        Ok(files)
    }

    /// Run the discover plugin, replacing the current repositories.
    pub fn initialise_repos(&mut self) -> Result<()> {
        let repos = self
            .discover
            .discover(&self.context, Arc::clone(&self.loader))?;
        if repos.is_empty() {
            return Err(Error::NoRepositories);
        }
        tracing::info!(repositories = repos.len(), "Discovered repositories");
        self.repositories = RepositorySet::new(repos);
        Ok(())
    }

    /// Load every repository; `force` re-resolves and re-indexes them.
    pub fn load_all(&mut self, force: bool) -> Result<usize> {
        let start = Instant::now();
        let files = self.repositories.load_all(&self.context, force)?;
        let elapsed = start.elapsed().as_secs_f64();
        self.stats.insert("load_nodes".to_string(), elapsed);
        tracing::info!(files, seconds = elapsed, force, "Loaded node definitions");
        Ok(files)
    }

    /// Repository whose roots contain `path`; `None` when nothing matches.
    pub fn repo_for_file(&self, path: &NormalizedPath) -> Option<&Repository> {
        self.repositories.repo_for_file(path)
    }

    pub fn is_managed(&self, path: &NormalizedPath) -> bool {
        self.repositories.is_managed(path)
    }

    pub fn is_latest_version(&self, definition: &Definition) -> bool {
        self.repositories.is_latest_version(definition)
    }

    fn node_definition(&self, node: &str) -> Result<Definition> {
        self.context
            .host
            .definition_from_node(node)?
            .ok_or_else(|| Error::NotADigitalAsset {
                node: node.to_string(),
            })
    }

    /// Make the node's definition editable, optionally bumping its version.
    ///
    /// At most one of `major` and `minor` may be set.
    pub fn edit_definition(&mut self, node: &str, major: bool, minor: bool) -> Result<EditOutcome> {
        let bump = Bump::from_edit_flags(major, minor)?;
        tracing::info!(node, bump = ?bump, "Editing definition");
        self.editor
            .edit_definition(&self.context, &mut self.repositories, node, bump)
    }

    /// Abandon a local edit.
    ///
    /// The definition is uninstalled and removed from any registry. Files in
    /// the edit directory are moved to a backup directory; other local files
    /// are left where they are. Definitions owned by a repository cannot be
    /// discarded.
    pub fn discard_definition(&mut self, node: &str) -> Result<()> {
        let definition = self.node_definition(node)?;
        let path = definition.library_path.clone();

        if let Some(repo) = self.repositories.repo_for_file(&path) {
            return Err(Error::DiscardManaged {
                path: path.to_string(),
                repo: repo.name().to_string(),
            });
        }

        let host = self.context.host.as_ref();
        let backup_dir = self
            .repositories
            .repo_holding_path(&path)
            .and_then(|name| self.repositories.get(name))
            .map(|repo| repo.context().backup_dir.clone())
            .unwrap_or_else(|| self.context.base_dir.join(DISCARD_BACKUP_DIR));
        self.repositories.remove_file_anywhere(host, &path)?;

        if path.starts_with(&self.context.edit_dir) && path.is_file() {
            BackupManager::new(backup_dir).backup_file(&path, "discard")?;
        }

        tracing::info!(node, path = %path, "Discarded definition");
        Ok(())
    }

    /// Problems that block publishing the node.
    ///
    /// A node without a definition reports only that. Otherwise unsaved
    /// changes, an older version and a namespace outside
    /// [`ManagerConfig::namespaces`] are each reported.
    pub fn validate(&self, node: &str) -> Vec<String> {
        let host = &self.context.host;
        let definition = match host.definition_from_node(node) {
            Ok(Some(definition)) if host.is_digital_asset(node) => definition,
            _ => return vec![format!("{} is not a digital asset", node)],
        };

        let mut problems = Vec::new();
        if host.has_unsaved_changes(node) {
            problems.push(format!(
                "{} has unsaved changes; save the definition before publishing",
                node
            ));
        }
        if !self.repositories.is_latest_version(&definition) {
            problems.push(format!(
                "{} is not the latest version; match or exceed the latest version before publishing",
                definition.type_name
            ));
        }

        let allowed = &self.context.config.namespaces;
        if !allowed.is_empty() {
            let namespace = definition.namespace();
            if !namespace.as_ref().is_some_and(|ns| allowed.contains(ns)) {
                problems.push(format!(
                    "Invalid namespace for {}: {}",
                    definition.type_name,
                    namespace.as_deref().unwrap_or("none")
                ));
            }
        }
        problems
    }

    /// Validate the node, ask for a release comment, then publish.
    ///
    /// Validation problems are shown to the user and returned as
    /// [`ReleaseOutcome::Rejected`]. An empty comment falls back to the
    /// release plugin's default.
    pub fn prepare_publish(&mut self, node: &str) -> Result<ReleaseOutcome> {
        let problems = self.validate(node);
        if !problems.is_empty() {
            tracing::warn!(node, problems = problems.len(), "Publish rejected");
            self.context
                .host
                .display_message(&problems.join("\n"), PUBLISH_TITLE);
            return Ok(ReleaseOutcome::Rejected { problems });
        }

        let Some(comment) = self
            .context
            .host
            .read_input("Release comment", PUBLISH_TITLE)
        else {
            tracing::info!(node, "Publish cancelled by user");
            return Ok(ReleaseOutcome::Cancelled);
        };

        let comment = comment.trim();
        self.publish_definition(node, (!comment.is_empty()).then_some(comment))
    }

    /// Publish through the release plugin without validation or prompts.
    pub fn publish_definition(&mut self, node: &str, comment: Option<&str>) -> Result<ReleaseOutcome> {
        tracing::info!(node, release = self.releaser.name(), "Publishing definition");
        self.releaser
            .release(&self.context, &mut self.repositories, node, comment)
    }

    /// Save the node's definition.
    ///
    /// Definitions living in the manager temp directory are saved into the
    /// edit directory instead, and the new file is installed.
    pub fn save(&mut self, node: &str) -> Result<NormalizedPath> {
        let definition = self.node_definition(node)?;
        let path = &definition.library_path;

        let in_temp = path.starts_with(&self.context.temp_dir) && !path.starts_with(&self.context.edit_dir);
        if !in_temp {
            self.context.host.save_definition(node, path)?;
            return Ok(path.clone());
        }

        let file_name = path.file_name().ok_or_else(|| {
            Error::configuration(format!("definition path has no file name: {}", path))
        })?;
        let dest = self.context.edit_dir.join(file_name);
        self.context.host.save_definition(node, &dest)?;
        self.context.host.install(&dest)?;
        tracing::info!(from = %path, to = %dest, "Moved temporary definition into edit directory");
        Ok(dest)
    }
}

impl std::fmt::Debug for NodeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeManager")
            .field("context", &self.context)
            .field("repositories", &self.repositories.names())
            .field("loaded", &self.loaded)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
