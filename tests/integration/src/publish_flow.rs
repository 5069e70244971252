//! End-to-end publish through a git remote
//!
//! This test exercises the complete flow: environment configuration ->
//! discovery and load -> release of an untracked definition -> merged,
//! tagged remote.

use std::collections::HashMap;
use std::sync::Arc;

use node_core::config::{ENV_BASE, ENV_LOAD_PLUGIN, ENV_RELEASE_PLUGIN, ENV_RELEASE_REPO, ENV_REPOS, ENV_USER};
use node_core::{Host, ManagerConfig, NodeManager, ReleaseOutcome, Version};
use node_fs::NormalizedPath;
use node_test_utils::git::{
    branch_head_parents, expanded_definition, remote_branch_exists, remote_file, remote_tags, seeded_remote, sidecar,
};
use node_test_utils::host::write_definition_file;
use node_test_utils::{FakeArchiveTool, FakeDefinition, FakeHost};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

const NODE: &str = "/obj/geo1/box1";

fn config_from(vars: &[(&str, String)]) -> ManagerConfig {
    let vars: HashMap<&str, String> = vars.iter().cloned().collect();
    ManagerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

#[test]
fn test_untracked_definition_is_released_as_new_major() {
    let temp = TempDir::new().unwrap();
    let (released_box, released_json) = expanded_definition("studio::box::1.0", "Sop", "box");
    let remote = seeded_remote(
        temp.path(),
        "tools",
        &[("config/config.json", &sidecar("2.3.1")), (&released_box, &released_json)],
    );

    let config = config_from(&[
        (ENV_REPOS, remote.to_string_lossy().to_string()),
        (ENV_BASE, temp.path().join("base").to_string_lossy().to_string()),
        (ENV_LOAD_PLUGIN, "GitLoad".to_string()),
        (ENV_RELEASE_PLUGIN, "GitRelease".to_string()),
        (ENV_RELEASE_REPO, "tools".to_string()),
        (ENV_USER, "artist".to_string()),
    ]);
    let host = Arc::new(FakeHost::new());
    let mut manager = NodeManager::new(config, host.clone(), Arc::new(FakeArchiveTool::new())).unwrap();
    manager.load().unwrap();

    // A new major built outside every repository.
    let local = NormalizedPath::new(temp.path().join("scratch/Sop_studio_box_v2.hda"));
    write_definition_file(
        &local.to_native(),
        &[FakeDefinition::new("studio::box::2.0", "Sop", "box, second generation")],
    );
    host.install(&local).unwrap();
    host.add_node(NODE, "studio::box::2.0", "Sop");
    assert!(!manager.is_managed(&local));

    host.queue_input(Some("  Second generation box  "));
    let outcome = manager.prepare_publish(NODE).unwrap();

    let ReleaseOutcome::Released { version, branch, path } = outcome else {
        panic!("expected a release");
    };
    assert_eq!(version, Version::new(3, 0, 0));

    // Remote: tagged, merged, release branch gone.
    assert_eq!(remote_tags(&remote), vec!["3.0.0"]);
    assert_eq!(branch_head_parents(&remote, "main"), 2);
    assert!(!remote_branch_exists(&remote, &branch.unwrap()));
    let released_sidecar: serde_json::Value =
        serde_json::from_str(&remote_file(&remote, "main", "config/config.json").unwrap()).unwrap();
    assert_eq!(released_sidecar["version"], "3.0.0");
    let released = remote_file(&remote, "main", "dcc/houdini/hda/Sop_studio.box.2.0.hda/contents.json").unwrap();
    assert!(released.contains("second generation"));
    assert!(remote_file(&remote, "main", "dcc/houdini/hda/Sop_studio.box.1.0.hda/contents.json").is_some());

    // Session: the node now uses the released copy.
    assert!(!host.is_installed(&local));
    assert!(host.is_installed(&path));
    assert!(manager.is_managed(&path));
    assert_eq!(host.definition_from_node(NODE).unwrap().unwrap().library_path, path);
    let repo = manager.repositories().get("tools").unwrap();
    assert_eq!(repo.config().version.as_deref(), Some("3.0.0"));
    assert!(manager.is_latest_version(&host.definition_from_node(NODE).unwrap().unwrap()));
    assert!(host.messages().iter().any(|(_, message)| message.contains("3.0.0")));
}
