//! Tests for the edit, discard and publish lifecycle on directory repositories

use std::fs;
use std::sync::Arc;

use node_core::backup::BackupManager;
use node_core::{EditOutcome, Error, Host, ManagerConfig, NodeManager, PluginRole, ReleaseOutcome, Version};
use node_fs::NormalizedPath;
use node_test_utils::host::write_definition_file;
use node_test_utils::{FakeArchiveTool, FakeDefinition, FakeHost, TestNodeRepo};
use tempfile::TempDir;

const NODE: &str = "/obj/geo1/box1";

struct Scene {
    temp: TempDir,
    host: Arc<FakeHost>,
    repo: TestNodeRepo,
}

impl Scene {
    fn edit_files(&self, manager: &NodeManager) -> Vec<String> {
        let mut files: Vec<String> = fs::read_dir(manager.context().edit_dir.to_native())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        files
    }

    /// A local library outside every repository, installed in the session.
    fn local_definition(&self, file_name: &str, type_name: &str) -> NormalizedPath {
        let path = self.temp.path().join("local").join(file_name);
        write_definition_file(&path, &[FakeDefinition::new(type_name, "Sop", "local")]);
        let path = NormalizedPath::new(path);
        self.host.install(&path).unwrap();
        path
    }
}

fn scene(configure: impl FnOnce(&mut ManagerConfig)) -> (Scene, NodeManager) {
    let temp = TempDir::new().unwrap();
    let repo = TestNodeRepo::new(temp.path(), "tools")
        .with_version("1.0.0")
        .with_definition("Sop_studio.box.1.0.hda", &[("studio::box::1.0", "Sop")])
        .with_definition("Sop_studio.box.2.0.hda", &[("studio::box::2.0", "Sop")]);

    let mut config = ManagerConfig {
        repositories: vec![repo.location()],
        base: Some(temp.path().join("base")),
        user: "artist".to_string(),
        ..Default::default()
    };
    configure(&mut config);

    let host = Arc::new(FakeHost::new());
    let mut manager = NodeManager::new(config, host.clone(), Arc::new(FakeArchiveTool::new())).unwrap();
    manager.load().unwrap();

    (Scene { temp, host, repo }, manager)
}

mod setup_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unknown_plugin_is_fatal() {
        let config = ManagerConfig {
            edit_plugin: "FancyEdit".to_string(),
            ..Default::default()
        };
        let result = NodeManager::new(config, Arc::new(FakeHost::new()), Arc::new(FakeArchiveTool::new()));
        assert!(matches!(
            result,
            Err(Error::PluginNotFound {
                role: PluginRole::Edit,
                ..
            })
        ));
    }

    #[test]
    fn test_no_repositories_is_fatal() {
        let mut manager = NodeManager::new(
            ManagerConfig::default(),
            Arc::new(FakeHost::new()),
            Arc::new(FakeArchiveTool::new()),
        )
        .unwrap();
        assert!(matches!(manager.load(), Err(Error::NoRepositories)));
        assert!(!manager.is_loaded());
    }

    #[test]
    fn test_load_records_stats() {
        let (_scene, manager) = scene(|_| {});
        assert!(manager.is_loaded());
        assert!(manager.stats().contains_key("init"));
        assert!(manager.stats().contains_key("load_nodes"));
        assert_eq!(manager.repositories().names(), vec!["tools"]);
    }

    #[test]
    fn test_edit_dir_is_per_user() {
        let (scene, manager) = scene(|_| {});
        assert_eq!(
            manager.context().edit_dir,
            NormalizedPath::new(scene.temp.path().join("base/edit/artist"))
        );
        assert!(manager.context().edit_dir.is_dir());
    }
}

mod edit_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_managed_definition_is_copied_into_edit_dir() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");

        let outcome = manager.edit_definition(NODE, false, false).unwrap();

        let EditOutcome::Copied { path, type_name } = outcome else {
            panic!("expected a copy");
        };
        assert_eq!(type_name, "studio::box::2.0");
        assert!(path.starts_with(&manager.context().edit_dir));
        assert_ne!(path, NormalizedPath::new(scene.repo.file("Sop_studio.box.2.0.hda")));
        assert!(scene.host.is_installed(&path));
        assert!(!manager.is_managed(&path));

        let current = scene.host.definition_from_node(NODE).unwrap().unwrap();
        assert_eq!(current.library_path, path);
    }

    #[test]
    fn test_minor_edit_retypes_the_node() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");

        let outcome = manager.edit_definition(NODE, false, true).unwrap();

        assert!(matches!(outcome, EditOutcome::Copied { ref type_name, .. } if type_name == "studio::box::2.1"));
        assert_eq!(scene.host.node_type(NODE).as_deref(), Some("studio::box::2.1"));
        assert_eq!(scene.edit_files(&manager).len(), 1);
    }

    #[test]
    fn test_writable_local_definition_is_edited_in_place() {
        let (scene, mut manager) = scene(|_| {});
        scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");

        let outcome = manager.edit_definition(NODE, false, false).unwrap();

        assert_eq!(
            outcome,
            EditOutcome::InPlace {
                type_name: "local::cone::1.0".to_string()
            }
        );
        assert!(scene.edit_files(&manager).is_empty());
    }

    #[test]
    fn test_in_place_major_edit_renames_definition() {
        let (scene, mut manager) = scene(|_| {});
        let path = scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");

        let outcome = manager.edit_definition(NODE, true, false).unwrap();

        assert_eq!(
            outcome,
            EditOutcome::InPlace {
                type_name: "local::cone::2.0".to_string()
            }
        );
        assert_eq!(scene.host.node_type(NODE).as_deref(), Some("local::cone::2.0"));
        let current = scene.host.definition_from_node(NODE).unwrap().unwrap();
        assert_eq!(current.library_path, path);
        assert!(scene.edit_files(&manager).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_local_definition_is_copied() {
        let (scene, mut manager) = scene(|_| {});
        let path = scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        let mut permissions = fs::metadata(path.to_native()).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(path.to_native(), permissions).unwrap();
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");

        let outcome = manager.edit_definition(NODE, false, false).unwrap();

        assert!(matches!(outcome, EditOutcome::Copied { .. }));
        assert!(!scene.host.is_installed(&path));
        assert_eq!(scene.edit_files(&manager).len(), 1);
    }

    #[test]
    fn test_major_and_minor_together_is_invalid() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");

        let result = manager.edit_definition(NODE, true, true);

        assert!(matches!(result, Err(Error::InvalidBump { .. })));
        assert!(scene.edit_files(&manager).is_empty());
    }

    #[test]
    fn test_older_version_needs_confirmation() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::1.0", "Sop");

        scene.host.queue_confirm(false);
        let outcome = manager.edit_definition(NODE, false, false).unwrap();
        assert_eq!(outcome, EditOutcome::Cancelled);
        assert_eq!(scene.host.prompts().len(), 1);
        assert!(scene.edit_files(&manager).is_empty());

        scene.host.queue_confirm(true);
        let outcome = manager.edit_definition(NODE, false, false).unwrap();
        assert!(matches!(outcome, EditOutcome::Copied { .. }));
    }

    #[test]
    fn test_back_to_back_copies_get_distinct_files() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        scene.host.add_node("/obj/geo1/box2", "studio::box::1.0", "Sop");

        let EditOutcome::Copied { path: first, .. } = manager.edit_definition(NODE, false, false).unwrap() else {
            panic!("expected a copy");
        };
        let EditOutcome::Copied { path: second, .. } = manager.edit_definition("/obj/geo1/box2", false, false).unwrap()
        else {
            panic!("expected a copy");
        };

        assert_ne!(first, second);
        assert_eq!(scene.edit_files(&manager).len(), 2);
        assert_eq!(
            scene.host.definition_from_node(NODE).unwrap().unwrap().library_path,
            first
        );
    }

    #[test]
    fn test_latest_version_does_not_prompt() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");

        manager.edit_definition(NODE, false, false).unwrap();

        assert!(scene.host.prompts().is_empty());
    }

    #[test]
    fn test_node_without_definition_is_rejected() {
        let (_scene, mut manager) = scene(|_| {});
        let result = manager.edit_definition("/obj/null1", false, false);
        assert!(matches!(result, Err(Error::NotADigitalAsset { .. })));
    }
}

mod discard_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_discarding_managed_definition_fails() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");

        let result = manager.discard_definition(NODE);

        assert!(matches!(result, Err(Error::DiscardManaged { ref repo, .. }) if repo == "tools"));
        assert!(scene.host.is_installed(scene.repo.file("Sop_studio.box.2.0.hda")));
    }

    #[test]
    fn test_discarding_edit_copy_uninstalls_and_backs_up() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        let EditOutcome::Copied { path, .. } = manager.edit_definition(NODE, false, false).unwrap() else {
            panic!("expected a copy");
        };

        manager.discard_definition(NODE).unwrap();

        assert!(!scene.host.is_installed(&path));
        assert!(!path.exists());
        assert!(manager.repositories().repo_holding_path(&path).is_none());

        let backup_dir = manager.repositories().get("tools").unwrap().context().backup_dir.clone();
        let backups = BackupManager::new(backup_dir).list().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].original, path.to_string());
        assert_eq!(backups[0].reason, "discard");

        // The node falls back to the published definition.
        let current = scene.host.definition_from_node(NODE).unwrap().unwrap();
        assert!(manager.is_managed(&current.library_path));
    }

    #[test]
    fn test_discarding_after_versioning_the_edit_copy() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        let EditOutcome::Copied { path, .. } = manager.edit_definition(NODE, false, false).unwrap() else {
            panic!("expected a copy");
        };
        let outcome = manager.edit_definition(NODE, false, true).unwrap();
        assert_eq!(
            outcome,
            EditOutcome::InPlace {
                type_name: "studio::box::2.1".to_string()
            }
        );
        let repo = manager.repositories().get("tools").unwrap();
        let versions = repo.registry().get("studio::Sop/box").unwrap().all_versions();
        assert!(versions["2.1"].iter().any(|v| v.path == path));

        manager.discard_definition(NODE).unwrap();

        assert!(!scene.host.is_installed(&path));
        assert!(!path.exists());
        let repo = manager.repositories().get("tools").unwrap();
        assert!(!repo.registry().contains_path(&path));
        let versions = repo.registry().get("studio::Sop/box").unwrap().all_versions();
        assert!(!versions.contains_key("2.1"));
    }

    #[test]
    fn test_discarding_untracked_local_definition_only_uninstalls() {
        let (scene, mut manager) = scene(|_| {});
        let path = scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");

        manager.discard_definition(NODE).unwrap();

        assert!(!scene.host.is_installed(&path));
        assert!(path.exists());
    }
}

mod publish_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unsaved_changes_reject_publish() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        manager.edit_definition(NODE, false, true).unwrap();
        scene.host.modify_node(NODE, "more sides");

        let outcome = manager.prepare_publish(NODE).unwrap();

        let ReleaseOutcome::Rejected { problems } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("unsaved changes"));
        assert_eq!(scene.host.messages().len(), 1);
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_older_version_is_rejected() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::1.0", "Sop");

        let outcome = manager.prepare_publish(NODE).unwrap();

        let ReleaseOutcome::Rejected { problems } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("not the latest version"));
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_namespace_outside_allow_list_is_rejected() {
        let (scene, manager) = scene(|config| config.namespaces = vec!["studio".to_string()]);
        scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");
        scene.host.add_node("/obj/geo1/box2", "studio::box::2.0", "Sop");

        assert_eq!(
            manager.validate(NODE),
            vec!["Invalid namespace for local::cone::1.0: local".to_string()]
        );
        assert!(manager.validate("/obj/geo1/box2").is_empty());
    }

    #[test]
    fn test_non_asset_is_rejected() {
        let (_scene, mut manager) = scene(|_| {});
        let outcome = manager.prepare_publish("/obj/null1").unwrap();
        assert!(matches!(outcome, ReleaseOutcome::Rejected { .. }));
    }

    #[test]
    fn test_cancelled_comment_aborts_publish() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        manager.edit_definition(NODE, false, true).unwrap();
        scene.host.queue_input(None);

        let outcome = manager.prepare_publish(NODE).unwrap();

        assert_eq!(outcome, ReleaseOutcome::Cancelled);
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_minor_release_of_edited_copy() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        let EditOutcome::Copied { path: copy, .. } = manager.edit_definition(NODE, false, true).unwrap() else {
            panic!("expected a copy");
        };
        scene.host.modify_node(NODE, "more sides");
        manager.save(NODE).unwrap();
        scene.host.queue_input(Some("More sides"));

        let outcome = manager.prepare_publish(NODE).unwrap();

        let released = NormalizedPath::new(scene.repo.file("Sop_studio.box.2.1.hda"));
        assert_eq!(
            outcome,
            ReleaseOutcome::Released {
                version: Version::new(1, 1, 0),
                branch: None,
                path: released.clone(),
            }
        );
        assert!(released.is_file());
        assert!(scene.host.is_installed(&released));
        assert!(!scene.host.is_installed(&copy));
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("1.1.0"));

        let current = scene.host.definition_from_node(NODE).unwrap().unwrap();
        assert_eq!(current.library_path, released);
        let repo = manager.repositories().get("tools").unwrap();
        assert!(repo.registry().contains_path(&released));
        assert!(!repo.registry().contains_path(&copy));
    }

    #[test]
    fn test_publishing_after_versioning_the_edit_copy() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        let EditOutcome::Copied { path: copy, .. } = manager.edit_definition(NODE, false, false).unwrap() else {
            panic!("expected a copy");
        };
        manager.edit_definition(NODE, false, true).unwrap();

        let outcome = manager.publish_definition(NODE, Some("Bevels")).unwrap();

        let released = NormalizedPath::new(scene.repo.file("Sop_studio.box.2.1.hda"));
        assert_eq!(
            outcome,
            ReleaseOutcome::Released {
                version: Version::new(1, 1, 0),
                branch: None,
                path: released.clone(),
            }
        );
        assert!(!scene.host.is_installed(&copy));
        let repo = manager.repositories().get("tools").unwrap();
        assert!(!repo.registry().contains_path(&copy));
        assert!(repo.registry().contains_path(&released));
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("1.1.0"));
    }

    #[test]
    fn test_republishing_same_version_is_a_patch_with_backup() {
        let (scene, mut manager) = scene(|_| {});
        scene.host.add_node(NODE, "studio::box::2.0", "Sop");
        manager.edit_definition(NODE, false, false).unwrap();

        let outcome = manager.publish_definition(NODE, None).unwrap();

        let target = NormalizedPath::new(scene.repo.file("Sop_studio.box.2.0.hda"));
        assert!(matches!(
            outcome,
            ReleaseOutcome::Released { ref version, ref path, .. }
                if *version == Version::new(1, 0, 1) && *path == target
        ));
        let backup_dir = manager.repositories().get("tools").unwrap().context().backup_dir.clone();
        let backups = BackupManager::new(backup_dir).list().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].original, target.to_string());
        assert_eq!(backups[0].reason, "release");

        let entries = manager.repositories().get("tools").unwrap().registry().get("studio::Sop/box").unwrap().all_versions()["2.0"].len();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_untracked_definition_is_a_major_release_into_release_repo() {
        let (scene, mut manager) = scene(|config| config.release_repo = Some("tools".to_string()));
        scene.local_definition("Sop_studio_torus.hda", "studio::torus::1.0");
        scene.host.add_node(NODE, "studio::torus::1.0", "Sop");

        let outcome = manager.prepare_publish(NODE).unwrap();

        assert!(matches!(outcome, ReleaseOutcome::Released { ref version, .. } if *version == Version::new(2, 0, 0)));
        assert!(scene.repo.file("Sop_studio.torus.1.0.hda").is_file());
        assert_eq!(scene.repo.sidecar_version().as_deref(), Some("2.0.0"));
    }

    #[test]
    fn test_untracked_definition_without_release_repo_fails() {
        let (scene, mut manager) = scene(|_| {});
        scene.local_definition("Sop_studio_torus.hda", "studio::torus::1.0");
        scene.host.add_node(NODE, "studio::torus::1.0", "Sop");

        let result = manager.prepare_publish(NODE);
        assert!(matches!(result, Err(Error::RepositoryNotFound { .. })));
    }
}

mod save_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_temp_definitions_are_saved_into_edit_dir() {
        let (scene, mut manager) = scene(|_| {});
        let scratch = manager.context().temp_dir.join("Sop_studio_scratch.hda");
        write_definition_file(
            &scratch.to_native(),
            &[FakeDefinition::new("studio::scratch::1.0", "Sop", "draft")],
        );
        scene.host.install(&scratch).unwrap();
        scene.host.add_node(NODE, "studio::scratch::1.0", "Sop");

        let saved = manager.save(NODE).unwrap();

        assert_eq!(saved, manager.context().edit_dir.join("Sop_studio_scratch.hda"));
        assert!(saved.is_file());
        assert!(scene.host.is_installed(&saved));
    }

    #[test]
    fn test_other_definitions_are_saved_where_they_are() {
        let (scene, mut manager) = scene(|_| {});
        let path = scene.local_definition("Sop_local_cone.hda", "local::cone::1.0");
        scene.host.add_node(NODE, "local::cone::1.0", "Sop");
        scene.host.modify_node(NODE, "changed");

        let saved = manager.save(NODE).unwrap();

        assert_eq!(saved, path);
        assert!(!scene.host.has_unsaved_changes(NODE));
    }
}
