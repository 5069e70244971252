//! Menu-driven edit, publish and discard on a directory repository
//!
//! Drives the process-wide session the way host menu callbacks do.

use std::sync::Arc;

use node_core::{EditOutcome, Host, ManagerConfig, ReleaseOutcome, Version, background, menu, session};
use node_test_utils::{FakeArchiveTool, FakeHost, TestNodeRepo};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn test_menu_round_trip() {
    let temp = TempDir::new().unwrap();
    let repo = TestNodeRepo::new(temp.path(), "tools")
        .with_version("0.4.2")
        .with_definition("Sop_studio.box.1.0.hda", &[("studio::box::1.0", "Sop")])
        .with_definition("Sop_studio.cone.1.0.hda", &[("studio::cone::1.0", "Sop")]);
    let config = ManagerConfig {
        repositories: vec![repo.location()],
        base: Some(temp.path().join("base")),
        user: "artist".to_string(),
        ..Default::default()
    };
    let host = Arc::new(FakeHost::new());
    host.add_node("/obj/geo1/box1", "studio::box::1.0", "Sop");
    host.add_node("/obj/geo1/cone1", "studio::cone::1.0", "Sop");

    let task = background::initialise(config, host.clone(), Arc::new(FakeArchiveTool::new()), false).unwrap();
    assert!(task.is_finished());
    task.join().unwrap();

    // Major edit and publish of the box.
    let outcome = menu::edit_major("/obj/geo1/box1").unwrap();
    assert!(matches!(outcome, EditOutcome::Copied { ref type_name, .. } if type_name == "studio::box::2.0"));
    host.queue_input(Some("Bigger box"));
    let outcome = menu::prepare_publish("/obj/geo1/box1").unwrap();
    assert!(matches!(outcome, ReleaseOutcome::Released { ref version, .. } if *version == Version::new(1, 0, 0)));
    assert!(repo.file("Sop_studio.box.2.0.hda").is_file());
    assert_eq!(repo.sidecar_version().as_deref(), Some("1.0.0"));

    // Edit of the cone, then thrown away.
    menu::edit("/obj/geo1/cone1").unwrap();
    host.modify_node("/obj/geo1/cone1", "wider cone");
    let outcome = menu::prepare_publish("/obj/geo1/cone1").unwrap();
    assert!(matches!(outcome, ReleaseOutcome::Rejected { .. }));
    menu::discard("/obj/geo1/cone1").unwrap();

    let cone = host.definition_from_node("/obj/geo1/cone1").unwrap().unwrap();
    assert_eq!(cone.library_path.as_ref(), repo.file("Sop_studio.cone.1.0.hda").as_path());
    assert_eq!(repo.sidecar_version().as_deref(), Some("1.0.0"));

    session::shutdown().unwrap();
}
