//! Bare git remote fixtures.
//!
//! Remotes are local bare repositories with `main` as their initial branch,
//! seeded through a throwaway working copy.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Repository, RepositoryInitOptions};
use node_git::{GitCheckout, SourceControl};

use crate::archive::CONTENTS_FILE;
use crate::host::{DefinitionFile, FakeDefinition};

/// Create `{root}/{name}.git` with one commit on `main` holding `files`.
///
/// # Panics
/// Panics if any git operation fails.
pub fn seeded_remote(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let remote = root.join(format!("{}.git", name));
    let mut bare = RepositoryInitOptions::new();
    bare.bare(true).initial_head("main");
    Repository::init_opts(&remote, &bare)
        .unwrap_or_else(|e| panic!("seeded_remote: failed to init bare remote: {e}"));

    let seed = root.join(format!("{}-seed", name));
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    let repo = Repository::init_opts(&seed, &opts)
        .unwrap_or_else(|e| panic!("seeded_remote: failed to init seed: {e}"));
    repo.remote("origin", &remote.to_string_lossy())
        .unwrap_or_else(|e| panic!("seeded_remote: failed to add origin: {e}"));

    for (path, content) in files {
        let full = seed.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap();
    }

    let checkout = GitCheckout::open(&seed).unwrap();
    checkout.add_all().unwrap();
    checkout.commit("Initial commit").unwrap();
    checkout
        .push(None, Some("main"), true)
        .unwrap_or_else(|e| panic!("seeded_remote: failed to push seed: {e}"));

    remote
}

/// Path and content of an expanded definition, for [`seeded_remote`].
///
/// `Sop` + `studio::box::1.0` lands at
/// `dcc/houdini/hda/Sop_studio.box.1.0.hda/contents.json`.
pub fn expanded_definition(type_name: &str, category: &str, content: &str) -> (String, String) {
    let path = format!(
        "dcc/houdini/hda/{}/{}",
        node_core::identity::expanded_name(category, type_name),
        CONTENTS_FILE
    );
    let file = DefinitionFile {
        definitions: vec![FakeDefinition::new(type_name, category, content)],
    };
    (path, file.to_json())
}

/// Sidecar content with the given baseline version.
pub fn sidecar(version: &str) -> String {
    format!("{{\"version\": \"{}\"}}\n", version)
}

/// Tag names in a bare remote.
pub fn remote_tags(remote: &Path) -> Vec<String> {
    let repo = Repository::open_bare(remote).unwrap();
    let mut tags: Vec<String> = repo
        .tag_names(None)
        .unwrap()
        .iter()
        .flatten()
        .map(str::to_string)
        .collect();
    tags.sort();
    tags
}

/// Tag the tip of `main` in a bare remote.
pub fn tag_remote(remote: &Path, tag: &str) {
    let repo = Repository::open_bare(remote).unwrap();
    let head = repo.revparse_single("refs/heads/main").unwrap();
    repo.tag_lightweight(tag, &head, false).unwrap();
}

pub fn remote_branch_exists(remote: &Path, branch: &str) -> bool {
    let repo = Repository::open_bare(remote).unwrap();
    repo.find_reference(&format!("refs/heads/{}", branch)).is_ok()
}

/// Number of parents of the commit `branch` points at.
pub fn branch_head_parents(remote: &Path, branch: &str) -> usize {
    let repo = Repository::open_bare(remote).unwrap();
    let reference = repo.find_reference(&format!("refs/heads/{}", branch)).unwrap();
    reference.peel_to_commit().unwrap().parent_count()
}

/// Content of `path` at the tip of `branch`, if the file exists there.
pub fn remote_file(remote: &Path, branch: &str, path: &str) -> Option<String> {
    let repo = Repository::open_bare(remote).unwrap();
    let reference = repo.find_reference(&format!("refs/heads/{}", branch)).ok()?;
    let tree = reference.peel_to_tree().ok()?;
    let entry = tree.get_path(Path::new(path)).ok()?;
    let blob = repo.find_blob(entry.id()).ok()?;
    Some(String::from_utf8_lossy(blob.content()).to_string())
}
