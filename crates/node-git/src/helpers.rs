//! Shared git2 helper functions
//!
//! These functions encapsulate the git2 patterns the checkout implementation
//! is built from. None of them retry.

use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    AutotagOption, BranchType, FetchOptions, PushOptions, RemoteCallbacks, Repository, Signature,
};

use crate::{Error, Result};

/// Signature used for commits and tags.
///
/// Uses the identity from git config when present so releases are attributed
/// to the artist running them.
pub fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now("Node Manager", "node-manager@localhost")?),
    }
}

/// Whether `url` names a network remote rather than a local path.
///
/// Shallow fetches are only requested for network remotes; libgit2's local
/// transport does not support them.
pub fn is_network_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    (lower.contains("://") && !lower.starts_with("file://")) || lower.starts_with("git@")
}

/// Clone `url` into `dest`.
///
/// `depth` limits history for network remotes; it is ignored for local
/// paths.
pub fn clone_repo(url: &str, dest: &Path, depth: Option<i32>) -> Result<Repository> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::CloneFailed {
            url: url.to_string(),
            message: format!("Failed to create directory: {}", e),
        })?;
    }

    let mut fetch_options = FetchOptions::new();
    match depth {
        Some(depth) if is_network_url(url) => {
            fetch_options.depth(depth);
        }
        _ => {}
    }

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    builder.clone(url, dest).map_err(|e| Error::CloneFailed {
        url: url.to_string(),
        message: e.message().to_string(),
    })
}

/// Push the given refspecs to a remote.
///
/// Rejections reported by the remote for individual references are turned
/// into [`Error::PushFailed`] instead of being dropped.
pub fn push_refspecs(repo: &Repository, remote_name: &str, refspecs: &[&str]) -> Result<()> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| Error::RemoteNotFound {
            name: remote_name.to_string(),
        })?;

    let mut callbacks = RemoteCallbacks::new();
    callbacks.push_update_reference(|refname, status| match status {
        Some(message) => Err(git2::Error::from_str(&format!(
            "{} rejected: {}",
            refname, message
        ))),
        None => Ok(()),
    });

    let mut options = PushOptions::new();
    options.remote_callbacks(callbacks);

    remote
        .push(refspecs, Some(&mut options))
        .map_err(|e| Error::PushFailed {
            message: e.message().to_string(),
        })?;

    tracing::debug!(remote = %remote_name, ?refspecs, "Pushed");
    Ok(())
}

/// Fetch every tag from a remote, whatever commit it points at.
///
/// Shallow clones only auto-follow tags on fetched commits, so release tags
/// on older history have to be requested explicitly.
pub fn fetch_tags(repo: &Repository, remote_name: &str) -> Result<()> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| Error::RemoteNotFound {
            name: remote_name.to_string(),
        })?;

    let mut options = FetchOptions::new();
    options.download_tags(AutotagOption::All);
    remote
        .fetch(&["+refs/tags/*:refs/tags/*"], Some(&mut options), None)
        .map_err(|e| Error::PullFailed {
            message: format!("Tag fetch failed: {}", e.message()),
        })?;

    tracing::debug!(remote = %remote_name, "Fetched tags");
    Ok(())
}

/// Pull changes from a remote repository using fetch + fast-forward.
///
/// `branch` must be the branch currently checked out.
pub fn pull(repo: &Repository, remote_name: &str, branch_name: &str) -> Result<()> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| Error::RemoteNotFound {
            name: remote_name.to_string(),
        })?;

    let mut options = FetchOptions::new();
    options.download_tags(AutotagOption::All);
    remote
        .fetch(&[branch_name], Some(&mut options), None)
        .map_err(|e| Error::PullFailed {
            message: format!("Fetch failed: {}", e.message()),
        })?;

    let fetch_head = repo
        .find_reference("FETCH_HEAD")
        .map_err(|e| Error::PullFailed {
            message: format!("Could not find FETCH_HEAD: {}", e.message()),
        })?;

    let fetch_commit = fetch_head.peel_to_commit().map_err(|e| Error::PullFailed {
        message: format!("Could not resolve FETCH_HEAD: {}", e.message()),
    })?;

    let head_commit = repo.head()?.peel_to_commit()?;

    let (merge_analysis, _) =
        repo.merge_analysis(&[&repo.find_annotated_commit(fetch_commit.id())?])?;

    if merge_analysis.is_up_to_date() {
        return Ok(());
    }

    if merge_analysis.is_fast_forward() {
        let refname = format!("refs/heads/{}", branch_name);
        let mut reference = repo.find_reference(&refname)?;
        reference.set_target(
            fetch_commit.id(),
            &format!("pull: fast-forward to {}", fetch_commit.id()),
        )?;
        repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
        return Ok(());
    }

    Err(Error::CannotFastForward {
        message: format!(
            "Cannot fast-forward {} from {} to {}. Manual merge required.",
            branch_name,
            head_commit.id(),
            fetch_commit.id()
        ),
    })
}

/// Merge `source` into HEAD with a merge commit, even when a fast-forward
/// would be possible.
///
/// Does nothing when `source` is already contained in HEAD.
pub fn merge_no_ff(repo: &Repository, source: &str) -> Result<()> {
    let source_branch =
        repo.find_branch(source, BranchType::Local)
            .map_err(|_| Error::BranchNotFound {
                name: source.to_string(),
            })?;
    let source_commit = source_branch.get().peel_to_commit()?;
    let head_commit = repo.head()?.peel_to_commit()?;

    if head_commit.id() == source_commit.id()
        || repo.graph_descendant_of(head_commit.id(), source_commit.id())?
    {
        tracing::debug!(source = %source, "Already up to date");
        return Ok(());
    }

    let mut index = repo.merge_commits(&head_commit, &source_commit, None)?;
    if index.has_conflicts() {
        return Err(Error::MergeConflict {
            message: format!("Merge of '{}' resulted in conflicts", source),
        });
    }

    let tree_id = index.write_tree_to(repo)?;
    let tree = repo.find_tree(tree_id)?;
    let sig = signature(repo)?;

    let message = format!("Merge branch '{}'", source);
    repo.commit(
        Some("HEAD"),
        &sig,
        &sig,
        &message,
        &tree,
        &[&head_commit, &source_commit],
    )?;

    repo.checkout_head(Some(CheckoutBuilder::default().force()))?;
    Ok(())
}
