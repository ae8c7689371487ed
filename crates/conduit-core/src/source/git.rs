//! Git checkouts for git sources, via libgit2.

use std::path::{Path, PathBuf};

use git2::{FetchOptions, Oid, Repository, build::CheckoutBuilder};

use super::GitSpec;
use crate::error::{ConduitError, Result};

/// A working tree checked out at a specific commit.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub dir: PathBuf,
    pub commit: String,
}

/// Clone (or update) the repository under `cache_dir` and check out the
/// requested ref.
pub fn checkout(spec: &GitSpec, cache_dir: &Path) -> Result<Checkout> {
    let dir = spec.checkout_dir(cache_dir);
    let git_err = |e: git2::Error| ConduitError::Git {
        url: spec.repo_url.clone(),
        reason: e.message().to_string(),
    };

    let repo = if dir.join(".git").is_dir() {
        tracing::debug!(url = %spec.repo_url, dir = %dir.display(), "Updating cached checkout");
        let repo = Repository::open(&dir).map_err(git_err)?;
        fetch_origin(&repo).map_err(git_err)?;
        repo
    } else {
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| ConduitError::io(&dir, e))?;
        }
        if let Some(parent) = dir.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConduitError::io(parent, e))?;
        }
        tracing::debug!(url = %spec.repo_url, dir = %dir.display(), "Cloning repository");
        Repository::clone(&spec.repo_url, &dir).map_err(git_err)?
    };

    let oid = resolve_reference(&repo, spec.reference.as_deref()).map_err(|e| ConduitError::Git {
        url: spec.repo_url.clone(),
        reason: match &spec.reference {
            Some(reference) => format!("cannot resolve ref '{}': {}", reference, e.message()),
            None => format!("cannot resolve default branch: {}", e.message()),
        },
    })?;

    let commit = repo.find_commit(oid).map_err(git_err)?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
        .map_err(git_err)?;
    repo.set_head_detached(oid).map_err(git_err)?;

    Ok(Checkout {
        dir,
        commit: oid.to_string(),
    })
}

fn fetch_origin(repo: &Repository) -> std::result::Result<(), git2::Error> {
    let mut remote = repo.find_remote("origin")?;
    let mut options = FetchOptions::new();
    options.download_tags(git2::AutotagOption::All);
    remote.fetch(
        &[
            "+refs/heads/*:refs/remotes/origin/*",
            "+refs/tags/*:refs/tags/*",
        ],
        Some(&mut options),
        None,
    )
}

/// Commit for `reference`: a remote branch, a tag, or any revspec. With no
/// reference, the remote's default branch, falling back to the usual
/// branch names when `origin/HEAD` was not recorded.
fn resolve_reference(repo: &Repository, reference: Option<&str>) -> std::result::Result<Oid, git2::Error> {
    let candidates: Vec<String> = match reference {
        Some(reference) => vec![
            format!("refs/remotes/origin/{}", reference),
            format!("refs/tags/{}", reference),
            reference.to_string(),
        ],
        None => vec![
            "refs/remotes/origin/HEAD".to_string(),
            "refs/remotes/origin/main".to_string(),
            "refs/remotes/origin/master".to_string(),
            "HEAD".to_string(),
        ],
    };

    let mut last_err = None;
    for candidate in &candidates {
        match repo
            .revparse_single(candidate)
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => return Ok(commit.id()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| git2::Error::from_str("no candidate refs")))
}
