#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Repository, Signature};
use serde_json::Value;

use conduit_core::client::{ClientContext, ClientRegistry};
use conduit_core::commands::CommandContext;
use conduit_core::lockfile::LockStore;

/// Adapter context rooted at a temporary home.
pub fn client_context(home: &Path) -> ClientContext {
    ClientContext::new(home)
}

/// Command context with a `work/` project directory and a lock file under
/// `state/`, both inside `home`.
pub fn command_context(home: &Path) -> CommandContext {
    let work = project_dir(home);
    fs::create_dir_all(&work).unwrap();
    CommandContext::new(
        ClientRegistry::with_default_clients(client_context(home)),
        LockStore::new(home.join("state/lock.json")),
        work,
    )
}

pub fn project_dir(home: &Path) -> PathBuf {
    home.join("work")
}

pub fn write_manifest(dir: &Path, manifest: &Value) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join("server.json");
    fs::write(&path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
    path
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

pub fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let sig = Signature::now("conduit tests", "tests@conduit.invalid").unwrap();
    match repo.head() {
        Ok(head) => {
            let parent = repo.find_commit(head.target().unwrap()).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])
                .unwrap()
        }
        Err(_) => repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])
            .unwrap(),
    }
}
