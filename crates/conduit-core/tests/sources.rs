//! Integration tests for resolving local and git sources.

mod support;

use std::fs;

use git2::Repository;
use serde_json::json;
use tempfile::TempDir;

use conduit_core::error::ConduitError;
use conduit_core::lockfile::SourceKind;
use conduit_core::source::{GitSpec, SourceResolver, SourceSpec};

use support::{commit_all, write_manifest};

fn resolver(cache: &std::path::Path) -> SourceResolver {
    SourceResolver::new("https://registry.invalid", cache)
}

fn echo_manifest(version: &str) -> serde_json::Value {
    json!({
        "name": "io.github.acme/echo",
        "description": "Echoes input",
        "version": version,
        "transport": "stdio",
        "command": "node",
        "args": ["echo.js"]
    })
}

#[test]
fn local_directory_with_manifest() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("echo");
    write_manifest(&dir, &echo_manifest("1.0.0"));

    let resolved = resolver(&temp.path().join("cache")).resolve_local(&dir).unwrap();

    assert_eq!(resolved.servers.len(), 1);
    assert_eq!(resolved.servers[0].id, "io.github.acme/echo");
    assert_eq!(resolved.version.as_deref(), Some("1.0.0"));
    assert_eq!(resolved.source.kind, SourceKind::Local);
    assert!(resolved.source.url.starts_with("file://"));
    assert_eq!(resolved.source.path.as_deref(), Some(dir.to_str().unwrap()));
}

#[test]
fn local_manifest_file_path() {
    let temp = TempDir::new().unwrap();
    let file = write_manifest(&temp.path().join("echo"), &echo_manifest("2.0.0"));

    let resolved = resolver(temp.path()).resolve_local(&file).unwrap();
    assert_eq!(resolved.servers[0].installed_name(), "echo");
}

#[test]
fn local_directory_scans_subdirectories_in_order() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("servers");
    write_manifest(
        &root.join("zeta"),
        &json!({"name": "acme/zeta", "transport": "http", "url": "https://zeta.test/mcp"}),
    );
    write_manifest(&root.join("alpha"), &echo_manifest("1.0.0"));
    fs::create_dir_all(root.join("empty")).unwrap();

    let resolved = resolver(temp.path()).resolve_local(&root).unwrap();
    let ids: Vec<_> = resolved.servers.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["io.github.acme/echo", "acme/zeta"]);
    assert!(resolved.version.is_none());
}

#[test]
fn local_directory_without_manifests_is_not_found() {
    let temp = TempDir::new().unwrap();
    let result = resolver(temp.path()).resolve_local(temp.path());
    assert!(matches!(result, Err(ConduitError::NotFound { .. })));
}

#[test]
fn invalid_manifest_names_the_file() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("bad");
    write_manifest(&dir, &json!({"name": "acme/bad", "transport": "stdio"}));

    let err = resolver(temp.path()).resolve_local(&dir).unwrap_err();
    assert!(matches!(err, ConduitError::Validation { .. }));
    assert!(err.to_string().contains("server.json"), "{err}");
}

#[tokio::test]
async fn git_source_checks_out_requested_tag() {
    let temp = TempDir::new().unwrap();
    let repo_dir = temp.path().join("repo");
    let repo = Repository::init(&repo_dir).unwrap();

    write_manifest(&repo_dir, &echo_manifest("1.0.0"));
    let first = commit_all(&repo, "v1");
    let commit = repo.find_commit(first).unwrap();
    repo.tag_lightweight("v1.0.0", commit.as_object(), false).unwrap();

    write_manifest(&repo_dir, &echo_manifest("2.0.0"));
    commit_all(&repo, "v2");

    let url = url::Url::from_file_path(&repo_dir).unwrap().to_string();
    let cache = temp.path().join("cache");
    let resolver = resolver(&cache);

    let spec = SourceSpec::Git(GitSpec::new(&url).with_reference("v1.0.0"));
    let resolved = resolver.resolve(&spec).await.unwrap();
    assert_eq!(resolved.version.as_deref(), Some("1.0.0"));
    assert_eq!(resolved.source.kind, SourceKind::Git);

    let latest = resolver
        .resolve(&SourceSpec::Git(GitSpec::new(&url)))
        .await
        .unwrap();
    assert_eq!(latest.version.as_deref(), Some("2.0.0"));
    assert!(GitSpec::new(&url).checkout_dir(&cache).join(".git").is_dir());
}

#[tokio::test]
async fn git_source_without_manifest_version_uses_commit() {
    let temp = TempDir::new().unwrap();
    let repo_dir = temp.path().join("repo");
    let repo = Repository::init(&repo_dir).unwrap();
    write_manifest(
        &repo_dir,
        &json!({"name": "acme/remote", "transport": "sse", "url": "https://x.test/sse"}),
    );
    let oid = commit_all(&repo, "initial");

    let url = url::Url::from_file_path(&repo_dir).unwrap().to_string();
    let resolved = resolver(&temp.path().join("cache"))
        .resolve(&SourceSpec::Git(GitSpec::new(url)))
        .await
        .unwrap();
    assert_eq!(resolved.version, Some(oid.to_string()));
}

#[tokio::test]
async fn git_source_with_unknown_ref_fails() {
    let temp = TempDir::new().unwrap();
    let repo_dir = temp.path().join("repo");
    let repo = Repository::init(&repo_dir).unwrap();
    write_manifest(&repo_dir, &echo_manifest("1.0.0"));
    commit_all(&repo, "initial");

    let url = url::Url::from_file_path(&repo_dir).unwrap().to_string();
    let result = resolver(&temp.path().join("cache"))
        .resolve(&SourceSpec::Git(GitSpec::new(url).with_reference("no-such-ref")))
        .await;
    assert!(matches!(result, Err(ConduitError::Git { .. })));
}
