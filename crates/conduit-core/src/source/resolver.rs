//! Source resolver: loads manifests from local paths, the registry and git.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::git;
use super::spec::{GitSpec, SourceSpec};
use crate::error::{ConduitError, Result};
use crate::lockfile::{LockSource, SourceKind};
use crate::mcp::{NormalizedServer, ServerManifest};

/// File name of a server manifest inside a directory.
pub const MANIFEST_FILE: &str = "server.json";

const USER_AGENT: &str = concat!("conduit/", env!("CARGO_PKG_VERSION"));

/// Servers loaded from one source.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub servers: Vec<NormalizedServer>,
    pub source: LockSource,
    /// Manifest version, or the commit for git sources without one.
    pub version: Option<String>,
}

/// Resolves [`SourceSpec`]s into normalized servers.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    registry_url: String,
    cache_dir: PathBuf,
}

impl SourceResolver {
    pub fn new(registry_url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry_url: registry_url.into(),
            cache_dir: cache_dir.into(),
        }
    }

    pub fn registry_url(&self) -> &str {
        &self.registry_url
    }

    pub async fn resolve(&self, spec: &SourceSpec) -> Result<ResolvedSource> {
        match spec {
            SourceSpec::Local(path) => self.resolve_local(path),
            SourceSpec::Registry { id } => self.resolve_registry(id).await,
            SourceSpec::Git(git_spec) => {
                let git_spec = git_spec.clone();
                let cache_dir = self.cache_dir.clone();
                let url = git_spec.repo_url.clone();
                tokio::task::spawn_blocking(move || resolve_git(&git_spec, &cache_dir))
                    .await
                    .map_err(|e| ConduitError::Git {
                        url,
                        reason: format!("checkout task failed: {}", e),
                    })?
            }
        }
    }

    /// Load a manifest file, a directory containing `server.json`, or every
    /// immediate subdirectory that contains one.
    pub fn resolve_local(&self, path: &Path) -> Result<ResolvedSource> {
        let path = std::path::absolute(path).map_err(|e| ConduitError::io(path, e))?;
        let servers_with_versions = load_local(&path)?;
        let version = single_version(&servers_with_versions);
        let servers = servers_with_versions.into_iter().map(|(s, _)| s).collect();

        let url = url::Url::from_file_path(&path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| path.display().to_string());
        Ok(ResolvedSource {
            servers,
            source: LockSource {
                kind: SourceKind::Local,
                url,
                path: Some(path.display().to_string()),
            },
            version,
        })
    }

    /// Registry endpoint for a server id: `<registry>/v0/servers/<id>`, with
    /// the id as one percent-encoded path segment.
    pub fn registry_endpoint(&self, id: &str) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.registry_url).map_err(|e| {
            ConduitError::validation("registry URL", format!("'{}': {}", self.registry_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                ConduitError::validation(
                    "registry URL",
                    format!("'{}' cannot be a base URL", self.registry_url),
                )
            })?
            .pop_if_empty()
            .extend(["v0", "servers", id]);
        Ok(url)
    }

    async fn resolve_registry(&self, id: &str) -> Result<ResolvedSource> {
        let url = self.registry_endpoint(id)?;
        let fetch_err = |reason: String| ConduitError::Fetch {
            url: url.to_string(),
            reason,
        };

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| fetch_err(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(%url, "Fetching server from registry");
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ConduitError::not_found(format!("registry server '{}'", id)));
        }
        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| fetch_err(format!("invalid response body: {}", e)))?;
        let (server, version) = server_from_registry_body(body)?;

        Ok(ResolvedSource {
            servers: vec![server],
            source: LockSource {
                kind: SourceKind::Registry,
                url: url.to_string(),
                path: None,
            },
            version,
        })
    }
}

/// Registry responses carry the manifest either directly or wrapped as
/// `{"server": {...}}`.
fn server_from_registry_body(body: Value) -> Result<(NormalizedServer, Option<String>)> {
    let manifest_value = match body {
        Value::Object(mut map) if map.get("server").is_some_and(Value::is_object) => {
            map.remove("server").unwrap_or(Value::Null)
        }
        other => other,
    };
    let manifest = ServerManifest::from_value(manifest_value)?;
    let server = manifest.to_server()?;
    Ok((server, manifest.version))
}

fn resolve_git(spec: &GitSpec, cache_dir: &Path) -> Result<ResolvedSource> {
    let checkout = git::checkout(spec, cache_dir)?;
    let servers_with_versions = load_local(&checkout.dir)?;
    let version = single_version(&servers_with_versions).or(Some(checkout.commit.clone()));
    let servers = servers_with_versions.into_iter().map(|(s, _)| s).collect();

    tracing::debug!(url = %spec.repo_url, commit = %checkout.commit, "Resolved git source");
    Ok(ResolvedSource {
        servers,
        source: LockSource {
            kind: SourceKind::Git,
            url: spec.display_url(),
            path: None,
        },
        version,
    })
}

fn load_local(path: &Path) -> Result<Vec<(NormalizedServer, Option<String>)>> {
    if path.is_file() {
        return Ok(vec![load_manifest(path)?]);
    }
    if !path.is_dir() {
        return Err(ConduitError::not_found(path.display().to_string()));
    }

    let direct = path.join(MANIFEST_FILE);
    if direct.is_file() {
        return Ok(vec![load_manifest(&direct)?]);
    }

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(path)
        .map_err(|e| ConduitError::io(path, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.join(MANIFEST_FILE).is_file())
        .collect();
    dirs.sort();

    if dirs.is_empty() {
        return Err(ConduitError::not_found(format!(
            "{} in {} or its subdirectories",
            MANIFEST_FILE,
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), count = dirs.len(), "Found manifests in subdirectories");
    dirs.iter()
        .map(|dir| load_manifest(&dir.join(MANIFEST_FILE)))
        .collect()
}

fn load_manifest(path: &Path) -> Result<(NormalizedServer, Option<String>)> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConduitError::io(path, e))?;
    let located = |e: ConduitError| match e {
        ConduitError::Validation { reason, .. } => {
            ConduitError::validation(format!("manifest {}", path.display()), reason)
        }
        other => other,
    };
    let manifest = ServerManifest::parse(&raw).map_err(located)?;
    let server = manifest.to_server().map_err(located)?;
    Ok((server, manifest.version))
}

/// The version, when exactly one server was loaded.
fn single_version(loaded: &[(NormalizedServer, Option<String>)]) -> Option<String> {
    match loaded {
        [(_, version)] => version.clone(),
        _ => None,
    }
}
