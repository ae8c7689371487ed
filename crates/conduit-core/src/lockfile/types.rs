//! Lock file types.
//!
//! On disk the lock file is camelCase JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "servers": {
//!     "io.github.acme/echo": {
//!       "serverId": "io.github.acme/echo",
//!       "source": { "type": "local", "url": "file:///src/echo", "path": "/src/echo" },
//!       "metadataHash": "3f2a9c0e1b7d4a55",
//!       "targets": [{ "agent": "codex", "scope": "user", "installedName": "echo" }],
//!       "installedAt": "2026-01-01T00:00:00Z",
//!       "updatedAt": "2026-01-01T00:00:00Z"
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Scope;

/// Lock file format version.
pub const LOCK_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,
    #[serde(default)]
    pub servers: BTreeMap<String, LockEntry>,
}

impl LockFile {
    pub fn new() -> Self {
        Self {
            version: LOCK_VERSION,
            servers: BTreeMap::new(),
        }
    }
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Install record for one server id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEntry {
    pub server_id: String,
    pub source: LockSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub metadata_hash: String,
    #[serde(default)]
    pub targets: Vec<LockTarget>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LockEntry {
    /// Target for `agent`, if the server is installed there.
    pub fn target_for(&self, agent: &str, scope: Scope) -> Option<&LockTarget> {
        self.targets
            .iter()
            .find(|t| t.agent == agent && t.scope == scope)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Registry,
    Git,
    Local,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Registry => "registry",
            SourceKind::Git => "git",
            SourceKind::Local => "local",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an installed server came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSource {
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One agent/scope a server was written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockTarget {
    pub agent: String,
    pub scope: Scope,
    pub installed_name: String,
}

impl LockTarget {
    pub fn new(agent: impl Into<String>, scope: Scope, installed_name: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            scope,
            installed_name: installed_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_uses_camel_case_fields() {
        let at = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let entry = LockEntry {
            server_id: "acme/echo".to_string(),
            source: LockSource {
                kind: SourceKind::Registry,
                url: "https://registry.test/v0/servers/acme%2Fecho".to_string(),
                path: None,
            },
            version: Some("1.0.0".to_string()),
            metadata_hash: "0123456789abcdef".to_string(),
            targets: vec![LockTarget::new("codex", Scope::User, "echo")],
            installed_at: at,
            updated_at: at,
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["serverId"], "acme/echo");
        assert_eq!(value["source"], json!({"type": "registry", "url": "https://registry.test/v0/servers/acme%2Fecho"}));
        assert_eq!(value["targets"][0], json!({"agent": "codex", "scope": "user", "installedName": "echo"}));
        assert_eq!(value["installedAt"], "2026-01-01T00:00:00Z");

        let back: LockEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn target_lookup_matches_agent_and_scope() {
        let at = Utc::now();
        let entry = LockEntry {
            server_id: "echo".to_string(),
            source: LockSource {
                kind: SourceKind::Local,
                url: "file:///x".to_string(),
                path: Some("/x".to_string()),
            },
            version: None,
            metadata_hash: String::new(),
            targets: vec![LockTarget::new("codex", Scope::Project, "echo")],
            installed_at: at,
            updated_at: at,
        };
        assert!(entry.target_for("codex", Scope::Project).is_some());
        assert!(entry.target_for("codex", Scope::User).is_none());
    }
}
