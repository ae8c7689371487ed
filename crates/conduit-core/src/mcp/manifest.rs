//! Server manifest (`server.json`) schema and conversion to the canonical model.
//!
//! A manifest names one MCP server and its transport. Two layouts are
//! accepted for the transport:
//!
//! ```json
//! { "name": "io.github.acme/echo", "transport": "stdio", "command": "node", "args": ["echo.js"] }
//! { "name": "io.github.acme/echo", "transport": { "type": "stdio", "command": "node" } }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{ConduitError, Result};
use crate::mcp::spec::{NormalizedServer, SecretSpec, Transport, TransportKind, installed_name_for};

/// Parsed manifest document, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Published version, recorded in the lockfile when present.
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    transport: Option<ManifestTransport>,

    #[serde(flatten)]
    fields: TransportFields,

    #[serde(default)]
    secrets: Vec<ManifestSecret>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ManifestTransport {
    Kind(String),
    Inline(InlineTransport),
}

#[derive(Debug, Clone, Deserialize)]
struct InlineTransport {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    fields: TransportFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TransportFields {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    args: Option<Vec<String>>,
    #[serde(default)]
    env: Option<BTreeMap<String, String>>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestSecret {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    required: Option<bool>,
}

impl ServerManifest {
    /// Deserialize a manifest without validating its contents.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ConduitError::validation("manifest", format!("malformed JSON: {}", e)))
    }

    /// Build from an already-decoded JSON value (e.g. a registry response).
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ConduitError::validation("manifest", format!("malformed document: {}", e)))
    }

    /// Validate and convert into the canonical model.
    pub fn to_server(&self) -> Result<NormalizedServer> {
        let name = non_empty(self.name.as_deref())
            .ok_or_else(|| ConduitError::validation("manifest", "missing required field 'name'"))?;
        if installed_name_for(name).trim().is_empty() {
            return Err(ConduitError::validation(
                format!("manifest '{}'", name),
                "name must not end with '/'",
            ));
        }

        let (kind, fields) = match &self.transport {
            Some(ManifestTransport::Kind(kind)) => (kind.as_str(), &self.fields),
            Some(ManifestTransport::Inline(inline)) => (inline.kind.as_str(), &inline.fields),
            None => {
                return Err(ConduitError::validation(
                    format!("manifest '{}'", name),
                    "missing required field 'transport'",
                ));
            }
        };
        let kind: TransportKind = kind.parse().map_err(|_| {
            ConduitError::validation(
                format!("manifest '{}'", name),
                format!("transport '{}' is not one of stdio, http, sse", kind),
            )
        })?;

        let transport = build_transport(name, kind, fields)?;

        let secrets = self
            .secrets
            .iter()
            .map(|secret| SecretSpec {
                name: secret.name.clone(),
                description: secret.description.clone(),
                required: secret.required.unwrap_or(true),
            })
            .collect();

        let mut server = NormalizedServer::new(name, transport).with_secrets(secrets);
        if let Some(description) = non_empty(self.description.as_deref()) {
            server = server.with_description(description);
        }
        Ok(server)
    }
}

/// Parse raw manifest text into a canonical server.
pub fn parse_manifest(raw: &str) -> Result<NormalizedServer> {
    ServerManifest::parse(raw)?.to_server()
}

fn build_transport(name: &str, kind: TransportKind, fields: &TransportFields) -> Result<Transport> {
    match kind {
        TransportKind::Stdio => {
            let command = non_empty(fields.command.as_deref()).ok_or_else(|| {
                ConduitError::validation(
                    format!("manifest '{}'", name),
                    "stdio transport requires a non-empty 'command'",
                )
            })?;
            Ok(Transport::Stdio {
                command: command.to_string(),
                args: fields.args.clone().unwrap_or_default(),
                env: fields.env.clone().unwrap_or_default(),
                cwd: non_empty(fields.cwd.as_deref()).map(str::to_string),
            })
        }
        TransportKind::Http | TransportKind::Sse => {
            let url = non_empty(fields.url.as_deref()).ok_or_else(|| {
                ConduitError::validation(
                    format!("manifest '{}'", name),
                    format!("{} transport requires a non-empty 'url'", kind),
                )
            })?;
            let url = url.to_string();
            let headers = fields.headers.clone().unwrap_or_default();
            Ok(if kind == TransportKind::Http {
                Transport::Http { url, headers }
            } else {
                Transport::Sse { url, headers }
            })
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
