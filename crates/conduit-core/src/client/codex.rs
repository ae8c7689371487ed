//! Codex client implementation.
//!
//! Codex reads `config.toml` with one `[mcp_servers.<name>]` table per
//! server:
//!
//! ```toml
//! [mcp_servers.echo]
//! command = "node"
//! args = ["echo.js"]
//!
//! [mcp_servers.remote]
//! url = "https://example.com/mcp"
//! auth = { type = "bearer", token_env = "MCP_TOKEN" }
//! ```
//!
//! Tokens are never written; the `auth` table only names the environment
//! variable Codex reads the token from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use super::entry::{EntryReader, insert_map, string_array};
use super::{AgentAdapter, ClientContext};
use crate::config::client_config::{ConfigSerializer, TomlSerializer};
use crate::error::Result;
use crate::mcp::{NormalizedServer, Transport};
use crate::types::Scope;

const SCOPES: &[Scope] = &[Scope::Project, Scope::User];

/// Environment variable Codex is pointed at for remote server tokens.
pub const TOKEN_ENV: &str = "MCP_TOKEN";

#[derive(Debug, Clone)]
pub struct CodexClient {
    ctx: ClientContext,
}

impl CodexClient {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }
}

impl AgentAdapter for CodexClient {
    fn id(&self) -> &'static str {
        "codex"
    }

    fn display_name(&self) -> &'static str {
        "Codex"
    }

    fn supported_scopes(&self) -> &'static [Scope] {
        SCOPES
    }

    fn detect_installed(&self) -> bool {
        self.ctx.codex_dir().is_dir()
    }

    fn config_path(&self, scope: Scope, working_dir: &Path) -> Result<PathBuf> {
        match scope {
            Scope::Project => Ok(working_dir.join(".codex").join("config.toml")),
            Scope::User => Ok(self.ctx.codex_dir().join("config.toml")),
        }
    }

    fn serializer(&self) -> &dyn ConfigSerializer {
        &TomlSerializer
    }

    fn server_map_path(&self) -> &'static [&'static str] {
        &["mcp_servers"]
    }

    fn to_client_entry(&self, server: &NormalizedServer) -> Result<Option<Value>> {
        let mut fields = Map::new();
        match &server.transport {
            Transport::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                fields.insert("command".to_string(), json!(command));
                fields.insert("args".to_string(), string_array(args.iter().cloned()));
                insert_map(&mut fields, "env", env);
                if let Some(cwd) = cwd {
                    fields.insert("cwd".to_string(), json!(cwd));
                }
            }
            Transport::Http { url, headers } | Transport::Sse { url, headers } => {
                fields.insert("url".to_string(), json!(url));
                if let Some(auth) = auth_for_headers(headers) {
                    fields.insert("auth".to_string(), auth);
                }
                let dropped = headers
                    .keys()
                    .filter(|k| !k.eq_ignore_ascii_case("authorization"))
                    .count();
                if dropped > 0 {
                    tracing::debug!(
                        server = %server.id,
                        dropped,
                        "Codex config has no header table, dropping non-auth headers"
                    );
                }
            }
        }
        Ok(Some(Value::Object(fields)))
    }

    fn from_client_entry(&self, name: &str, entry: &Value) -> Result<NormalizedServer> {
        let reader = EntryReader::new(self.id(), name, entry)?;
        if reader.has("url") {
            let mut headers = BTreeMap::new();
            if let Some(token) = reader
                .get("auth")
                .and_then(|auth| auth.get("token"))
                .and_then(Value::as_str)
            {
                headers.insert("Authorization".to_string(), format!("Bearer {}", token));
            }
            // sse and http look the same on disk
            let transport = Transport::Http {
                url: reader.required_str("url")?,
                headers,
            };
            return Ok(NormalizedServer::new(name, transport));
        }

        let transport = Transport::Stdio {
            command: reader.required_str("command")?,
            args: reader.string_list("args")?,
            env: reader.string_map("env")?,
            cwd: reader.opt_str("cwd")?,
        };
        Ok(NormalizedServer::new(name, transport))
    }
}

/// `auth` table inferred from an `Authorization` header, if any.
fn auth_for_headers(headers: &BTreeMap<String, String>) -> Option<Value> {
    let (_, value) = headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("authorization"))?;
    let kind = if value.starts_with("Bearer ") {
        "bearer"
    } else {
        "custom"
    };
    Some(json!({"type": kind, "token_env": TOKEN_ENV}))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CodexClient {
        CodexClient::new(ClientContext::new("/home/u"))
    }

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn paths_follow_scope_and_codex_home() {
        assert_eq!(
            client().config_path(Scope::Project, Path::new("/work")).unwrap(),
            PathBuf::from("/work/.codex/config.toml")
        );
        let custom = CodexClient::new(ClientContext::new("/home/u").with_codex_home("/opt/codex"));
        assert_eq!(
            custom.config_path(Scope::User, Path::new("/work")).unwrap(),
            PathBuf::from("/opt/codex/config.toml")
        );
    }

    #[test]
    fn bearer_header_becomes_auth_table() {
        let server = NormalizedServer::http("remote", "https://x.test/mcp")
            .with_headers(headers(&[("Authorization", "Bearer secret-token")]));
        let entry = client().to_client_entry(&server).unwrap().unwrap();

        assert_eq!(
            entry,
            json!({"url": "https://x.test/mcp", "auth": {"type": "bearer", "token_env": "MCP_TOKEN"}})
        );
        assert!(!entry.to_string().contains("secret-token"));
    }

    #[test]
    fn other_auth_scheme_is_custom() {
        let server = NormalizedServer::sse("remote", "https://x.test/sse")
            .with_headers(headers(&[("authorization", "Token abc"), ("X-Other", "1")]));
        let entry = client().to_client_entry(&server).unwrap().unwrap();
        assert_eq!(entry["auth"]["type"], "custom");
        assert!(entry.get("headers").is_none());
    }

    #[test]
    fn no_header_means_no_auth() {
        let entry = client()
            .to_client_entry(&NormalizedServer::http("remote", "https://x.test"))
            .unwrap()
            .unwrap();
        assert_eq!(entry, json!({"url": "https://x.test"}));
    }

    #[test]
    fn literal_token_is_read_back_as_bearer() {
        let server = client()
            .from_client_entry(
                "remote",
                &json!({"url": "https://x.test", "auth": {"type": "bearer", "token": "t0k"}}),
            )
            .unwrap();
        assert_eq!(
            server.transport.headers().unwrap().get("Authorization").map(String::as_str),
            Some("Bearer t0k")
        );
    }

    #[test]
    fn token_env_alone_yields_no_header() {
        let server = client()
            .from_client_entry(
                "remote",
                &json!({"url": "https://x.test", "auth": {"type": "bearer", "token_env": "MCP_TOKEN"}}),
            )
            .unwrap();
        assert!(server.transport.headers().unwrap().is_empty());
    }

    #[test]
    fn stdio_entry_keeps_cwd() {
        let server = NormalizedServer::stdio("s", "python", vec!["-m".into(), "srv".into()])
            .with_cwd("/srv");
        let client = client();
        let entry = client.to_client_entry(&server).unwrap().unwrap();
        let back = client.from_client_entry("s", &entry).unwrap();
        assert_eq!(back.transport, server.transport);
    }
}
