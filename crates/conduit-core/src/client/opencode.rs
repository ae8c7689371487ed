//! OpenCode client implementation.
//!
//! OpenCode config is JSONC. Servers live under `mcp.servers`:
//! - local (stdio): `{ "type": "local", "command": [cmd, ...args], "environment": {...}, "enabled": true }`
//! - remote (http/sse): `{ "type": "remote", "url": "...", "headers": {...}, "enabled": true }`

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use super::entry::{EntryReader, insert_map, string_array};
use super::{AgentAdapter, ClientContext};
use crate::config::client_config::{ConfigSerializer, JsoncSerializer};
use crate::error::{ConduitError, Result};
use crate::mcp::{NormalizedServer, Transport};
use crate::types::Scope;

const SCOPES: &[Scope] = &[Scope::Project, Scope::User];

#[derive(Debug, Clone)]
pub struct OpenCodeClient {
    ctx: ClientContext,
}

impl OpenCodeClient {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    fn config_dir(&self) -> PathBuf {
        self.ctx.xdg_config_dir().join("opencode")
    }
}

impl AgentAdapter for OpenCodeClient {
    fn id(&self) -> &'static str {
        "opencode"
    }

    fn display_name(&self) -> &'static str {
        "OpenCode"
    }

    fn supported_scopes(&self) -> &'static [Scope] {
        SCOPES
    }

    fn detect_installed(&self) -> bool {
        self.config_dir().is_dir()
    }

    fn config_path(&self, scope: Scope, working_dir: &Path) -> Result<PathBuf> {
        match scope {
            Scope::Project => {
                let jsonc = working_dir.join("opencode.jsonc");
                if jsonc.is_file() {
                    Ok(jsonc)
                } else {
                    Ok(working_dir.join("opencode.json"))
                }
            }
            Scope::User => Ok(self.config_dir().join("opencode.json")),
        }
    }

    fn serializer(&self) -> &dyn ConfigSerializer {
        &JsoncSerializer
    }

    fn server_map_path(&self) -> &'static [&'static str] {
        &["mcp", "servers"]
    }

    fn to_client_entry(&self, server: &NormalizedServer) -> Result<Option<Value>> {
        let mut fields = Map::new();
        match &server.transport {
            Transport::Stdio {
                command, args, env, ..
            } => {
                fields.insert("type".to_string(), json!("local"));
                let argv = std::iter::once(command.clone()).chain(args.iter().cloned());
                fields.insert("command".to_string(), string_array(argv));
                insert_map(&mut fields, "environment", env);
            }
            Transport::Http { url, headers } | Transport::Sse { url, headers } => {
                fields.insert("type".to_string(), json!("remote"));
                fields.insert("url".to_string(), json!(url));
                insert_map(&mut fields, "headers", headers);
            }
        }
        fields.insert("enabled".to_string(), json!(true));
        Ok(Some(Value::Object(fields)))
    }

    fn from_client_entry(&self, name: &str, entry: &Value) -> Result<NormalizedServer> {
        let reader = EntryReader::new(self.id(), name, entry)?;
        let kind = match reader.opt_str("type")? {
            Some(kind) => kind,
            None if reader.has("url") => "remote".to_string(),
            None => "local".to_string(),
        };

        let transport = match kind.as_str() {
            "local" => {
                let mut argv = reader.string_list("command")?.into_iter();
                let command = argv
                    .next()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| reader.error("missing 'command'"))?;
                Transport::Stdio {
                    command,
                    args: argv.collect(),
                    env: reader.string_map("environment")?,
                    cwd: None,
                }
            }
            "remote" => Transport::Http {
                url: reader.required_str("url")?,
                headers: reader.string_map("headers")?,
            },
            other => {
                return Err(ConduitError::validation(
                    format!("{} entry '{}'", self.id(), name),
                    format!("unknown type '{}'", other),
                ));
            }
        };
        Ok(NormalizedServer::new(name, transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn client() -> OpenCodeClient {
        OpenCodeClient::new(ClientContext::new("/home/u"))
    }

    #[test]
    fn project_path_prefers_existing_jsonc() {
        let temp = TempDir::new().unwrap();
        let client = client();
        assert_eq!(
            client.config_path(Scope::Project, temp.path()).unwrap(),
            temp.path().join("opencode.json")
        );

        std::fs::write(temp.path().join("opencode.jsonc"), "{}").unwrap();
        assert_eq!(
            client.config_path(Scope::Project, temp.path()).unwrap(),
            temp.path().join("opencode.jsonc")
        );
    }

    #[test]
    fn user_path_uses_xdg_override() {
        let client = OpenCodeClient::new(ClientContext::new("/home/u").with_xdg_config_home("/xdg"));
        assert_eq!(
            client.config_path(Scope::User, Path::new("/work")).unwrap(),
            PathBuf::from("/xdg/opencode/opencode.json")
        );
    }

    #[test]
    fn stdio_becomes_local_command_array() {
        let server = NormalizedServer::stdio("acme/echo", "node", vec!["echo.js".into()])
            .with_env(BTreeMap::from([("DEBUG".to_string(), "1".to_string())]));
        let entry = client().to_client_entry(&server).unwrap().unwrap();
        assert_eq!(
            entry,
            json!({
                "type": "local",
                "command": ["node", "echo.js"],
                "environment": {"DEBUG": "1"},
                "enabled": true
            })
        );
    }

    #[test]
    fn remote_reads_back_as_http() {
        let client = client();
        let server = NormalizedServer::sse("events", "https://x.test/sse");
        let entry = client.to_client_entry(&server).unwrap().unwrap();
        assert_eq!(entry, json!({"type": "remote", "url": "https://x.test/sse", "enabled": true}));

        let back = client.from_client_entry("events", &entry).unwrap();
        assert_eq!(
            back.transport,
            Transport::Http {
                url: "https://x.test/sse".to_string(),
                headers: BTreeMap::new()
            }
        );
    }

    #[test]
    fn empty_command_array_is_rejected() {
        let result = client().from_client_entry("x", &json!({"type": "local", "command": []}));
        assert!(matches!(result, Err(ConduitError::Validation { .. })));
    }
}
