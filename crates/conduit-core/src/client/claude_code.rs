//! Claude Code client implementation.
//!
//! ```json
//! { "mcpServers": { "echo": { "type": "stdio", "command": "node", "args": ["echo.js"] } } }
//! ```
//!
//! Every entry carries an explicit `type` tag.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use super::entry::{EntryReader, insert_map, string_array};
use super::{AgentAdapter, ClientContext};
use crate::config::client_config::{ConfigSerializer, JsonSerializer};
use crate::error::{ConduitError, Result};
use crate::mcp::{NormalizedServer, Transport};
use crate::types::Scope;

const SCOPES: &[Scope] = &[Scope::Project, Scope::User];

#[derive(Debug, Clone)]
pub struct ClaudeCodeClient {
    ctx: ClientContext,
}

impl ClaudeCodeClient {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }
}

impl AgentAdapter for ClaudeCodeClient {
    fn id(&self) -> &'static str {
        "claude-code"
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn supported_scopes(&self) -> &'static [Scope] {
        SCOPES
    }

    fn detect_installed(&self) -> bool {
        self.ctx.claude_dir().is_dir()
    }

    fn config_path(&self, scope: Scope, working_dir: &Path) -> Result<PathBuf> {
        match scope {
            Scope::Project => Ok(working_dir.join(".mcp.json")),
            Scope::User => Ok(self.ctx.claude_dir().join("config.json")),
        }
    }

    fn serializer(&self) -> &dyn ConfigSerializer {
        &JsonSerializer
    }

    fn server_map_path(&self) -> &'static [&'static str] {
        &["mcpServers"]
    }

    fn to_client_entry(&self, server: &NormalizedServer) -> Result<Option<Value>> {
        let mut fields = Map::new();
        fields.insert("type".to_string(), json!(server.transport.kind().as_str()));
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
                insert_map(&mut fields, "headers", headers);
            }
        }
        Ok(Some(Value::Object(fields)))
    }

    fn from_client_entry(&self, name: &str, entry: &Value) -> Result<NormalizedServer> {
        let reader = EntryReader::new(self.id(), name, entry)?;
        // Hand-written entries sometimes omit the tag
        let kind = match reader.opt_str("type")? {
            Some(kind) => kind,
            None if reader.has("url") => "http".to_string(),
            None => "stdio".to_string(),
        };

        let transport = match kind.as_str() {
            "stdio" => Transport::Stdio {
                command: reader.required_str("command")?,
                args: reader.string_list("args")?,
                env: reader.string_map("env")?,
                cwd: reader.opt_str("cwd")?,
            },
            "http" => Transport::Http {
                url: reader.required_str("url")?,
                headers: reader.string_map("headers")?,
            },
            "sse" => Transport::Sse {
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
