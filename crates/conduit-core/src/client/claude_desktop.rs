//! Claude Desktop client implementation.
//!
//! User scope only. Entries have no `type` tag and only stdio servers can
//! be expressed:
//!
//! ```json
//! { "mcpServers": { "echo": { "command": "node", "args": ["echo.js"] } } }
//! ```

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};

use super::entry::{EntryReader, insert_map, string_array};
use super::{AgentAdapter, ClientContext};
use crate::config::client_config::{ConfigSerializer, JsonSerializer};
use crate::error::Result;
use crate::mcp::{NormalizedServer, Transport};
use crate::types::Scope;

const SCOPES: &[Scope] = &[Scope::User];
const CONFIG_FILE: &str = "claude_desktop_config.json";

#[derive(Debug, Clone)]
pub struct ClaudeDesktopClient {
    ctx: ClientContext,
}

impl ClaudeDesktopClient {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// The `Claude` application directory for the current OS.
    pub fn app_dir(&self) -> PathBuf {
        app_dir_for(std::env::consts::OS, &self.ctx.home_dir)
    }
}

fn app_dir_for(os: &str, home: &Path) -> PathBuf {
    match os {
        "macos" => home.join("Library/Application Support/Claude"),
        "windows" => home.join("AppData/Roaming/Claude"),
        _ => home.join(".config/Claude"),
    }
}

impl AgentAdapter for ClaudeDesktopClient {
    fn id(&self) -> &'static str {
        "claude-desktop"
    }

    fn display_name(&self) -> &'static str {
        "Claude Desktop"
    }

    fn supported_scopes(&self) -> &'static [Scope] {
        SCOPES
    }

    fn detect_installed(&self) -> bool {
        self.app_dir().is_dir()
    }

    fn config_path(&self, scope: Scope, _working_dir: &Path) -> Result<PathBuf> {
        self.ensure_scope(scope)?;
        Ok(self.app_dir().join(CONFIG_FILE))
    }

    fn serializer(&self) -> &dyn ConfigSerializer {
        &JsonSerializer
    }

    fn server_map_path(&self) -> &'static [&'static str] {
        &["mcpServers"]
    }

    fn to_client_entry(&self, server: &NormalizedServer) -> Result<Option<Value>> {
        let Transport::Stdio {
            command,
            args,
            env,
            cwd,
        } = &server.transport
        else {
            return Ok(None);
        };
        if cwd.is_some() {
            tracing::debug!(server = %server.id, "Claude Desktop has no cwd setting, dropping it");
        }
        let mut fields = Map::new();
        fields.insert("command".to_string(), json!(command));
        fields.insert("args".to_string(), string_array(args.iter().cloned()));
        insert_map(&mut fields, "env", env);
        Ok(Some(Value::Object(fields)))
    }

    fn from_client_entry(&self, name: &str, entry: &Value) -> Result<NormalizedServer> {
        let reader = EntryReader::new(self.id(), name, entry)?;
        let transport = Transport::Stdio {
            command: reader.required_str("command")?,
            args: reader.string_list("args")?,
            env: reader.string_map("env")?,
            cwd: None,
        };
        Ok(NormalizedServer::new(name, transport))
    }
}
