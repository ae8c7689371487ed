//! Agent adapter layer.
//!
//! Each supported agent (Claude Code, Claude Desktop, Codex, OpenCode) owns
//! one config file per scope and one server-map subtree inside it. An
//! adapter supplies the file location, the document format and the
//! forward/reverse transform between [`NormalizedServer`] and the agent's
//! entry schema; the read-merge-write behaviour is shared through the
//! provided methods of [`AgentAdapter`].

pub mod claude_code;
pub mod claude_desktop;
pub mod codex;
mod entry;
pub mod opencode;
pub mod registry;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::config::client_config::{ConfigSerializer, read_section, write_section};
use crate::error::{ConduitError, Result};
use crate::mcp::NormalizedServer;
use crate::types::Scope;

pub use claude_code::ClaudeCodeClient;
pub use claude_desktop::ClaudeDesktopClient;
pub use codex::CodexClient;
pub use opencode::OpenCodeClient;
pub use registry::ClientRegistry;

/// Environment the adapters resolve their paths against.
///
/// Built from the process environment by [`ClientContext::from_env`]; tests
/// construct it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub home_dir: PathBuf,
    /// `CLAUDE_CONFIG_DIR`
    pub claude_config_dir: Option<PathBuf>,
    /// `CODEX_HOME`
    pub codex_home: Option<PathBuf>,
    /// `XDG_CONFIG_HOME`
    pub xdg_config_home: Option<PathBuf>,
}

impl ClientContext {
    /// Context rooted at `home_dir` with no overrides.
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            claude_config_dir: None,
            codex_home: None,
            xdg_config_home: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        let home_dir = dirs::home_dir()
            .ok_or_else(|| ConduitError::not_found("home directory"))?;
        let var = |key: &str| {
            std::env::var_os(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Ok(Self {
            home_dir,
            claude_config_dir: var("CLAUDE_CONFIG_DIR"),
            codex_home: var("CODEX_HOME"),
            xdg_config_home: var("XDG_CONFIG_HOME"),
        })
    }

    pub fn with_claude_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.claude_config_dir = Some(dir.into());
        self
    }

    pub fn with_codex_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.codex_home = Some(dir.into());
        self
    }

    pub fn with_xdg_config_home(mut self, dir: impl Into<PathBuf>) -> Self {
        self.xdg_config_home = Some(dir.into());
        self
    }

    /// `CLAUDE_CONFIG_DIR` or `~/.claude`.
    pub fn claude_dir(&self) -> PathBuf {
        self.claude_config_dir
            .clone()
            .unwrap_or_else(|| self.home_dir.join(".claude"))
    }

    /// `CODEX_HOME` or `~/.codex`.
    pub fn codex_dir(&self) -> PathBuf {
        self.codex_home
            .clone()
            .unwrap_or_else(|| self.home_dir.join(".codex"))
    }

    /// `XDG_CONFIG_HOME` or `~/.config`.
    pub fn xdg_config_dir(&self) -> PathBuf {
        self.xdg_config_home
            .clone()
            .unwrap_or_else(|| self.home_dir.join(".config"))
    }
}

/// Server map read from an agent config file.
#[derive(Debug, Clone)]
pub struct ParsedConfig {
    pub path: PathBuf,
    /// Entries in the agent's own schema, in file order.
    pub servers: Map<String, Value>,
    /// Full file text; empty if the file does not exist.
    pub raw: String,
}

/// A server found in an agent config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledServer {
    /// Key of the entry in the server map.
    pub name: String,
    pub server: NormalizedServer,
}

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Install under this name instead of the server's installed name.
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Installed {
        name: String,
        /// An entry with the same name was overwritten.
        replaced: bool,
    },
    /// The agent cannot represent the server's transport.
    Skipped { reason: String },
}

/// Adapter between the canonical server model and one agent's config file.
///
/// Implementors provide location, format and entry transforms; the
/// provided methods implement reading, merge-preserving writes, listing,
/// adding and removing on top of them.
pub trait AgentAdapter: std::fmt::Debug + Send + Sync {
    /// Stable identifier, e.g. `claude-code`.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn supported_scopes(&self) -> &'static [Scope];

    /// Best-effort check for the agent on this machine. Never fails.
    fn detect_installed(&self) -> bool;

    /// Config file for `scope`. Fails with
    /// [`ConduitError::UnsupportedScope`] for scopes the agent lacks.
    fn config_path(&self, scope: Scope, working_dir: &Path) -> Result<PathBuf>;

    fn serializer(&self) -> &dyn ConfigSerializer;

    /// Key path of the server map inside the config document.
    fn server_map_path(&self) -> &'static [&'static str];

    /// Forward transform. `Ok(None)` if the agent cannot express the
    /// server's transport.
    fn to_client_entry(&self, server: &NormalizedServer) -> Result<Option<Value>>;

    /// Reverse transform of the entry stored under `name`.
    fn from_client_entry(&self, name: &str, entry: &Value) -> Result<NormalizedServer>;

    fn supports_scope(&self, scope: Scope) -> bool {
        self.supported_scopes().contains(&scope)
    }

    fn ensure_scope(&self, scope: Scope) -> Result<()> {
        if self.supports_scope(scope) {
            Ok(())
        } else {
            Err(ConduitError::UnsupportedScope {
                agent: self.id().to_string(),
                scope,
            })
        }
    }

    /// Read the server map. A missing file is an empty map; an unparseable
    /// one is [`ConduitError::InvalidConfig`].
    fn read_config(&self, scope: Scope, working_dir: &Path) -> Result<ParsedConfig> {
        let path = self.config_path(scope, working_dir)?;
        let section = read_section(&path, self.server_map_path(), self.serializer())?;
        Ok(ParsedConfig {
            path,
            servers: section.entries,
            raw: section.raw,
        })
    }

    /// Replace the server map, keeping everything else in the file.
    fn write_config(
        &self,
        scope: Scope,
        working_dir: &Path,
        servers: &Map<String, Value>,
    ) -> Result<PathBuf> {
        let path = self.config_path(scope, working_dir)?;
        write_section(&path, self.server_map_path(), servers, self.serializer())?;
        Ok(path)
    }

    /// Every entry of the server map. Entries that cannot be interpreted
    /// are listed as placeholders.
    fn list_installed(&self, scope: Scope, working_dir: &Path) -> Result<Vec<InstalledServer>> {
        let config = self.read_config(scope, working_dir)?;
        let installed = config
            .servers
            .iter()
            .map(|(name, entry)| {
                let server = self.from_client_entry(name, entry).unwrap_or_else(|e| {
                    tracing::warn!(
                        agent = self.id(),
                        server = %name,
                        error = %e,
                        "Unreadable server entry, listing as placeholder"
                    );
                    NormalizedServer::placeholder(name.as_str())
                });
                InstalledServer {
                    name: name.clone(),
                    server,
                }
            })
            .collect();
        Ok(installed)
    }

    /// Install `server` under its installed name. A same-named entry is
    /// overwritten; an unparseable existing file is replaced.
    fn add_server(
        &self,
        scope: Scope,
        working_dir: &Path,
        server: &NormalizedServer,
        options: &AddOptions,
    ) -> Result<AddOutcome> {
        let path = self.config_path(scope, working_dir)?;

        let Some(entry) = self.to_client_entry(server)? else {
            let reason = format!(
                "{} does not support {} servers",
                self.display_name(),
                server.transport.kind()
            );
            tracing::warn!(agent = self.id(), server = %server.id, "{}", reason);
            return Ok(AddOutcome::Skipped { reason });
        };

        let mut servers = match read_section(&path, self.server_map_path(), self.serializer()) {
            Ok(section) => section.entries,
            Err(ConduitError::InvalidConfig { reason, .. }) => {
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    "Existing config is invalid, starting from empty"
                );
                Map::new()
            }
            Err(e) => return Err(e),
        };

        let name = options
            .name
            .clone()
            .unwrap_or_else(|| server.installed_name().to_string());
        let replaced = servers.insert(name.clone(), entry).is_some();
        if replaced {
            tracing::debug!(agent = self.id(), server = %name, "Overwriting existing entry");
        }

        write_section(&path, self.server_map_path(), &servers, self.serializer())?;
        tracing::debug!(
            agent = self.id(),
            server = %name,
            path = %path.display(),
            "Installed server"
        );
        Ok(AddOutcome::Installed { name, replaced })
    }

    /// Remove the entry named `key`. Returns whether an entry was removed;
    /// an absent key leaves the file untouched.
    fn remove_server(&self, scope: Scope, working_dir: &Path, key: &str) -> Result<bool> {
        let mut config = self.read_config(scope, working_dir)?;
        if config.servers.remove(key).is_none() {
            tracing::debug!(agent = self.id(), server = %key, "Server not present, nothing to remove");
            return Ok(false);
        }
        write_section(
            &config.path,
            self.server_map_path(),
            &config.servers,
            self.serializer(),
        )?;
        tracing::debug!(agent = self.id(), server = %key, path = %config.path.display(), "Removed server");
        Ok(true)
    }
}
