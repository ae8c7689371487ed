//! Tool settings (`config.toml`).
//!
//! ```toml
//! registry_url = "https://registry.modelcontextprotocol.io"
//! default_scope = "user"
//! default_agents = ["claude-code", "codex"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::paths;
use crate::types::Scope;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.modelcontextprotocol.io";
pub const REGISTRY_URL_ENV: &str = "CONDUIT_REGISTRY_URL";
pub const LOCK_FILE_ENV: &str = "CONDUIT_LOCK_FILE";

/// User-level settings for conduit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConduitSettings {
    /// Base URL of the MCP server registry.
    pub registry_url: String,
    /// Lock file override; `None` means the state directory default.
    pub lock_file: Option<PathBuf>,
    /// Scope used when `--scope` is not given.
    pub default_scope: Scope,
    /// Agents targeted when `--agent` is not given; empty means all
    /// detected agents.
    pub default_agents: Vec<String>,
}

impl Default for ConduitSettings {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            lock_file: None,
            default_scope: Scope::Project,
            default_agents: Vec::new(),
        }
    }
}

impl ConduitSettings {
    /// Load settings from the default location, then apply environment
    /// overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::settings_path(&paths::global_config_dir()?);
        let mut settings = Self::load_from(&path)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Load settings from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let settings: Self = toml::from_str(content)?;
        url::Url::parse(&settings.registry_url)
            .with_context(|| format!("Invalid registry_url '{}'", settings.registry_url))?;
        Ok(settings)
    }

    /// Apply `CONDUIT_*` overrides using the given variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(REGISTRY_URL_ENV).filter(|v| !v.is_empty()) {
            self.registry_url = url;
        }
        if let Some(path) = lookup(LOCK_FILE_ENV).filter(|v| !v.is_empty()) {
            self.lock_file = Some(PathBuf::from(path));
        }
    }

    /// Lock file path after applying the default.
    pub fn lock_path(&self) -> anyhow::Result<PathBuf> {
        match &self.lock_file {
            Some(path) => Ok(path.clone()),
            None => Ok(paths::lock_path(&paths::state_dir()?)),
        }
    }
}
