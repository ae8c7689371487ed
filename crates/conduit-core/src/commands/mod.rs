//! High-level commands for conduit operations.
//!
//! Commands sequence adapter and lock store calls and collect per-agent
//! outcomes for a frontend to render. A failing agent never stops the
//! others, and nothing is rolled back.

pub mod context;
pub mod install;
pub mod list;
pub mod uninstall;

use serde::Serialize;

use crate::types::Scope;

pub use context::CommandContext;
pub use install::{InstallCommand, InstallOptions, InstallReport, ServerInstallReport};
pub use list::{AgentListing, ListCommand, ListOptions, ListedServer};
pub use uninstall::{UninstallCommand, UninstallOptions, UninstallReport};

/// What happened for one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentStatus {
    Installed { name: String, replaced: bool },
    Skipped { reason: String },
    Removed { name: String },
    NotPresent { name: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentOutcome {
    pub agent: String,
    pub scope: Scope,
    #[serde(flatten)]
    pub status: AgentStatus,
}

impl AgentOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, AgentStatus::Failed { .. })
    }
}

/// Effect of a command on the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "lock", rename_all = "snake_case")]
pub enum LockChange {
    /// First install of this server id.
    Created,
    /// Reinstall with the same metadata hash.
    Unchanged,
    /// Reinstall with a different metadata hash.
    Changed,
    /// Targets were narrowed.
    Updated,
    Removed,
    /// No successful target, or the server was never tracked.
    Untouched,
    /// Writing the lock file failed; the config changes stand.
    Failed { error: String },
}

/// True if there was at least one outcome and every one failed.
pub(crate) fn all_failed<'a>(outcomes: impl IntoIterator<Item = &'a AgentOutcome>) -> bool {
    let mut any = false;
    for outcome in outcomes {
        if !outcome.is_failure() {
            return false;
        }
        any = true;
    }
    any
}
