//! Uninstall command implementation.
//!
//! Removes a server from agent configs and drops the removed targets from
//! the lock file. Removing a server that is not present is not an error.

use serde::Serialize;

use super::{AgentOutcome, AgentStatus, CommandContext, LockChange, all_failed};
use crate::client::AgentAdapter;
use crate::error::Result;
use crate::lockfile::{LockEntry, LockTarget};
use crate::mcp::spec::installed_name_for;
use crate::types::Scope;

/// Options for the uninstall command
#[derive(Debug, Clone)]
pub struct UninstallOptions {
    /// Server id, or the name it was installed under.
    pub key: String,
    pub scope: Scope,
    /// Agent ids; empty means the agents recorded in the lock file, or
    /// every agent supporting `scope` if nothing was recorded.
    pub agents: Vec<String>,
}

impl UninstallOptions {
    pub fn new(key: impl Into<String>, scope: Scope) -> Self {
        Self {
            key: key.into(),
            scope,
            agents: Vec::new(),
        }
    }

    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UninstallReport {
    pub key: String,
    /// Lock entry the key resolved to, if any.
    pub server_id: Option<String>,
    pub outcomes: Vec<AgentOutcome>,
    #[serde(flatten)]
    pub lock: LockChange,
}

impl UninstallReport {
    pub fn all_failed(&self) -> bool {
        all_failed(&self.outcomes)
    }

    pub fn removed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, AgentStatus::Removed { .. }))
            .count()
    }
}

pub struct UninstallCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> UninstallCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &UninstallOptions) -> Result<UninstallReport> {
        let scope = options.scope;
        let entry = self.find_entry(&options.key, scope);
        let agents = self.agents_for(options, entry.as_ref())?;
        tracing::info!(
            key = %options.key,
            server_id = entry.as_ref().map(|e| e.server_id.as_str()),
            agents = agents.len(),
            %scope,
            "Uninstalling"
        );

        let outcomes: Vec<AgentOutcome> = agents
            .iter()
            .map(|agent| {
                let name = entry
                    .as_ref()
                    .and_then(|e| e.target_for(agent.id(), scope))
                    .map(|t| t.installed_name.clone())
                    .unwrap_or_else(|| installed_name_for(&options.key).to_string());

                let status = match agent.remove_server(scope, self.ctx.working_dir(), &name) {
                    Ok(true) => {
                        tracing::info!(agent = agent.id(), server = %name, "Removed");
                        AgentStatus::Removed { name }
                    }
                    Ok(false) => AgentStatus::NotPresent { name },
                    Err(e) => {
                        tracing::warn!(agent = agent.id(), server = %name, error = %e, "Uninstall failed");
                        AgentStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                AgentOutcome {
                    agent: agent.id().to_string(),
                    scope,
                    status,
                }
            })
            .collect();

        let lock = match &entry {
            Some(entry) => self.record(entry, &outcomes),
            None => LockChange::Untouched,
        };

        Ok(UninstallReport {
            key: options.key.clone(),
            server_id: entry.map(|e| e.server_id),
            outcomes,
            lock,
        })
    }

    /// Lock entry for `key`: by server id, else by an installed name in
    /// `scope`.
    fn find_entry(&self, key: &str, scope: Scope) -> Option<LockEntry> {
        let store = self.ctx.lock_store();
        store.get_entry(key).or_else(|| {
            store.list_entries().into_iter().find(|entry| {
                entry
                    .targets
                    .iter()
                    .any(|t| t.scope == scope && t.installed_name == key)
            })
        })
    }

    fn agents_for(
        &self,
        options: &UninstallOptions,
        entry: Option<&LockEntry>,
    ) -> Result<Vec<&'a dyn AgentAdapter>> {
        if !options.agents.is_empty() {
            return self.ctx.select_agents(&options.agents, options.scope);
        }

        let registry = self.ctx.registry();
        let recorded: Vec<String> = entry
            .map(|e| {
                e.targets
                    .iter()
                    .filter(|t| t.scope == options.scope)
                    .map(|t| t.agent.clone())
                    .collect()
            })
            .unwrap_or_default();
        if recorded.is_empty() {
            return Ok(registry.clients_for_scope(options.scope));
        }
        Ok(registry.filter_by_targets(&recorded))
    }

    /// Drop targets the server is now absent from.
    fn record(&self, entry: &LockEntry, outcomes: &[AgentOutcome]) -> LockChange {
        let gone = |target: &LockTarget| {
            outcomes.iter().any(|o| {
                o.agent == target.agent
                    && o.scope == target.scope
                    && matches!(
                        o.status,
                        AgentStatus::Removed { .. } | AgentStatus::NotPresent { .. }
                    )
            })
        };
        let remaining: Vec<LockTarget> = entry.targets.iter().filter(|t| !gone(t)).cloned().collect();
        if remaining.len() == entry.targets.len() && !remaining.is_empty() {
            return LockChange::Untouched;
        }

        let store = self.ctx.lock_store();
        let result = if remaining.is_empty() {
            store.remove_entry(&entry.server_id).map(|_| LockChange::Removed)
        } else {
            store
                .update_entry_targets(&entry.server_id, remaining)
                .map(|_| LockChange::Updated)
        };
        result.unwrap_or_else(|e| {
            tracing::warn!(server = %entry.server_id, error = %e, "Failed to update lock file");
            LockChange::Failed {
                error: e.to_string(),
            }
        })
    }
}
