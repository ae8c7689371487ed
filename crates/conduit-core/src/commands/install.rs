//! Install command implementation.
//!
//! Writes each resolved server into every selected agent's config, then
//! records the successful targets in the lock file.

use serde::Serialize;

use super::{AgentOutcome, AgentStatus, CommandContext, LockChange, all_failed};
use crate::client::{AddOptions, AddOutcome, AgentAdapter};
use crate::error::{ConduitError, Result};
use crate::lockfile::LockTarget;
use crate::mcp::NormalizedServer;
use crate::source::ResolvedSource;
use crate::types::Scope;

/// Options for the install command
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub scope: Scope,
    /// Agent ids; empty means every detected agent supporting `scope`.
    pub agents: Vec<String>,
    /// Install under this name instead of the server's installed name.
    pub name: Option<String>,
}

impl InstallOptions {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            agents: Vec::new(),
            name: None,
        }
    }

    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Result of installing one server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInstallReport {
    pub server_id: String,
    pub outcomes: Vec<AgentOutcome>,
    #[serde(flatten)]
    pub lock: LockChange,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub servers: Vec<ServerInstallReport>,
}

impl InstallReport {
    /// True if every attempted agent failed for every server.
    pub fn all_failed(&self) -> bool {
        all_failed(self.servers.iter().flat_map(|s| s.outcomes.iter()))
    }

    pub fn installed_count(&self) -> usize {
        self.servers
            .iter()
            .flat_map(|s| s.outcomes.iter())
            .filter(|o| matches!(o.status, AgentStatus::Installed { .. }))
            .count()
    }
}

pub struct InstallCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> InstallCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, source: &ResolvedSource, options: &InstallOptions) -> Result<InstallReport> {
        if source.servers.is_empty() {
            return Err(ConduitError::not_found(format!("servers in {}", source.source.url)));
        }
        if options.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(ConduitError::validation("--name", "name must not be empty"));
        }
        if options.name.is_some() && source.servers.len() > 1 {
            return Err(ConduitError::validation(
                "--name",
                format!(
                    "source {} provides {} servers; a name can only be given for one",
                    source.source.url,
                    source.servers.len()
                ),
            ));
        }

        let agents = self.ctx.select_agents(&options.agents, options.scope)?;
        tracing::info!(
            source = %source.source.url,
            servers = source.servers.len(),
            agents = agents.len(),
            scope = %options.scope,
            "Installing"
        );

        let servers = source
            .servers
            .iter()
            .map(|server| self.install_server(server, source, &agents, options))
            .collect();
        Ok(InstallReport { servers })
    }

    fn install_server(
        &self,
        server: &NormalizedServer,
        source: &ResolvedSource,
        agents: &[&dyn AgentAdapter],
        options: &InstallOptions,
    ) -> ServerInstallReport {
        let add_options = AddOptions {
            name: options.name.clone(),
        };
        let working_dir = self.ctx.working_dir();

        let outcomes: Vec<AgentOutcome> = agents
            .iter()
            .map(|agent| {
                let status = match agent.add_server(options.scope, working_dir, server, &add_options) {
                    Ok(AddOutcome::Installed { name, replaced }) => {
                        tracing::info!(agent = agent.id(), server = %server.id, %name, "Installed");
                        AgentStatus::Installed { name, replaced }
                    }
                    Ok(AddOutcome::Skipped { reason }) => AgentStatus::Skipped { reason },
                    Err(e) => {
                        tracing::warn!(agent = agent.id(), server = %server.id, error = %e, "Install failed");
                        AgentStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                AgentOutcome {
                    agent: agent.id().to_string(),
                    scope: options.scope,
                    status,
                }
            })
            .collect();

        let lock = self.record(server, source, options.scope, &outcomes);
        ServerInstallReport {
            server_id: server.id.clone(),
            outcomes,
            lock,
        }
    }

    /// Merge the new targets into the lock entry. Targets for other agents
    /// or scopes from earlier installs are kept.
    fn record(
        &self,
        server: &NormalizedServer,
        source: &ResolvedSource,
        scope: Scope,
        outcomes: &[AgentOutcome],
    ) -> LockChange {
        let new_targets: Vec<LockTarget> = outcomes
            .iter()
            .filter_map(|o| match &o.status {
                AgentStatus::Installed { name, .. } => Some(LockTarget::new(&o.agent, scope, name)),
                _ => None,
            })
            .collect();
        if new_targets.is_empty() {
            return LockChange::Untouched;
        }

        let store = self.ctx.lock_store();
        let existing = store.get_entry(&server.id);
        let mut targets: Vec<LockTarget> = existing
            .as_ref()
            .map(|entry| {
                entry
                    .targets
                    .iter()
                    .filter(|t| !new_targets.iter().any(|n| n.agent == t.agent && n.scope == t.scope))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        targets.extend(new_targets);

        let result = store.is_stale(&server.id, server).and_then(|stale| {
            let change = match (&existing, stale) {
                (None, _) => LockChange::Created,
                (Some(_), false) => LockChange::Unchanged,
                (Some(_), true) => LockChange::Changed,
            };
            store
                .add_entry(
                    &server.id,
                    source.source.clone(),
                    server,
                    source.version.clone(),
                    targets,
                )
                .map(|_| change)
        });

        result.unwrap_or_else(|e| {
            tracing::warn!(server = %server.id, error = %e, "Failed to update lock file");
            LockChange::Failed {
                error: e.to_string(),
            }
        })
    }
}
