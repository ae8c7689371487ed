//! List command: installed servers per agent, cross-referenced with the
//! lock file.

use std::path::PathBuf;

use serde::Serialize;

use super::CommandContext;
use crate::error::Result;
use crate::lockfile::LockEntry;
use crate::mcp::NormalizedServer;
use crate::types::Scope;

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub scope: Scope,
    /// Agent ids; empty means every agent supporting `scope`.
    pub agents: Vec<String>,
}

impl ListOptions {
    pub fn new(scope: Scope) -> Self {
        Self {
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
pub struct ListedServer {
    pub name: String,
    pub server: NormalizedServer,
    /// Server id of the lock entry that installed this name, if any.
    pub lock_entry: Option<String>,
}

/// Servers found in one agent's config.
#[derive(Debug, Clone, Serialize)]
pub struct AgentListing {
    pub agent: String,
    pub display_name: String,
    pub scope: Scope,
    pub config_path: Option<PathBuf>,
    pub servers: Vec<ListedServer>,
    /// Set when the config could not be read; `servers` is then empty.
    pub error: Option<String>,
}

pub struct ListCommand<'a> {
    ctx: &'a CommandContext,
}

impl<'a> ListCommand<'a> {
    pub fn new(ctx: &'a CommandContext) -> Self {
        Self { ctx }
    }

    pub fn execute(&self, options: &ListOptions) -> Result<Vec<AgentListing>> {
        let scope = options.scope;
        let agents = if options.agents.is_empty() {
            self.ctx.registry().clients_for_scope(scope)
        } else {
            self.ctx.select_agents(&options.agents, scope)?
        };
        let entries = self.ctx.lock_store().list_entries();
        let working_dir = self.ctx.working_dir();

        let listings = agents
            .into_iter()
            .map(|agent| {
                let config_path = agent.config_path(scope, working_dir).ok();
                let (servers, error) = match agent.list_installed(scope, working_dir) {
                    Ok(installed) => {
                        let servers = installed
                            .into_iter()
                            .map(|item| ListedServer {
                                lock_entry: owning_entry(&entries, agent.id(), scope, &item.name),
                                name: item.name,
                                server: item.server,
                            })
                            .collect();
                        (servers, None)
                    }
                    Err(e) => {
                        tracing::warn!(agent = agent.id(), error = %e, "Cannot list servers");
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                AgentListing {
                    agent: agent.id().to_string(),
                    display_name: agent.display_name().to_string(),
                    scope,
                    config_path,
                    servers,
                    error,
                }
            })
            .collect();
        Ok(listings)
    }
}

fn owning_entry(entries: &[LockEntry], agent: &str, scope: Scope, name: &str) -> Option<String> {
    entries
        .iter()
        .find(|entry| {
            entry
                .target_for(agent, scope)
                .is_some_and(|t| t.installed_name == name)
        })
        .map(|entry| entry.server_id.clone())
}
