//! Shared services for command execution.

use std::path::{Path, PathBuf};

use crate::client::{AgentAdapter, ClientRegistry};
use crate::error::{ConduitError, Result};
use crate::lockfile::LockStore;
use crate::types::Scope;

/// Agent registry, lock store and working directory used by every command.
///
/// Frontends build this once and hand it to each command.
#[derive(Debug)]
pub struct CommandContext {
    registry: ClientRegistry,
    lock_store: LockStore,
    working_dir: PathBuf,
}

impl CommandContext {
    pub fn new(registry: ClientRegistry, lock_store: LockStore, working_dir: PathBuf) -> Self {
        Self {
            registry,
            lock_store,
            working_dir,
        }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn lock_store(&self) -> &LockStore {
        &self.lock_store
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolve `--agent` values to adapters.
    ///
    /// Explicit ids are returned as given, even for scopes the agent lacks,
    /// so the scope error is reported per agent. With no ids, every
    /// detected agent that supports `scope` is used.
    pub fn select_agents(&self, ids: &[String], scope: Scope) -> Result<Vec<&dyn AgentAdapter>> {
        if ids.is_empty() {
            let agents: Vec<_> = self
                .registry
                .detect_installed()
                .into_iter()
                .filter(|agent| {
                    let supported = agent.supports_scope(scope);
                    if !supported {
                        tracing::debug!(agent = agent.id(), %scope, "Detected agent lacks scope, skipping");
                    }
                    supported
                })
                .collect();
            if agents.is_empty() {
                return Err(ConduitError::not_found(format!(
                    "installed agent supporting the '{}' scope",
                    scope
                )));
            }
            return Ok(agents);
        }

        let unknown = self.registry.unknown_targets(ids);
        if !unknown.is_empty() {
            return Err(ConduitError::validation(
                "agent",
                format!(
                    "unknown agent(s) {}; known agents are {}",
                    unknown.join(", "),
                    self.registry.client_ids().join(", ")
                ),
            ));
        }
        Ok(self.registry.filter_by_targets(ids))
    }
}
