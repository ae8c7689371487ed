//! Client registry for managing available agent adapters.
//!
//! The registry is the dispatch point the command layer uses to pick which
//! adapters to run; it knows nothing about their schemas.

use crate::types::Scope;

use super::{
    AgentAdapter, ClientContext, claude_code::ClaudeCodeClient,
    claude_desktop::ClaudeDesktopClient, codex::CodexClient, opencode::OpenCodeClient,
};

/// Registry of available agent adapters, in a fixed order.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Box<dyn AgentAdapter>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Create a registry with all built-in adapters.
    pub fn with_default_clients(ctx: ClientContext) -> Self {
        let clients: Vec<Box<dyn AgentAdapter>> = vec![
            Box::new(ClaudeCodeClient::new(ctx.clone())),
            Box::new(ClaudeDesktopClient::new(ctx.clone())),
            Box::new(CodexClient::new(ctx.clone())),
            Box::new(OpenCodeClient::new(ctx)),
        ];
        Self { clients }
    }

    /// Register an adapter.
    pub fn register(&mut self, client: Box<dyn AgentAdapter>) {
        self.clients.push(client);
    }

    pub fn all(&self) -> Vec<&dyn AgentAdapter> {
        self.clients.iter().map(|c| c.as_ref()).collect()
    }

    /// Get an adapter by id.
    pub fn get(&self, id: &str) -> Option<&dyn AgentAdapter> {
        self.clients
            .iter()
            .find(|c| c.id() == id)
            .map(|c| c.as_ref())
    }

    /// Adapters that support `scope`.
    pub fn clients_for_scope(&self, scope: Scope) -> Vec<&dyn AgentAdapter> {
        self.clients
            .iter()
            .filter(|c| c.supports_scope(scope))
            .map(|c| c.as_ref())
            .collect()
    }

    /// Adapters named in `targets`, in registry order. Unknown ids are
    /// ignored; see [`ClientRegistry::unknown_targets`].
    pub fn filter_by_targets<'a>(&'a self, targets: &[String]) -> Vec<&'a dyn AgentAdapter> {
        self.clients
            .iter()
            .filter(|c| targets.iter().any(|t| t == c.id()))
            .map(|c| c.as_ref())
            .collect()
    }

    /// Entries of `targets` that name no registered adapter.
    pub fn unknown_targets<'a>(&self, targets: &'a [String]) -> Vec<&'a str> {
        targets
            .iter()
            .filter(|t| self.get(t).is_none())
            .map(String::as_str)
            .collect()
    }

    /// Probe every adapter concurrently and return those that report
    /// presence, in registry order.
    pub fn detect_installed(&self) -> Vec<&dyn AgentAdapter> {
        let found: Vec<bool> = std::thread::scope(|s| {
            let probes: Vec<_> = self
                .clients
                .iter()
                .map(|c| s.spawn(move || c.detect_installed()))
                .collect();
            probes
                .into_iter()
                .map(|probe| probe.join().unwrap_or(false))
                .collect()
        });

        self.clients
            .iter()
            .zip(found)
            .filter(|(_, present)| *present)
            .map(|(c, _)| {
                tracing::debug!(agent = c.id(), "Detected agent");
                c.as_ref()
            })
            .collect()
    }

    /// List all adapter ids.
    pub fn client_ids(&self) -> Vec<&'static str> {
        self.clients.iter().map(|c| c.id()).collect()
    }
}
