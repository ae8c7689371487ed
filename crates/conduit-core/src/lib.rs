//! Conduit Core Library
//!
//! Installs MCP server definitions into the config files of AI coding
//! agents. Servers are described once in a canonical model, resolved from
//! local, registry or git sources, and written through per-agent adapters
//! that preserve everything else in each config file. Installs are
//! tracked in a lock file.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod lockfile;
pub mod mcp;
pub mod source;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Errors
    pub use crate::error::{ConduitError, Result};
    pub use crate::types::Scope;

    // MCP
    pub use crate::mcp::{NormalizedServer, SecretSpec, ServerManifest, Transport, TransportKind};

    // Client
    pub use crate::client::{AddOptions, AddOutcome, AgentAdapter, ClientContext, ClientRegistry};

    // Configuration
    pub use crate::config::{ConduitSettings, ConfigFormat, ConfigSerializer};

    // Lock file
    pub use crate::lockfile::{LockEntry, LockFile, LockSource, LockStore, LockTarget, SourceKind};

    // Sources
    pub use crate::source::{ResolvedSource, SourceResolver, SourceSpec};

    // Commands
    pub use crate::commands::{
        AgentOutcome, AgentStatus, CommandContext, InstallCommand, InstallOptions, ListCommand,
        ListOptions, LockChange, UninstallCommand, UninstallOptions,
    };
}
