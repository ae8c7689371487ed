//! Error types for conduit-core.
//!
//! Every variant carries the path or identifier it concerns so the
//! command layer can report failures without extra context.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Scope;

pub type Result<T> = std::result::Result<T, ConduitError>;

#[derive(Debug, Error)]
pub enum ConduitError {
    /// Malformed or incomplete manifest/input.
    #[error("Invalid {subject}: {reason}")]
    Validation { subject: String, reason: String },

    /// The adapter was asked to operate in a scope it does not support.
    #[error("{agent} does not support the '{scope}' scope")]
    UnsupportedScope { agent: String, scope: Scope },

    /// An existing config file could not be parsed on read.
    #[error("Invalid config file {}: {reason}", path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    /// A file, registry entry or manifest does not exist.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {subject}: {reason}")]
    Serialize { subject: String, reason: String },

    /// Network failure while fetching a remote source.
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Git operation failed for {url}: {reason}")]
    Git { url: String, reason: String },
}

impl ConduitError {
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        ConduitError::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConduitError::InvalidConfig {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConduitError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        ConduitError::NotFound {
            resource: resource.into(),
        }
    }
}
