//! Canonical MCP server representation shared by every source and adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConduitError;

/// Command used for entries that could not be read back from a client config.
pub const UNKNOWN_COMMAND: &str = "unknown";

/// Transport discriminant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Stdio,
    Http,
    Sse,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Stdio => "stdio",
            TransportKind::Http => "http",
            TransportKind::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportKind::Stdio),
            "http" => Ok(TransportKind::Http),
            "sse" => Ok(TransportKind::Sse),
            other => Err(ConduitError::validation(
                "transport",
                format!("'{}' is not one of stdio, http, sse", other),
            )),
        }
    }
}

/// How a client connects to an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Transport {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Sse {
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Stdio { .. } => TransportKind::Stdio,
            Transport::Http { .. } => TransportKind::Http,
            Transport::Sse { .. } => TransportKind::Sse,
        }
    }

    /// URL of a remote transport.
    pub fn url(&self) -> Option<&str> {
        match self {
            Transport::Http { url, .. } | Transport::Sse { url, .. } => Some(url),
            Transport::Stdio { .. } => None,
        }
    }

    /// Headers of a remote transport.
    pub fn headers(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Transport::Http { headers, .. } | Transport::Sse { headers, .. } => Some(headers),
            Transport::Stdio { .. } => None,
        }
    }
}

/// A value the user must supply (env var or header). Only the name is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
}

impl SecretSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
        }
    }
}

/// Canonical server definition. Values are never mutated in place; the
/// `with_*` builders consume and return a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedServer {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub transport: Transport,
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,
}

impl NormalizedServer {
    pub fn new(id: impl Into<String>, transport: Transport) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            description: None,
            transport,
            secrets: Vec::new(),
        }
    }

    pub fn stdio(id: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(
            id,
            Transport::Stdio {
                command: command.into(),
                args,
                env: BTreeMap::new(),
                cwd: None,
            },
        )
    }

    pub fn http(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            id,
            Transport::Http {
                url: url.into(),
                headers: BTreeMap::new(),
            },
        )
    }

    pub fn sse(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            id,
            Transport::Sse {
                url: url.into(),
                headers: BTreeMap::new(),
            },
        )
    }

    /// Stand-in for a client entry that could not be interpreted.
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::stdio(name, UNKNOWN_COMMAND, Vec::new())
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_secrets(mut self, secrets: Vec<SecretSpec>) -> Self {
        self.secrets = secrets;
        self
    }

    /// Set environment variables. No effect on remote transports.
    pub fn with_env(mut self, vars: BTreeMap<String, String>) -> Self {
        if let Transport::Stdio { env, .. } = &mut self.transport {
            *env = vars;
        }
        self
    }

    /// Set the working directory. No effect on remote transports.
    pub fn with_cwd(mut self, dir: impl Into<String>) -> Self {
        if let Transport::Stdio { cwd, .. } = &mut self.transport {
            *cwd = Some(dir.into());
        }
        self
    }

    /// Set request headers. No effect on stdio transports.
    pub fn with_headers(mut self, values: BTreeMap<String, String>) -> Self {
        match &mut self.transport {
            Transport::Http { headers, .. } | Transport::Sse { headers, .. } => *headers = values,
            Transport::Stdio { .. } => {}
        }
        self
    }

    /// Name the server is registered under inside client configs: the last
    /// `/`-separated segment of the id.
    pub fn installed_name(&self) -> &str {
        installed_name_for(&self.id)
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(&self.transport, Transport::Stdio { command, .. } if command == UNKNOWN_COMMAND)
    }
}

/// Last `/`-separated segment of a server id, or the id itself.
pub fn installed_name_for(id: &str) -> &str {
    match id.rfind('/') {
        Some(idx) => &id[idx + 1..],
        None => id,
    }
}
