//! Shared core types used across the adapter and lockfile layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a client configuration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// A single project, rooted at the working directory.
    Project,
    /// The whole user account.
    User,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Project => "project",
            Scope::User => "user",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = crate::error::ConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "project" | "local" => Ok(Scope::Project),
            "user" | "global" => Ok(Scope::User),
            other => Err(crate::error::ConduitError::Validation {
                subject: "scope".to_string(),
                reason: format!("unknown scope '{}': use 'project' or 'user'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_aliases() {
        assert_eq!("project".parse::<Scope>().unwrap(), Scope::Project);
        assert_eq!("USER".parse::<Scope>().unwrap(), Scope::User);
        assert_eq!("global".parse::<Scope>().unwrap(), Scope::User);
        assert!("workspace".parse::<Scope>().is_err());
    }

    #[test]
    fn scope_serializes_lowercase() {
        let json = serde_json::to_string(&Scope::Project).unwrap();
        assert_eq!(json, "\"project\"");
    }
}
