//! MCP server model and manifest parsing

pub mod manifest;
pub mod spec;

pub use manifest::{ServerManifest, parse_manifest};
pub use spec::{NormalizedServer, SecretSpec, Transport, TransportKind};
