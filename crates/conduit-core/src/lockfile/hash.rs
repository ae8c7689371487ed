//! Metadata fingerprint of a server definition.

use sha2::{Digest, Sha256};

use crate::error::{ConduitError, Result};
use crate::mcp::NormalizedServer;

/// Length of the hex fingerprint kept in lock entries.
pub const HASH_LEN: usize = 16;

/// SHA-256 over `{id, transport, secrets}` (secret names only, sorted and
/// deduplicated), truncated to [`HASH_LEN`] hex characters.
///
/// Display name, description and secret descriptions do not contribute.
pub fn generate_metadata_hash(server: &NormalizedServer) -> Result<String> {
    let mut secret_names: Vec<&str> = server.secrets.iter().map(|s| s.name.as_str()).collect();
    secret_names.sort_unstable();
    secret_names.dedup();

    let canonical = serde_json::json!({
        "id": server.id,
        "transport": server.transport,
        "secrets": secret_names,
    });
    let bytes = serde_json::to_vec(&canonical).map_err(|e| ConduitError::Serialize {
        subject: format!("metadata of '{}'", server.id),
        reason: e.to_string(),
    })?;

    let digest = Sha256::digest(&bytes);
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    Ok(hash)
}
