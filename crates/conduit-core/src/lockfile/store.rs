//! Lock file persistence.
//!
//! Every operation is a full read, patch and full write of the file; nothing
//! is cached between calls. The lock file is advisory state that can be
//! rebuilt by reinstalling, so an unreadable or version-mismatched file is
//! treated as empty. There is no cross-process locking: concurrent writers
//! race and the last one wins.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::hash::generate_metadata_hash;
use super::types::{LOCK_VERSION, LockEntry, LockFile, LockSource, LockTarget};
use crate::config::paths;
use crate::error::{ConduitError, Result};
use crate::mcp::NormalizedServer;

/// File-backed lock store.
#[derive(Debug, Clone)]
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<state_dir>/conduit/lock.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(paths::lock_path(&paths::state_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole lock file. Missing, unreadable and unsupported files
    /// all yield an empty lock file.
    pub fn load(&self) -> LockFile {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return LockFile::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Lock file unreadable, treating as empty");
                return LockFile::new();
            }
        };
        match serde_json::from_slice::<LockFile>(&bytes) {
            Ok(lock) if lock.version == LOCK_VERSION => lock,
            Ok(lock) => {
                tracing::warn!(
                    path = %self.path.display(),
                    version = lock.version,
                    "Unsupported lock file version, treating as empty"
                );
                LockFile::new()
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Lock file is corrupt, treating as empty");
                LockFile::new()
            }
        }
    }

    /// Write the whole lock file through a temp file in the same directory.
    pub fn save(&self, lock: &LockFile) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| ConduitError::io(&dir, e))?;

        let mut bytes = serde_json::to_vec_pretty(lock).map_err(|e| ConduitError::Serialize {
            subject: "lock file".to_string(),
            reason: e.to_string(),
        })?;
        bytes.push(b'\n');

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lock.json".to_string());
        let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, std::process::id()));
        fs::write(&tmp_path, bytes).map_err(|e| ConduitError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| ConduitError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), servers = lock.servers.len(), "Wrote lock file");
        Ok(())
    }

    /// Insert or replace the entry for `server_id`.
    ///
    /// `installedAt` is kept from an existing entry; `source`, `version`,
    /// the hash and `targets` are replaced wholesale. Callers pass the full
    /// target list they want recorded.
    pub fn add_entry(
        &self,
        server_id: &str,
        source: LockSource,
        server: &NormalizedServer,
        version: Option<String>,
        targets: Vec<LockTarget>,
    ) -> Result<LockEntry> {
        let metadata_hash = generate_metadata_hash(server)?;
        let mut lock = self.load();
        let now = Utc::now();
        let installed_at = lock
            .servers
            .get(server_id)
            .map(|existing| existing.installed_at)
            .unwrap_or(now);

        let entry = LockEntry {
            server_id: server_id.to_string(),
            source,
            version,
            metadata_hash,
            targets,
            installed_at,
            updated_at: now,
        };
        lock.servers.insert(server_id.to_string(), entry.clone());
        self.save(&lock)?;
        Ok(entry)
    }

    /// Remove the entry for `server_id`, returning it if it existed. The file
    /// is not rewritten when there was nothing to remove.
    pub fn remove_entry(&self, server_id: &str) -> Result<Option<LockEntry>> {
        let mut lock = self.load();
        let removed = lock.servers.remove(server_id);
        if removed.is_some() {
            self.save(&lock)?;
        }
        Ok(removed)
    }

    pub fn get_entry(&self, server_id: &str) -> Option<LockEntry> {
        self.load().servers.remove(server_id)
    }

    /// All entries, ordered by server id.
    pub fn list_entries(&self) -> Vec<LockEntry> {
        self.load().servers.into_values().collect()
    }

    /// Replace the targets of an existing entry and refresh `updatedAt`.
    /// Returns `None` (and writes nothing) if there is no such entry.
    pub fn update_entry_targets(
        &self,
        server_id: &str,
        targets: Vec<LockTarget>,
    ) -> Result<Option<LockEntry>> {
        let mut lock = self.load();
        let Some(entry) = lock.servers.get_mut(server_id) else {
            return Ok(None);
        };
        entry.targets = targets;
        entry.updated_at = Utc::now();
        let updated = entry.clone();
        self.save(&lock)?;
        Ok(Some(updated))
    }

    /// Whether `server` differs from what was recorded for `server_id`.
    /// A missing entry counts as stale.
    pub fn is_stale(&self, server_id: &str, server: &NormalizedServer) -> Result<bool> {
        match self.get_entry(server_id) {
            Some(entry) => Ok(entry.metadata_hash != generate_metadata_hash(server)?),
            None => Ok(true),
        }
    }
}
