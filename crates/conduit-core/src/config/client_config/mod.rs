//! Client configuration file management.
//!
//! This module handles reading and writing third-party client configuration files
//! (e.g., `~/.codex/config.toml`, `claude_desktop_config.json`, `opencode.jsonc`).
//! Each serializer only interprets the one subtree an adapter owns; everything
//! else in the document is carried through a write untouched.
//!
//! Reads are strict: an unparseable file is an [`ConduitError::InvalidConfig`].
//! Writes are tolerant: an unparseable file is treated as empty and replaced.

mod json;
mod jsonc;
mod toml;

use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ConduitError, Result};

pub use json::JsonSerializer;
pub use jsonc::{JsoncSerializer, strip_jsonc};
pub use toml::TomlSerializer;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Jsonc,
    Toml,
}

/// Trait for extracting and replacing one subtree of a configuration document.
///
/// All implementations use `serde_json::Map<String, Value>` as the
/// intermediate representation of the subtree.
pub trait ConfigSerializer: Send + Sync {
    /// Extract the map at `key_path` from `content`.
    ///
    /// Returns an empty map when the path does not exist.
    fn extract_section(
        &self,
        path: &Path,
        content: &str,
        key_path: &[&str],
    ) -> Result<Map<String, Value>>;

    /// Render a document equal to `existing` with the map at `key_path`
    /// replaced by `section`.
    ///
    /// `existing` is `None` when the file does not exist. Unparseable content
    /// is treated as an empty document.
    fn render_section(
        &self,
        existing: Option<&str>,
        key_path: &[&str],
        section: &Map<String, Value>,
    ) -> Result<String>;

    /// Get the format this serializer handles.
    fn format(&self) -> ConfigFormat;
}

/// Contents of one config file, as seen by an adapter.
#[derive(Debug, Clone, Default)]
pub struct ConfigSection {
    /// Entries found at the adapter's key path.
    pub entries: Map<String, Value>,
    /// Full file text; empty when the file does not exist.
    pub raw: String,
}

/// Read the map at `key_path` from a config file.
///
/// A missing file yields an empty section.
pub fn read_section(
    config_path: &Path,
    key_path: &[&str],
    serializer: &dyn ConfigSerializer,
) -> Result<ConfigSection> {
    if key_path.is_empty() {
        return Err(ConduitError::validation(
            "config key path",
            "path for reading entries cannot be empty",
        ));
    }
    let raw = match std::fs::read_to_string(config_path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ConfigSection::default()),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(ConduitError::invalid_config(config_path, "file is not valid UTF-8"));
        }
        Err(e) => return Err(ConduitError::io(config_path, e)),
    };
    let entries = serializer.extract_section(config_path, &raw, key_path)?;
    Ok(ConfigSection { entries, raw })
}

/// Replace the map at `key_path` in a config file, preserving the rest of it.
///
/// Creates parent directories if they don't exist.
pub fn write_section(
    config_path: &Path,
    key_path: &[&str],
    section: &Map<String, Value>,
    serializer: &dyn ConfigSerializer,
) -> Result<()> {
    if key_path.is_empty() {
        return Err(ConduitError::validation(
            "config key path",
            "path for managed entries cannot be empty",
        ));
    }
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConduitError::io(parent, e))?;
    }

    let existing = match std::fs::read_to_string(config_path) {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(
                path = %config_path.display(),
                error = %e,
                "Existing config is unreadable, replacing it"
            );
            None
        }
    };

    let rendered = serializer.render_section(existing.as_deref(), key_path, section)?;
    std::fs::write(config_path, rendered).map_err(|e| ConduitError::io(config_path, e))?;
    tracing::debug!(
        path = %config_path.display(),
        key = %key_path.join("."),
        format = ?serializer.format(),
        "Wrote config section"
    );
    Ok(())
}

/// Extract a nested map from a root map at the given path.
fn extract_map_at_path(
    config_path: &Path,
    root: &Map<String, Value>,
    path: &[&str],
) -> Result<Map<String, Value>> {
    let mut current = root;
    for (idx, segment) in path.iter().enumerate() {
        let value = match current.get(*segment) {
            Some(value) => value,
            None => return Ok(Map::new()),
        };
        match value {
            Value::Object(map) if idx == path.len() - 1 => return Ok(map.clone()),
            Value::Object(map) => current = map,
            _ => {
                return Err(ConduitError::invalid_config(
                    config_path,
                    format!("expected '{}' to be an object", path[..=idx].join(".")),
                ));
            }
        }
    }
    Ok(Map::new())
}

/// Set a map at a nested path within a root map.
///
/// Intermediate values that are not objects are replaced.
fn set_map_at_path(root: &mut Map<String, Value>, path: &[&str], map: Map<String, Value>) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !next.is_object() {
            tracing::warn!(key = %segment, "Replacing non-object config value");
            *next = Value::Object(Map::new());
        }
        current = match next {
            Value::Object(m) => m,
            _ => return,
        };
    }
    current.insert(last.to_string(), Value::Object(map));
}

/// Nest `value` under the given keys: `["a", "b"]` → `{"a": {"b": value}}`.
fn wrap_in_path(path: &[&str], value: Value) -> Value {
    path.iter().rev().fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}
