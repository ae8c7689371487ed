//! JSON serializer for client configuration files.

use std::path::Path;

use serde_json::{Map, Value};

use super::{ConfigFormat, ConfigSerializer, extract_map_at_path, set_map_at_path};
use crate::error::{ConduitError, Result};

/// JSON configuration file serializer.
///
/// Key order is kept as found in the file (`serde_json` `preserve_order`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl ConfigSerializer for JsonSerializer {
    fn extract_section(
        &self,
        path: &Path,
        content: &str,
        key_path: &[&str],
    ) -> Result<Map<String, Value>> {
        let root = parse_root(content).map_err(|reason| ConduitError::invalid_config(path, reason))?;
        extract_map_at_path(path, &root, key_path)
    }

    fn render_section(
        &self,
        existing: Option<&str>,
        key_path: &[&str],
        section: &Map<String, Value>,
    ) -> Result<String> {
        let mut root = match existing.map(parse_root) {
            Some(Ok(root)) => root,
            Some(Err(reason)) => {
                tracing::warn!(%reason, "Existing JSON config is invalid, starting from empty");
                Map::new()
            }
            None => Map::new(),
        };
        set_map_at_path(&mut root, key_path, section.clone());
        to_pretty(&root)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }
}

fn parse_root(content: &str) -> std::result::Result<Map<String, Value>, String> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("expected JSON object at root".to_string()),
        Err(e) => Err(format!("failed to parse JSON: {}", e)),
    }
}

pub(super) fn to_pretty(root: &Map<String, Value>) -> Result<String> {
    let mut rendered = serde_json::to_string_pretty(root).map_err(|e| ConduitError::Serialize {
        subject: "JSON config".to_string(),
        reason: e.to_string(),
    })?;
    rendered.push('\n');
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn extract_returns_section_entries() {
        let content = r#"{"mcpServers": {"test": {"command": "echo"}}}"#;
        let section = JsonSerializer
            .extract_section(Path::new("c.json"), content, &["mcpServers"])
            .expect("extract");
        assert!(section.contains_key("test"));
    }

    #[test]
    fn extract_missing_section_is_empty() {
        let section = JsonSerializer
            .extract_section(Path::new("c.json"), r#"{"other": 1}"#, &["mcpServers"])
            .expect("extract");
        assert!(section.is_empty());
    }

    #[test]
    fn extract_invalid_json_names_path() {
        let err = JsonSerializer
            .extract_section(Path::new("/home/u/.mcp.json"), "{broken", &["mcpServers"])
            .expect_err("invalid JSON must fail");
        assert!(err.to_string().contains("/home/u/.mcp.json"));
    }

    #[test]
    fn extract_rejects_non_object_root() {
        let result = JsonSerializer.extract_section(Path::new("c.json"), "[1, 2]", &["mcpServers"]);
        assert!(matches!(result, Err(ConduitError::InvalidConfig { .. })));
    }

    #[test]
    fn render_preserves_other_keys_and_order() {
        let existing = r#"{"zeta": 1, "mcpServers": {"old": {}}, "alpha": {"nested": true}}"#;
        let section = object(json!({"new": {"command": "node"}}));

        let rendered = JsonSerializer
            .render_section(Some(existing), &["mcpServers"], &section)
            .expect("render");
        let value: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(
            value,
            json!({"zeta": 1, "mcpServers": {"new": {"command": "node"}}, "alpha": {"nested": true}})
        );
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "mcpServers", "alpha"]);
    }

    #[test]
    fn render_replaces_corrupt_document() {
        let section = object(json!({"echo": {"command": "node"}}));
        let rendered = JsonSerializer
            .render_section(Some("{{{ nope"), &["mcpServers"], &section)
            .expect("corrupt input is tolerated");
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value, json!({"mcpServers": {"echo": {"command": "node"}}}));
    }

    #[test]
    fn render_empty_file_is_fresh_document() {
        let rendered = JsonSerializer
            .render_section(Some(""), &["mcpServers"], &Map::new())
            .expect("render");
        assert_eq!(rendered, "{\n  \"mcpServers\": {}\n}\n");
    }
}
