//! TOML serializer for client configuration files.
//!
//! Uses `toml_edit` so that tables, comments and key order outside the
//! managed table survive a write. Inside the managed table, entries whose
//! content is unchanged are left exactly as they were formatted.

use std::path::Path;

use serde_json::{Map, Value};
use toml_edit::{Array, DocumentMut, InlineTable, Item, Table};

use super::{ConfigFormat, ConfigSerializer};
use crate::error::{ConduitError, Result};

/// TOML configuration file serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TomlSerializer;

impl ConfigSerializer for TomlSerializer {
    fn extract_section(
        &self,
        path: &Path,
        content: &str,
        key_path: &[&str],
    ) -> Result<Map<String, Value>> {
        let doc: DocumentMut = content
            .parse()
            .map_err(|e| ConduitError::invalid_config(path, format!("failed to parse TOML: {}", e)))?;

        let mut current: &Table = doc.as_table();
        for (idx, segment) in key_path.iter().enumerate() {
            let Some(item) = current.get(segment) else {
                return Ok(Map::new());
            };
            let is_last = idx == key_path.len() - 1;
            match item_to_json(item) {
                Value::Object(map) if is_last => return Ok(map),
                _ if !is_last && item.is_table() => {
                    current = item.as_table().ok_or_else(|| {
                        ConduitError::invalid_config(path, format!("expected '{}' to be a table", segment))
                    })?;
                }
                _ => {
                    return Err(ConduitError::invalid_config(
                        path,
                        format!("expected '{}' to be a table", key_path[..=idx].join(".")),
                    ));
                }
            }
        }
        Ok(Map::new())
    }

    fn render_section(
        &self,
        existing: Option<&str>,
        key_path: &[&str],
        section: &Map<String, Value>,
    ) -> Result<String> {
        let mut doc = match existing.map(str::parse::<DocumentMut>) {
            Some(Ok(doc)) => doc,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Existing TOML config is invalid, starting from empty");
                DocumentMut::new()
            }
            None => DocumentMut::new(),
        };

        let Some((last, parents)) = key_path.split_last() else {
            return Ok(doc.to_string());
        };

        let mut table: &mut Table = doc.as_table_mut();
        for segment in parents {
            table = child_table(table, segment);
        }
        sync_table(child_table(table, last), section)?;

        Ok(doc.to_string())
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }
}

fn implicit_table() -> Table {
    let mut table = Table::new();
    table.set_implicit(true);
    table
}

/// Get the table stored under `key`, replacing anything that is not a table.
fn child_table<'a>(parent: &'a mut Table, key: &str) -> &'a mut Table {
    let item = parent
        .entry(key)
        .or_insert_with(|| Item::Table(implicit_table()));
    if !item.is_table() {
        tracing::warn!(%key, "Replacing non-table config value");
        *item = Item::Table(implicit_table());
    }
    match item {
        Item::Table(table) => table,
        _ => unreachable!("item was just replaced with a table"),
    }
}

/// Make `table` hold exactly the entries of `section`, touching only the
/// entries that differ.
fn sync_table(table: &mut Table, section: &Map<String, Value>) -> Result<()> {
    let stale: Vec<String> = table
        .iter()
        .map(|(key, _)| key.to_string())
        .filter(|key| !section.contains_key(key))
        .collect();
    for key in stale {
        table.remove(&key);
    }

    for (name, value) in section {
        let unchanged = table
            .get(name)
            .map(|item| item_to_json(item) == *value)
            .unwrap_or(false);
        if unchanged {
            continue;
        }
        let item = match value {
            Value::Object(fields) => Item::Table(json_object_to_table(fields)?),
            other => Item::Value(json_to_toml_value(other)?),
        };
        table.insert(name.as_str(), item);
    }
    Ok(())
}

fn json_object_to_table(fields: &Map<String, Value>) -> Result<Table> {
    let mut table = Table::new();
    for (key, value) in fields {
        if value.is_null() {
            continue;
        }
        table.insert(key.as_str(), Item::Value(json_to_toml_value(value)?));
    }
    Ok(table)
}

/// Convert a single JSON value to a TOML value. Objects become inline tables.
fn json_to_toml_value(json_value: &Value) -> Result<toml_edit::Value> {
    match json_value {
        // TOML has no null; callers drop null fields before converting
        Value::Null => Ok(toml_edit::Value::from("")),
        Value::Bool(b) => Ok(toml_edit::Value::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(toml_edit::Value::from(i))
            } else if let Some(f) = n.as_f64() {
                Ok(toml_edit::Value::from(f))
            } else {
                Err(ConduitError::Serialize {
                    subject: "TOML config".to_string(),
                    reason: format!("unsupported number {}", n),
                })
            }
        }
        Value::String(s) => Ok(toml_edit::Value::from(s.as_str())),
        Value::Array(arr) => {
            let mut array = Array::new();
            for value in arr {
                array.push(json_to_toml_value(value)?);
            }
            Ok(toml_edit::Value::Array(array))
        }
        Value::Object(obj) => {
            let mut inline = InlineTable::new();
            for (key, value) in obj {
                if value.is_null() {
                    continue;
                }
                inline.insert(key.as_str(), json_to_toml_value(value)?);
            }
            Ok(toml_edit::Value::InlineTable(inline))
        }
    }
}

/// Convert a TOML item to a JSON value.
fn item_to_json(item: &Item) -> Value {
    match item {
        Item::None => Value::Null,
        Item::Value(value) => toml_value_to_json(value),
        Item::Table(table) => {
            let mut map = Map::new();
            for (key, value) in table.iter() {
                map.insert(key.to_string(), item_to_json(value));
            }
            Value::Object(map)
        }
        Item::ArrayOfTables(tables) => Value::Array(
            tables
                .iter()
                .map(|table| item_to_json(&Item::Table(table.clone())))
                .collect(),
        ),
    }
}

fn toml_value_to_json(value: &toml_edit::Value) -> Value {
    match value {
        toml_edit::Value::String(s) => Value::String(s.value().clone()),
        toml_edit::Value::Integer(i) => Value::Number((*i.value()).into()),
        toml_edit::Value::Float(f) => {
            // serde_json::Number doesn't support NaN/Infinity, fall back to string
            serde_json::Number::from_f64(*f.value())
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(f.value().to_string()))
        }
        toml_edit::Value::Boolean(b) => Value::Bool(*b.value()),
        toml_edit::Value::Datetime(dt) => Value::String(dt.value().to_string()),
        toml_edit::Value::Array(arr) => Value::Array(arr.iter().map(toml_value_to_json).collect()),
        toml_edit::Value::InlineTable(table) => {
            let mut map = Map::new();
            for (key, value) in table.iter() {
                map.insert(key.to_string(), toml_value_to_json(value));
            }
            Value::Object(map)
        }
    }
}
