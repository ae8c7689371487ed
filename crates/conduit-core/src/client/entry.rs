//! Helpers for reading and building agent config entries.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{ConduitError, Result};

/// Borrowed view of one server entry, with errors naming the agent and
/// entry.
pub(crate) struct EntryReader<'a> {
    agent: &'static str,
    name: &'a str,
    fields: &'a Map<String, Value>,
}

impl<'a> EntryReader<'a> {
    pub(crate) fn new(agent: &'static str, name: &'a str, entry: &'a Value) -> Result<Self> {
        let fields = entry.as_object().ok_or_else(|| {
            ConduitError::validation(
                format!("{} entry '{}'", agent, name),
                "expected an object",
            )
        })?;
        Ok(Self { agent, name, fields })
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> ConduitError {
        ConduitError::validation(format!("{} entry '{}'", self.agent, self.name), reason)
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub(crate) fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key)
    }

    pub(crate) fn opt_str(&self, key: &str) -> Result<Option<String>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.error(format!("'{}' must be a string", key))),
        }
    }

    /// Non-empty string field.
    pub(crate) fn required_str(&self, key: &str) -> Result<String> {
        match self.opt_str(key)? {
            Some(s) if !s.is_empty() => Ok(s),
            _ => Err(self.error(format!("missing '{}'", key))),
        }
    }

    pub(crate) fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.error(format!("'{}' must contain only strings", key)))
                })
                .collect(),
            Some(_) => Err(self.error(format!("'{}' must be an array", key))),
        }
    }

    /// String-to-string table. Numbers and booleans are accepted and
    /// rendered as text.
    pub(crate) fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(k, v)| match v {
                    Value::String(s) => Ok((k.clone(), s.clone())),
                    Value::Number(n) => Ok((k.clone(), n.to_string())),
                    Value::Bool(b) => Ok((k.clone(), b.to_string())),
                    _ => Err(self.error(format!("'{}.{}' must be a string", key, k))),
                })
                .collect(),
            Some(_) => Err(self.error(format!("'{}' must be a table", key))),
        }
    }
}

/// Insert `map` under `key` unless it is empty.
pub(crate) fn insert_map(fields: &mut Map<String, Value>, key: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        return;
    }
    let object = map
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    fields.insert(key.to_string(), Value::Object(object));
}

pub(crate) fn string_array(items: impl IntoIterator<Item = String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reader_rejects_non_object() {
        let value = json!("nope");
        let err = EntryReader::new("codex", "x", &value).err().expect("must fail");
        assert!(err.to_string().contains("codex entry 'x'"));
    }

    #[test]
    fn string_map_accepts_scalars() {
        let value = json!({"env": {"A": "1", "B": 2, "C": true}});
        let reader = EntryReader::new("codex", "x", &value).unwrap();
        let env = reader.string_map("env").unwrap();
        assert_eq!(env["B"], "2");
        assert_eq!(env["C"], "true");
    }

    #[test]
    fn string_list_rejects_mixed_items() {
        let value = json!({"args": ["a", 1]});
        let reader = EntryReader::new("claude-code", "x", &value).unwrap();
        assert!(reader.string_list("args").is_err());
    }

    #[test]
    fn required_str_rejects_empty() {
        let value = json!({"command": ""});
        let reader = EntryReader::new("claude-code", "x", &value).unwrap();
        assert!(reader.required_str("command").is_err());
    }

    #[test]
    fn insert_map_skips_empty() {
        let mut fields = Map::new();
        insert_map(&mut fields, "env", &BTreeMap::new());
        assert!(fields.is_empty());
    }
}
