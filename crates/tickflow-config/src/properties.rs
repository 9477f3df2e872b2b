//! Application properties.
//!
//! A flat string map whose keys may be hierarchical, `group/subgroup/name`.
//! Persisted as nested TOML tables, one level per key segment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tickflow_parameter::text_to_bool;
use toml::{Table, Value};

/// String key to string value bag owned by the hosting application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Table", into = "Table")]
pub struct ApplicationProperties {
    values: BTreeMap<String, String>,
}

impl ApplicationProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stored text, or an empty string.
    pub fn string(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Boolean using the same text rule as parameters. Missing keys are false.
    pub fn bool(&self, key: &str) -> bool {
        self.get(key).is_some_and(text_to_bool)
    }

    pub fn int(&self, key: &str) -> i64 {
        self.parse_or_zero(key)
    }

    pub fn uint(&self, key: &str) -> u64 {
        self.parse_or_zero(key)
    }

    pub fn float(&self, key: &str) -> f64 {
        self.parse_or_zero(key)
    }

    fn parse_or_zero<T: std::str::FromStr + Default>(&self, key: &str) -> T {
        self.get(key)
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or_default()
    }

    fn flatten(prefix: &str, table: Table, out: &mut BTreeMap<String, String>) {
        for (name, value) in table {
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            match value {
                Value::Table(inner) => Self::flatten(&key, inner, out),
                Value::String(text) => {
                    out.insert(key, text);
                }
                other => {
                    out.insert(key, other.to_string());
                }
            }
        }
    }
}

impl From<Table> for ApplicationProperties {
    fn from(table: Table) -> Self {
        let mut values = BTreeMap::new();
        Self::flatten("", table, &mut values);
        Self { values }
    }
}

impl From<ApplicationProperties> for Table {
    fn from(properties: ApplicationProperties) -> Self {
        let mut root = Table::new();
        for (key, value) in properties.values {
            let mut segments: Vec<&str> = key.split('/').filter(|s| !s.is_empty()).collect();
            let Some(leaf) = segments.pop() else {
                continue;
            };

            if !insert_nested(&mut root, &segments, leaf, value) {
                tracing::warn!(key = %key, "property key collides with a property group, not saved");
            }
        }
        root
    }
}

/// Insert `value` at `segments/leaf`, creating intermediate tables. Fails when
/// a segment is already a plain value or the leaf is already a table.
fn insert_nested(root: &mut Table, segments: &[&str], leaf: &str, value: String) -> bool {
    let mut table = root;
    for segment in segments {
        let entry = table
            .entry(segment.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(inner) = entry else {
            return false;
        };
        table = inner;
    }
    if table.get(leaf).is_some_and(Value::is_table) {
        return false;
    }
    table.insert(leaf.to_string(), Value::String(value));
    true
}
