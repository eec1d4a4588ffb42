use std::collections::BTreeSet;

use toml::{Table, Value};

use super::ConfigError;

/// A value to be merged at a key path; an empty path means the root table.
#[derive(Debug, Clone)]
pub struct ConfigEntry {
    pub path: Vec<String>,
    pub value: Value,
}

impl ConfigEntry {
    pub fn root(table: Table) -> Self {
        Self {
            path: Vec::new(),
            value: Value::Table(table),
        }
    }

    pub fn at_path(path: Vec<String>, value: Value) -> Self {
        Self { path, value }
    }

    /// Entry for a dotted key such as `server.port`.
    pub fn at_key(key: &str, value: Value) -> Self {
        Self::at_path(split_key(key), value)
    }
}

/// One layer of the resolution pipeline.
///
/// `below` is the merged result of every lower-precedence layer, which lets a
/// layer adapt to what it overrides.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    fn entries(&self, below: &Table) -> Result<Vec<ConfigEntry>, ConfigError>;
}

/// Merges every entry of `source` over `table`.
pub fn apply_source(table: &mut Table, source: &dyn ConfigSource) -> Result<(), ConfigError> {
    for entry in source.entries(table)? {
        merge_at_path(table, &entry.path, entry.value);
    }
    Ok(())
}

pub fn split_key(key: &str) -> Vec<String> {
    key.split('.').map(str::to_string).collect()
}

/// Dotted keys of every non-table value in `table`.
pub fn leaf_keys(table: &Table) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    collect_leaf_keys(table, "", &mut keys);
    keys
}

fn collect_leaf_keys(table: &Table, prefix: &str, keys: &mut BTreeSet<String>) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };

        match value {
            Value::Table(nested) => collect_leaf_keys(nested, &key, keys),
            _ => {
                keys.insert(key);
            }
        }
    }
}

pub fn merge_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        if let Value::Table(overlay) = value {
            deep_merge(table, overlay);
        }
        return;
    };

    if rest.is_empty() {
        match (table.get_mut(first), value) {
            (Some(Value::Table(base)), Value::Table(overlay)) => deep_merge(base, overlay),
            (_, value) => {
                table.insert(first.clone(), value);
            }
        }
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }

    if let Some(Value::Table(nested)) = table.get_mut(first) {
        merge_at_path(nested, rest, value);
    }
}

/// Recursively merges tables; any other value in `overlay` replaces the base.
pub fn deep_merge(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(base_table)), Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
