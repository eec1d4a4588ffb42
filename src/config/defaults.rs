use toml::{Table, Value};

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

/// Programmatic fallback values, keyed by dotted configuration key.
///
/// Defaults form the lowest-precedence layer. Setting the same key twice
/// keeps the later value.
///
/// ```
/// use stratum::Defaults;
///
/// let defaults = Defaults::new()
///     .set("server.listen", "0.0.0.0:8080")
///     .set("server.workers", 4)
///     .set("log.json", false);
/// assert_eq!(defaults.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: Vec<(String, Value)>,
}

impl Defaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.push((key.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Defaults
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut defaults = Self::new();
        for (key, value) in iter {
            defaults.insert(key, value);
        }
        defaults
    }
}

impl ConfigSource for Defaults {
    fn entries(&self, _below: &Table) -> Result<Vec<ConfigEntry>, ConfigError> {
        Ok(self
            .values
            .iter()
            .map(|(key, value)| ConfigEntry::at_key(key, value.clone()))
            .collect())
    }
}
