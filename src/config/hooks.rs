//! Decode hooks: value transformations applied before typed decoding.
//!
//! Hooks run on every leaf value (anything that is not a table) of the
//! merged configuration, in registration order, each receiving the output of
//! the previous one. They can convert raw values into shapes the target
//! type's `Deserialize` impl accepts.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use toml::{Table, Value};
use tracing::trace;

use super::ConfigError;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub trait DecodeHook: Send + Sync {
    /// Transforms the value found at the dotted `key`.
    fn decode(&self, key: &str, value: Value) -> Result<Value, HookError>;
}

impl<F> DecodeHook for F
where
    F: Fn(&str, Value) -> Result<Value, HookError> + Send + Sync,
{
    fn decode(&self, key: &str, value: Value) -> Result<Value, HookError> {
        self(key, value)
    }
}

/// Append-only, ordered list of decode hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn DecodeHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: impl DecodeHook + 'static) {
        self.hooks.push(Arc::new(hook));
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs every hook over every leaf of `table`.
    pub fn apply(&self, table: &mut Table) -> Result<(), ConfigError> {
        if self.hooks.is_empty() {
            return Ok(());
        }
        self.apply_table(table, "")
    }

    fn apply_table(&self, table: &mut Table, prefix: &str) -> Result<(), ConfigError> {
        for (name, slot) in table.iter_mut() {
            let key = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };

            if let Value::Table(nested) = slot {
                self.apply_table(nested, &key)?;
                continue;
            }

            let mut value = std::mem::replace(slot, Value::Boolean(false));
            for hook in &self.hooks {
                value = hook
                    .decode(&key, value)
                    .map_err(|source| ConfigError::Hook {
                        key: key.clone(),
                        source,
                    })?;
            }
            trace!(key = %key, "decode hooks applied");
            *slot = value;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

/// Restricts `hook` to the listed dotted keys; other values pass through.
pub fn for_keys<I, K>(keys: I, hook: impl DecodeHook) -> impl DecodeHook
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
    move |key: &str, value: Value| {
        if keys.iter().any(|k| k == key) {
            hook.decode(key, value)
        } else {
            Ok(value)
        }
    }
}

/// Splits string values on `sep` into arrays of trimmed strings.
///
/// Useful for list settings supplied through the environment, e.g.
/// `SERVER_HOSTS=a,b,c`. Empty segments are dropped.
pub fn split_string(sep: char) -> impl DecodeHook {
    move |_key: &str, value: Value| -> Result<Value, HookError> {
        match value {
            Value::String(s) => Ok(Value::Array(
                s.split(sep)
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )),
            other => Ok(other),
        }
    }
}

/// Turns duration strings such as `"1m30s"`, `"250ms"` or `"2h"` into the
/// `{ secs, nanos }` table `std::time::Duration` deserializes from.
///
/// Recognized units: `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`. Strings that do
/// not parse as a duration pass through unchanged.
pub fn string_to_duration() -> impl DecodeHook {
    |_key: &str, value: Value| -> Result<Value, HookError> {
        match value {
            Value::String(s) => match parse_duration_nanos(&s) {
                Some(nanos) => duration_table(nanos),
                None => Ok(Value::String(s)),
            },
            other => Ok(other),
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

fn duration_table(nanos: u128) -> Result<Value, HookError> {
    let secs = i64::try_from(nanos / NANOS_PER_SEC)
        .map_err(|_| HookError::new("duration out of range"))?;
    let mut table = Table::new();
    table.insert("secs".into(), Value::Integer(secs));
    table.insert("nanos".into(), Value::Integer((nanos % NANOS_PER_SEC) as i64));
    Ok(Value::Table(table))
}

fn parse_duration_nanos(s: &str) -> Option<u128> {
    let s = s.trim();
    if s == "0" {
        return Some(0);
    }
    if s.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return None;
        }
        let amount: u128 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let scale: u128 = match &rest[..unit_len] {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" => NANOS_PER_SEC,
            "m" => 60 * NANOS_PER_SEC,
            "h" => 3_600 * NANOS_PER_SEC,
            _ => return None,
        };
        rest = &rest[unit_len..];

        total = total.checked_add(amount.checked_mul(scale)?)?;
    }

    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(s: &str) -> Table {
        toml::from_str(s).unwrap()
    }

    fn append(suffix: &'static str) -> impl DecodeHook {
        move |_key: &str, value: Value| -> Result<Value, HookError> {
            match value {
                Value::String(s) => Ok(Value::String(s + suffix)),
                other => Ok(other),
            }
        }
    }

    #[test]
    fn test_hooks_run_in_registration_order() {
        let mut forward = HookRegistry::new();
        forward.register(append("a"));
        forward.register(append("b"));

        let mut reverse = HookRegistry::new();
        reverse.register(append("b"));
        reverse.register(append("a"));

        let mut t1 = table("name = \"x\"");
        let mut t2 = t1.clone();
        forward.apply(&mut t1).unwrap();
        reverse.apply(&mut t2).unwrap();

        assert_eq!(t1["name"].as_str(), Some("xab"));
        assert_eq!(t2["name"].as_str(), Some("xba"));
    }

    #[test]
    fn test_hooks_see_dotted_keys() {
        let mut registry = HookRegistry::new();
        registry.register(for_keys(["server.hosts"], split_string(',')));

        let mut t = table(
            r#"
            note = "a,b"
            [server]
            hosts = "a, b,,c"
            "#,
        );
        registry.apply(&mut t).unwrap();

        assert_eq!(t["note"].as_str(), Some("a,b"));
        let hosts: Vec<_> = t["server"]["hosts"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(hosts, ["a", "b", "c"]);
    }

    #[test]
    fn test_hook_error_names_key() {
        let mut registry = HookRegistry::new();
        registry.register(|_key: &str, _value: Value| -> Result<Value, HookError> {
            Err(HookError::new("nope"))
        });

        let mut t = table("[db]\nurl = \"x\"");
        let err = registry.apply(&mut t).unwrap_err();
        assert!(matches!(err, ConfigError::Hook { ref key, .. } if key == "db.url"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration_nanos("1m30s"), Some(90 * NANOS_PER_SEC));
        assert_eq!(parse_duration_nanos("250ms"), Some(250_000_000));
        assert_eq!(parse_duration_nanos("2h"), Some(7_200 * NANOS_PER_SEC));
        assert_eq!(parse_duration_nanos("0"), Some(0));
        assert_eq!(parse_duration_nanos("30"), None);
        assert_eq!(parse_duration_nanos("fast"), None);
        assert_eq!(parse_duration_nanos("5x"), None);
    }

    #[test]
    fn test_duration_hook_decodes_into_std_duration() {
        #[derive(serde::Deserialize)]
        struct Timeouts {
            read: std::time::Duration,
        }

        let mut registry = HookRegistry::new();
        registry.register(string_to_duration());

        let mut t = table("read = \"1s500ms\"");
        registry.apply(&mut t).unwrap();

        let timeouts: Timeouts = Value::Table(t).try_into().unwrap();
        assert_eq!(timeouts.read, std::time::Duration::from_millis(1_500));
    }
}
