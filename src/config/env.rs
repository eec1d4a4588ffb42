use toml::{Table, Value};
use tracing::trace;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;
use crate::validate::lookup;

/// Environment variable name bound to a dotted key.
///
/// `server.http.port` maps to `SERVER_HTTP_PORT`, or `APP_SERVER_HTTP_PORT`
/// with prefix `app`.
pub fn env_var_name(prefix: Option<&str>, key: &str) -> String {
    let name = key.replace('.', "_").to_uppercase();
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}_{}", prefix.to_uppercase(), name),
        _ => name,
    }
}

/// Reads overrides for a fixed set of keys from the process environment.
///
/// Empty variables count as unset. Values stay strings; decoding converts
/// them to whatever type the target field asks for. A key that names a table
/// in the lower layers is never replaced by a variable.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: Option<String>,
    keys: Vec<String>,
}

impl EnvSource {
    pub fn new(prefix: Option<String>, keys: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefix,
            keys: keys.into_iter().collect(),
        }
    }
}

impl ConfigSource for EnvSource {
    fn entries(&self, below: &Table) -> Result<Vec<ConfigEntry>, ConfigError> {
        let mut entries = Vec::new();

        for key in &self.keys {
            let var = env_var_name(self.prefix.as_deref(), key);
            let raw = match std::env::var(&var) {
                Ok(raw) if raw.is_empty() => continue,
                Ok(raw) => raw,
                Err(std::env::VarError::NotPresent) => continue,
                Err(std::env::VarError::NotUnicode(_)) => {
                    return Err(ConfigError::EnvNotUnicode(var));
                }
            };

            if let Some(Value::Table(_)) = lookup(below, key) {
                trace!(key = %key, var = %var, "ignoring environment value for a table");
                continue;
            }

            trace!(key = %key, var = %var, "environment override");
            entries.push(ConfigEntry::at_key(key, Value::String(raw)));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn below(s: &str) -> Table {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name(None, "server.port"), "SERVER_PORT");
        assert_eq!(env_var_name(None, "log.json_format"), "LOG_JSON_FORMAT");
        assert_eq!(env_var_name(Some("app"), "server.port"), "APP_SERVER_PORT");
        assert_eq!(env_var_name(Some(""), "debug"), "DEBUG");
    }

    #[test]
    fn test_reads_only_bound_keys() {
        temp_env::with_vars(
            [
                ("STRATUM_T1_SERVER_PORT", Some("9090")),
                ("STRATUM_T1_OTHER", Some("x")),
            ],
            || {
                let source = EnvSource::new(Some("stratum_t1".into()), ["server.port".to_string()]);
                let entries = source.entries(&Table::new()).unwrap();

                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].path, ["server", "port"]);
                assert_eq!(entries[0].value, Value::String("9090".into()));
            },
        );
    }

    #[test]
    fn test_empty_value_is_unset() {
        temp_env::with_var("STRATUM_T2_NAME", Some(""), || {
            let source = EnvSource::new(Some("stratum_t2".into()), ["name".to_string()]);
            assert!(source.entries(&Table::new()).unwrap().is_empty());
        });
    }

    #[test]
    fn test_values_stay_strings() {
        temp_env::with_vars(
            [
                ("STRATUM_T3_PORT", Some("8080")),
                ("STRATUM_T3_TOKEN", Some("12345")),
            ],
            || {
                let base = below("port = 1");
                let source = EnvSource::new(
                    Some("stratum_t3".into()),
                    ["port".to_string(), "token".to_string()],
                );
                let entries = source.entries(&base).unwrap();

                assert_eq!(entries[0].value, Value::String("8080".into()));
                assert_eq!(entries[1].value, Value::String("12345".into()));
            },
        );
    }

    #[test]
    fn test_table_below_is_not_replaced() {
        temp_env::with_var("STRATUM_T4_DATABASE", Some("yes"), || {
            let base = below("[database]\nurl = \"pg://x\"\n");
            let source = EnvSource::new(Some("stratum_t4".into()), ["database".to_string()]);

            assert!(source.entries(&base).unwrap().is_empty());
        });
    }
}
