//! Declarative field constraints attached to a settings type.

use serde::de::DeserializeOwned;
use serde::Serialize;
use toml::{Table, Value};

/// A settings structure that can be resolved from layered sources.
///
/// The schema lists, per configuration key, the checks the decoded value
/// must pass. Every key named in the schema is also reachable through the
/// environment even when no default or file provides it.
///
/// ## Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stratum::{Field, Schema, Settings};
///
/// #[derive(Deserialize, Serialize)]
/// struct Server {
///     listen: String,
///     workers: u32,
/// }
///
/// #[derive(Deserialize, Serialize)]
/// struct AppSettings {
///     server: Server,
/// }
///
/// impl Settings for AppSettings {
///     fn schema() -> Schema {
///         Schema::new()
///             .field(Field::tagged("server.listen", "required,host_port"))
///             .field(Field::new("server.workers").check_with("multipleof", "4"))
///     }
/// }
/// ```
pub trait Settings: DeserializeOwned + Serialize {
    fn schema() -> Schema {
        Schema::default()
    }
}

/// A named check with its parameter, e.g. `multipleof=10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub param: String,
}

impl Constraint {
    pub fn new(name: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param: param.into(),
        }
    }
}

/// The constraints declared for one dotted configuration key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    constraints: Vec<Constraint>,
}

impl Field {
    /// Declares a key with no constraints yet.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            constraints: Vec::new(),
        }
    }

    /// Declares a key from a comma-separated tag such as
    /// `"required,multipleof=10,oneof=debug info"`.
    ///
    /// Each entry is `name` or `name=param`; blank entries are ignored.
    pub fn tagged(key: impl Into<String>, tag: &str) -> Self {
        let constraints = tag
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once('=') {
                Some((name, param)) => Constraint::new(name.trim(), param),
                None => Constraint::new(entry, ""),
            })
            .collect();

        Self {
            key: key.into(),
            constraints,
        }
    }

    /// Adds a parameterless check.
    pub fn check(self, name: impl Into<String>) -> Self {
        self.check_with(name, "")
    }

    /// Adds a check with a parameter.
    pub fn check_with(mut self, name: impl Into<String>, param: impl Into<String>) -> Self {
        self.constraints.push(Constraint::new(name, param));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// The table of `{key, check, parameter}` entries for a settings type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field declaration. Declaring the same key twice keeps both.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Dotted keys declared by this schema, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::key)
    }
}

/// Looks up a dotted key such as `server.port` in a table.
pub(crate) fn lookup<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut current = table.get(parts.next()?)?;

    for part in parts {
        current = current.as_table()?.get(part)?;
    }

    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_parses_names_and_params() {
        let field = Field::tagged("log.level", "required, oneof=debug info ,, max=5");

        assert_eq!(field.key(), "log.level");
        assert_eq!(
            field.constraints(),
            &[
                Constraint::new("required", ""),
                Constraint::new("oneof", "debug info"),
                Constraint::new("max", "5"),
            ]
        );
    }

    #[test]
    fn test_builder_checks_keep_order() {
        let field = Field::new("a").check("required").check_with("min", "1");
        assert_eq!(field.constraints()[0].name, "required");
        assert_eq!(field.constraints()[1].param, "1");
    }

    #[test]
    fn test_lookup_nested_key() {
        let table: Table = toml::from_str(
            r#"
            [server]
            port = 8080
            "#,
        )
        .unwrap();

        assert_eq!(lookup(&table, "server.port"), Some(&Value::Integer(8080)));
        assert_eq!(lookup(&table, "server.host"), None);
        assert_eq!(lookup(&table, "server.port.inner"), None);
    }
}
