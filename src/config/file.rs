//! File-based configuration source and config file discovery.

use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use super::source::{ConfigEntry, ConfigSource};
use super::ConfigError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured formats a config file may use, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Yaml,
    Json,
}

impl FileFormat {
    /// Extensions in the order discovery tries them.
    pub const EXTENSIONS: &'static [(&'static str, FileFormat)] = &[
        ("json", FileFormat::Json),
        ("toml", FileFormat::Toml),
        ("yaml", FileFormat::Yaml),
        ("yml", FileFormat::Yaml),
    ];

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::EXTENSIONS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|&(_, format)| format)
    }

    /// Parses file contents into a table. YAML and JSON `null`s are dropped.
    ///
    /// YAML mapping keys that are numbers or booleans become their string form.
    pub fn parse(self, contents: &str) -> Result<Table, BoxError> {
        let tree = match self {
            FileFormat::Toml => return Ok(toml::from_str(contents)?),
            FileFormat::Yaml => yaml_to_json(serde_yaml::from_str(contents)?)?,
            FileFormat::Json => serde_json::from_str::<serde_json::Value>(contents)?,
        };

        match json_to_toml(tree) {
            None => Ok(Table::new()),
            Some(Value::Table(table)) => Ok(table),
            Some(_) => Err("top-level value must be a mapping".into()),
        }
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<serde_json::Value, BoxError> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => serde_json::Value::Null,
        Yaml::Bool(b) => b.into(),
        Yaml::Number(n) => serde_json::to_value(n)?,
        Yaml::String(s) => s.into(),
        Yaml::Sequence(items) => items
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()?
            .into(),
        Yaml::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (key, value) in map {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported mapping key: {other:?}").into()),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            object.into()
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn json_to_toml(value: serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    match value {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Boolean(b)),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::Integer(i)),
            None => n.as_f64().map(Value::Float),
        },
        Json::String(s) => Some(Value::String(s)),
        Json::Array(items) => Some(Value::Array(
            items.into_iter().filter_map(json_to_toml).collect(),
        )),
        Json::Object(map) => Some(Value::Table(
            map.into_iter()
                .filter_map(|(key, value)| json_to_toml(value).map(|value| (key, value)))
                .collect(),
        )),
    }
}

/// Finds the first `<dir>/<base_name>.<ext>` that is a file.
///
/// Directories are tried in order; within a directory, extensions follow
/// [`FileFormat::EXTENSIONS`].
pub fn discover(search_paths: &[PathBuf], base_name: &str) -> Option<PathBuf> {
    search_paths.iter().find_map(|dir| {
        FileFormat::EXTENSIONS.iter().find_map(|(ext, _)| {
            let candidate = dir.join(format!("{base_name}.{ext}"));
            candidate.is_file().then_some(candidate)
        })
    })
}

/// A configuration source that loads one config file.
///
/// Required files that don't exist cause an error; optional files that
/// don't exist are silently skipped.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    required: bool,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required,
        }
    }
}

impl ConfigSource for FileSource {
    fn entries(&self, _below: &Table) -> Result<Vec<ConfigEntry>, ConfigError> {
        match load_config_file(&self.path, self.required)? {
            Some(table) => Ok(vec![ConfigEntry::root(table)]),
            None => Ok(vec![]),
        }
    }
}

/// Loads and parses a config file in the format its extension names.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_config_file(path: &Path, required: bool) -> Result<Option<Table>, ConfigError> {
    let format =
        FileFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;

    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = format.parse(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
            debug!(path = %path.display(), keys = table.len(), "loaded config file");
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::ExplicitFileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_file_source_loads_valid_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "key = \"value\"").unwrap();

        let source = FileSource::new(file.path(), true);
        let entries = source.entries(&Table::new()).unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries[0].path.is_empty());
        let table = entries[0].value.as_table().unwrap();
        assert_eq!(table.get("key"), Some(&Value::String("value".into())));
    }

    #[test]
    fn test_file_source_required_missing() {
        let source = FileSource::new("/nonexistent/path/config.toml", true);
        let result = source.entries(&Table::new());

        assert!(matches!(result, Err(ConfigError::ExplicitFileNotFound(_))));
    }

    #[test]
    fn test_file_source_optional_missing() {
        let source = FileSource::new("/nonexistent/path/config.toml", false);
        let entries = source.entries(&Table::new()).unwrap();

        assert!(entries.is_empty());
    }

    #[test]
    fn test_unparsable_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "config.toml", "this is = = not toml");

        let result = FileSource::new(&path, false).entries(&Table::new());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "config.ini", "a = 1");

        let result = FileSource::new(&path, true).entries(&Table::new());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_yaml_and_json_parse_to_tables() {
        let yaml = FileFormat::Yaml
            .parse("server:\n  port: 8080\n  ratio: 0.5\n  name: ~\n")
            .unwrap();
        assert_eq!(yaml["server"]["port"].as_integer(), Some(8080));
        assert_eq!(yaml["server"]["ratio"].as_float(), Some(0.5));
        assert!(yaml["server"].get("name").is_none());

        let json = FileFormat::Json
            .parse(r#"{"server": {"hosts": ["a", "b"], "tls": true}}"#)
            .unwrap();
        assert_eq!(json["server"]["hosts"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["server"]["tls"].as_bool(), Some(true));
    }

    #[test]
    fn test_yaml_scalar_keys_become_strings() {
        let yaml = FileFormat::Yaml
            .parse("codes:\n  404: missing\n  true: yes\nratios:\n  0.5: half\n")
            .unwrap();
        assert_eq!(yaml["codes"]["404"].as_str(), Some("missing"));
        assert_eq!(yaml["codes"]["true"].as_str(), Some("yes"));
        assert_eq!(yaml["ratios"]["0.5"].as_str(), Some("half"));

        assert!(FileFormat::Yaml.parse("? [a, b]\n: c\n").is_err());
    }

    #[test]
    fn test_non_mapping_root_is_rejected() {
        assert!(FileFormat::Json.parse("[1, 2]").is_err());
    }

    #[test]
    fn test_discover_respects_path_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_file(second.path(), "config.yaml", "a: 1");
        let expected = write_file(first.path(), "config.json", "{}");

        let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(discover(&paths, "config"), Some(expected));
    }

    #[test]
    fn test_discover_prefers_json_within_dir() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "config.toml", "");
        write_file(dir.path(), "config.yaml", "");
        let expected = write_file(dir.path(), "config.json", "{}");

        assert_eq!(discover(&[dir.path().to_path_buf()], "config"), Some(expected));
    }

    #[test]
    fn test_discover_nothing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(discover(&[dir.path().to_path_buf()], "config"), None);
    }
}
