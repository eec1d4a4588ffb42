use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::debug;

use super::decode::decode;
use super::defaults::Defaults;
use super::env::EnvSource;
use super::file::{discover, FileSource};
use super::hooks::{DecodeHook, HookRegistry};
use super::source::{apply_source, leaf_keys};
use super::ConfigError;
use crate::validate::{FieldRef, Settings, Validator};

/// Base name of the discovered config file; the extension picks the format.
pub const CONFIG_NAME: &str = "config";

/// Directories searched before any caller-supplied ones.
pub const DEFAULT_SEARCH_PATHS: [&str; 2] = [".", "./configs"];

/// Resolves typed settings from defaults, a config file and the environment.
///
/// Precedence, lowest to highest: defaults, config file, environment. The
/// file is either the one given with [`with_config_file`](Self::with_config_file)
/// or the first `config.{json,toml,yaml,yml}` found in the search paths.
/// Nested tables are merged recursively; other values (including arrays) are
/// replaced entirely.
///
/// A resolver owns its decode hooks and validator, so independently
/// configured resolvers don't affect each other.
///
/// ## Example
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use stratum::{Defaults, Field, Resolver, Schema, Settings};
///
/// #[derive(Deserialize, Serialize)]
/// struct Server {
///     listen: String,
///     port: u16,
/// }
///
/// #[derive(Deserialize, Serialize)]
/// struct AppSettings {
///     server: Server,
/// }
///
/// impl Settings for AppSettings {
///     fn schema() -> Schema {
///         Schema::new().field(Field::tagged("server.listen", "required,host_port"))
///     }
/// }
///
/// // With SERVER_PORT=9090 in the environment, port resolves to 9090.
/// let settings: AppSettings = Resolver::new()
///     .with_search_path("/etc/myapp")
///     .resolve(
///         Defaults::new()
///             .set("server.listen", "0.0.0.0:8080")
///             .set("server.port", 8080),
///     )?;
/// # Ok::<(), stratum::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
#[must_use = "a resolver does nothing until .resolve() is called"]
pub struct Resolver {
    search_paths: Vec<PathBuf>,
    config_file: Option<PathBuf>,
    env_prefix: Option<String>,
    hooks: HookRegistry,
    validator: Validator,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            search_paths: DEFAULT_SEARCH_PATHS.into_iter().map(PathBuf::from).collect(),
            config_file: None,
            env_prefix: None,
            hooks: HookRegistry::new(),
            validator: Validator::new(),
        }
    }

    /// Adds a directory to search for the config file, after the built-in ones.
    pub fn with_search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Loads exactly this file instead of searching.
    ///
    /// Resolution fails if the file doesn't exist. An empty path is ignored.
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        self.config_file = (!path.as_os_str().is_empty()).then(|| path.to_path_buf());
        self
    }

    /// Prefixes every bound environment variable, e.g. `APP_SERVER_PORT`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Appends a decode hook. Hooks run in the order they were added.
    pub fn with_hook(mut self, hook: impl DecodeHook + 'static) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Registers a custom check on this resolver's validator.
    ///
    /// # Panics
    ///
    /// Panics if the check name is already taken.
    pub fn with_check<F>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&FieldRef<'_>) -> bool + Send + Sync + 'static,
    {
        self.validator.register_check(name, check);
        self
    }

    /// Replaces the validator, keeping none of the checks added so far.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Loads, merges, decodes and validates settings of type `T`.
    ///
    /// The returned value has passed every constraint in `T::schema()`; an
    /// instance that fails validation is never returned.
    pub fn resolve<T: Settings>(&self, defaults: Defaults) -> Result<T, ConfigError> {
        let file = self.file_source()?;

        let mut merged = Table::new();
        apply_source(&mut merged, &defaults)?;
        if let Some(file) = &file {
            apply_source(&mut merged, file)?;
        }

        let mut keys = leaf_keys(&merged);
        keys.extend(T::schema().keys().map(str::to_string));
        let env = EnvSource::new(self.env_prefix.clone(), keys);
        apply_source(&mut merged, &env)?;

        self.hooks.apply(&mut merged)?;
        debug!(keys = merged.len(), hooks = self.hooks.len(), "configuration merged");

        let settings: T = decode(Value::Table(merged))?;
        self.validator.validate(&settings)?;
        Ok(settings)
    }

    fn file_source(&self) -> Result<Option<FileSource>, ConfigError> {
        if let Some(path) = &self.config_file {
            if let Err(e) = std::fs::metadata(path) {
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(ConfigError::ExplicitFileNotFound(path.clone()));
                }
            }
            debug!(path = %path.display(), "using specified config file");
            return Ok(Some(FileSource::new(path, true)));
        }

        match discover(&self.search_paths, CONFIG_NAME) {
            Some(path) => {
                debug!(path = %path.display(), "discovered config file");
                Ok(Some(FileSource::new(path, false)))
            }
            None => {
                debug!("no config file found, using defaults and environment");
                Ok(None)
            }
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves `T` with a default [`Resolver`].
pub fn resolve<T: Settings>(defaults: Defaults) -> Result<T, ConfigError> {
    Resolver::new().resolve(defaults)
}
