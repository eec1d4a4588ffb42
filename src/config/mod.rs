//! Layered configuration loading.

mod decode;
mod defaults;
mod env;
mod error;
mod file;
pub mod hooks;
mod resolver;
mod source;

pub use defaults::Defaults;
pub use env::env_var_name;
pub use error::{ConfigError, FailureKind};
pub use file::FileFormat;
pub use hooks::{DecodeHook, HookError, HookRegistry};
pub use resolver::{resolve, Resolver, CONFIG_NAME, DEFAULT_SEARCH_PATHS};
