//! Layered settings resolution with declarative validation.
//!
//! Settings are merged from defaults, a config file and environment
//! variables (lowest to highest precedence), decoded into a caller-defined
//! type and checked against the constraints that type declares.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
mod error;
pub mod validate;

pub use config::{hooks, resolve, ConfigError, Defaults, FailureKind, Resolver};
pub use error::{ApiError, ErrorCode};
pub use validate::{Field, FieldRef, Schema, Settings, Validator};
