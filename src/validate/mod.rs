//! Declarative validation of resolved settings.

pub mod checks;
mod engine;
mod error;
mod schema;

pub use checks::{CheckFn, FieldRef};
pub use engine::Validator;
pub use error::{ValidationError, Violation, Violations};
pub use schema::{Constraint, Field, Schema, Settings};

pub(crate) use schema::lookup;
