use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use toml::Value;

use super::checks::{CheckFn, FieldRef, BUILTINS, REQUIRED};
use super::error::{ValidationError, Violation, Violations};
use super::schema::{lookup, Schema, Settings};

/// Evaluates declared constraints against settings instances.
///
/// A fresh validator knows the built-in checks (`multipleof`, `host_port`,
/// `required`, `min`, `max`, `oneof`). Custom checks are added with
/// [`register_check`](Self::register_check) before the validator is used.
///
/// ## Example
///
/// ```
/// use stratum::Validator;
///
/// let mut validator = Validator::new();
/// validator.register_check("even", |field| {
///     field.value().and_then(|v| v.as_integer()).is_some_and(|v| v % 2 == 0)
/// });
/// assert!(validator.has_check("even"));
/// ```
#[derive(Clone)]
pub struct Validator {
    checks: BTreeMap<String, Arc<CheckFn>>,
}

impl Validator {
    pub fn new() -> Self {
        let checks = BUILTINS
            .iter()
            .map(|&(name, check)| (name.to_string(), Arc::new(check) as Arc<CheckFn>))
            .collect();
        Self { checks }
    }

    /// Adds a named custom check.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already taken by a built-in or a previously
    /// registered check. Conflicting names are a programming error.
    pub fn register_check<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&FieldRef<'_>) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        assert!(
            !self.checks.contains_key(&name),
            "check '{name}' is already registered"
        );
        self.checks.insert(name, Arc::new(check));
        self
    }

    pub fn has_check(&self, name: &str) -> bool {
        self.checks.contains_key(name)
    }

    /// Validates `instance` against the constraints declared by `T::schema()`.
    pub fn validate<T: Settings>(&self, instance: &T) -> Result<(), ValidationError> {
        let value = Value::try_from(instance)?;
        self.validate_value(&value, &T::schema())
    }

    /// Validates an already materialized value tree against `schema`.
    ///
    /// Every constraint is evaluated and every failure collected. Constraints
    /// other than `required` pass when their key is absent.
    pub fn validate_value(&self, value: &Value, schema: &Schema) -> Result<(), ValidationError> {
        let mut violations = Violations::default();

        for field in schema.fields() {
            let found = value.as_table().and_then(|t| lookup(t, field.key()));

            for constraint in field.constraints() {
                let check = self.checks.get(&constraint.name).ok_or_else(|| {
                    ValidationError::UnknownCheck {
                        key: field.key().to_string(),
                        check: constraint.name.clone(),
                    }
                })?;

                if found.is_none() && constraint.name != REQUIRED {
                    continue;
                }

                if !check(&FieldRef::new(field.key(), found, &constraint.param)) {
                    violations.push(Violation {
                        key: field.key().to_string(),
                        check: constraint.name.clone(),
                        param: constraint.param.clone(),
                        value: found.map(Value::to_string),
                    });
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Invalid(violations))
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("checks", &self.checks.keys().collect::<Vec<_>>())
            .finish()
    }
}
