use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{0}")]
    Invalid(Violations),

    #[error("field '{key}' declares unregistered check '{check}'")]
    UnknownCheck { key: String, check: String },

    #[error("failed to inspect settings for validation: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ValidationError {
    /// Violated constraints, if this is a constraint failure.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Invalid(violations) => Some(violations),
            _ => None,
        }
    }
}

/// One failed constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub key: String,
    pub check: String,
    pub param: String,
    /// Rendered value, `None` when the key was absent.
    pub value: Option<String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' failed '{}", self.key, self.check)?;
        if !self.param.is_empty() {
            write!(f, "={}", self.param)?;
        }
        match &self.value {
            Some(value) => write!(f, "' check (value: {value})"),
            None => write!(f, "' check (missing)"),
        }
    }
}

/// Every constraint that failed, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} constraint(s) violated: ", self.0.len())?;
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}
