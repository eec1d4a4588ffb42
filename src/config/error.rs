use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use super::hooks::HookError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("specified config file not found: {0}")]
    ExplicitFileNotFound(PathBuf),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unsupported config file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("environment variable {0} is not valid unicode")]
    EnvNotUnicode(String),

    #[error("decode hook failed for '{key}': {source}")]
    Hook { key: String, source: HookError },

    #[error("failed to decode config: {0}")]
    DeserializeError(#[from] toml::de::Error),

    #[error("config validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::ExplicitFileNotFound(_) => FailureKind::SourceMisconfiguration,
            Self::ReadError { .. }
            | Self::UnsupportedFormat(_)
            | Self::ParseError { .. }
            | Self::EnvNotUnicode(_)
            | Self::Hook { .. }
            | Self::DeserializeError(_) => FailureKind::Decode,
            Self::Validation(ValidationError::Invalid(_)) => FailureKind::Validation,
            Self::Validation(_) => FailureKind::Internal,
        }
    }
}

/// Classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The sources were set up wrongly, e.g. a missing explicit file.
    SourceMisconfiguration,
    /// A file could not be read or parsed, or a value did not fit its field.
    Decode,
    /// The decoded settings violate declared constraints.
    Validation,
    Internal,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceMisconfiguration => "source-misconfiguration",
            Self::Decode => "decode-error",
            Self::Validation => "validation-error",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
