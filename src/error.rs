//! Structured error reports for callers that surface failures to clients.

use std::error::Error as StdError;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::config::{ConfigError, FailureKind};

type BoxError = Box<dyn StdError + Send + Sync>;

/// Numeric error codes carried by [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    Unknown = 1000,
    Internal = 1001,
    InvalidInput = 1002,
    UnsupportedMediaType = 1003,
    NotFound = 1004,
    ClientClosedRequest = 1005,
    EntityTooLarge = 1006,
    Unauthorized = 1007,
    Forbidden = 1008,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

/// An error with a code, client-facing text, optional details and a cause.
///
/// ```
/// use stratum::{ApiError, ErrorCode};
///
/// let err = ApiError::not_found("user 42").with_location("users::get");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(
///     err.to_string(),
///     "Error: 1004: Resource not found; Info: user 42; Location: users::get;"
/// );
/// ```
#[derive(Debug, Serialize)]
pub struct ApiError {
    code: ErrorCode,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(
        rename = "error",
        serialize_with = "serialize_cause",
        skip_serializing_if = "Option::is_none"
    )]
    source: Option<BoxError>,
}

fn serialize_cause<S: Serializer>(cause: &Option<BoxError>, serializer: S) -> Result<S::Ok, S::Error> {
    match cause {
        Some(cause) => serializer.serialize_str(&cause.to_string()),
        None => serializer.serialize_none(),
    }
}

impl ApiError {
    fn new(code: ErrorCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            info: None,
            location: None,
            source: None,
        }
    }

    fn with_source(mut self, source: Option<BoxError>) -> Self {
        self.source = source;
        self
    }

    pub fn unknown(source: impl Into<BoxError>) -> Self {
        Self::new(ErrorCode::Unknown, "Internal error").with_source(Some(source.into()))
    }

    pub fn internal(info: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::new(ErrorCode::Internal, "Internal error")
            .with_info(info)
            .with_source(source)
    }

    /// Invalid input; the text is the cause's message when there is a cause.
    pub fn invalid_input(message: impl Into<String>, source: Option<BoxError>) -> Self {
        let text = match &source {
            Some(cause) => cause.to_string(),
            None => message.into(),
        };
        Self::new(ErrorCode::InvalidInput, text).with_source(source)
    }

    pub fn not_found(info: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, "Resource not found").with_info(info)
    }

    pub fn client_closed_request() -> Self {
        Self::new(ErrorCode::ClientClosedRequest, "User closed connection")
    }

    pub fn too_large(info: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityTooLarge, "too large").with_info(info)
    }

    pub fn unauthorized(source: Option<BoxError>) -> Self {
        Self::new(ErrorCode::Unauthorized, "Unauthorized request received").with_source(source)
    }

    pub fn forbidden(source: Option<BoxError>) -> Self {
        Self::new(ErrorCode::Forbidden, "Request forbidden").with_source(source)
    }

    /// Returns the `ApiError` inside `err`, or wraps it as [`ErrorCode::Unknown`].
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => *api,
            Err(other) => match other.downcast::<ConfigError>() {
                Ok(config) => Self::from(*config),
                Err(other) => Self::unknown(other),
            },
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Extends the location trail, e.g. `handler ---> service`.
    pub fn append_location(mut self, location: impl AsRef<str>) -> Self {
        let location = location.as_ref();
        self.location = Some(match self.location.take() {
            Some(existing) => format!("{existing} ---> {location}"),
            None => location.to_string(),
        });
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}: {};", self.code.as_u16(), self.text)?;
        if let Some(info) = &self.info {
            write!(f, " Info: {info};")?;
        }
        if let Some(source) = &self.source {
            write!(f, " Error raw: {source};")?;
        }
        if let Some(location) = &self.location {
            write!(f, " Location: {location};")?;
        }
        Ok(())
    }
}

impl StdError for ApiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        match err.kind() {
            FailureKind::SourceMisconfiguration => {
                let info = match &err {
                    ConfigError::ExplicitFileNotFound(path) => path.display().to_string(),
                    other => other.to_string(),
                };
                Self::not_found(info).with_source(Some(Box::new(err)))
            }
            FailureKind::Decode | FailureKind::Validation => {
                Self::invalid_input("invalid configuration", Some(Box::new(err)))
            }
            FailureKind::Internal => Self::unknown(err),
        }
    }
}
