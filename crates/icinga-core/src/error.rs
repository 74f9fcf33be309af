//! Error types for Icinga 2 API operations.
//!
//! This module provides the error taxonomy shared by every Icinga client crate:
//! caller-input validation, construction-time configuration problems, transport
//! failures that outlived the retry budget, and classified HTTP failures.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP 400
    BadRequest,
    /// HTTP 401
    Unauthorized,
    /// HTTP 404
    NotFound,
    /// HTTP 500 reported by the server
    ServerError,
    /// Anything else the transport or decoder reported
    Unexpected,
}

/// A classified API failure.
///
/// `code` mirrors the HTTP status when the server answered with 400, 401, 404 or
/// 500. Unexpected failures (other statuses, undecodable bodies, timeouts) are
/// reported with a synthesized 500.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Status code
    pub code: u16,
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable message
    pub message: String,
}

impl Failure {
    /// Create a failure with an explicit code.
    #[must_use]
    pub fn new(code: u16, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            code,
            kind,
            message: message.into(),
        }
    }

    /// HTTP 400 failure.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, FailureKind::BadRequest, message)
    }

    /// HTTP 401 failure naming the target the client tried to reach.
    #[must_use]
    pub fn unauthorized(target: &str) -> Self {
        Self::new(
            401,
            FailureKind::Unauthorized,
            format!("Not authorized to connect '{target}' - wrong username or password?"),
        )
    }

    /// HTTP 404 failure.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(404, FailureKind::NotFound, "Object not Found")
    }

    /// HTTP 500 failure reported by the server.
    #[must_use]
    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(500, FailureKind::ServerError, message)
    }

    /// Unexpected failure, reported with a synthesized 500.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(500, FailureKind::Unexpected, message)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Main error type for Icinga operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Caller input rejected before any request was sent
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection failures persisted through every retry
    #[error("Maximum retries ({attempts}) against '{target}' reached. Giving up: {message}")]
    RetriesExhausted {
        /// Number of retries performed
        attempts: u32,
        /// Base URL of the API
        target: String,
        /// Last transport error
        message: String,
    },

    /// Classified API failure
    #[error("API request failed: {0}")]
    Api(Failure),
}

/// Specialized result type for Icinga operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Api(failure) => match failure.kind {
                FailureKind::BadRequest => "BAD_REQUEST",
                FailureKind::Unauthorized => "UNAUTHORIZED",
                FailureKind::NotFound => "NOT_FOUND",
                FailureKind::ServerError => "SERVER_ERROR",
                FailureKind::Unexpected => "UNEXPECTED",
            },
        }
    }

    /// Returns the API failure carried by this error, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Api(failure) => Some(failure),
            _ => None,
        }
    }

    /// Returns the status code of an API failure.
    #[must_use]
    pub fn code(&self) -> Option<u16> {
        self.failure().map(|failure| failure.code)
    }

    /// Returns true when the server reported that the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.failure(), Some(f) if f.kind == FailureKind::NotFound)
    }

    /// Returns true if this error should be logged as a serious error.
    #[must_use]
    pub fn should_log(&self) -> bool {
        match self {
            Self::ConfigError(_) | Self::RetriesExhausted { .. } => true,
            Self::Api(failure) => {
                matches!(failure.kind, FailureKind::ServerError | FailureKind::Unexpected)
            }
            _ => false,
        }
    }
}

impl From<Failure> for Error {
    fn from(failure: Failure) -> Self {
        Self::Api(failure)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(Failure::unexpected(err.to_string()))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
