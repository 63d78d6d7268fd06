//! Error types for oracle_feeds
//!
//! Every failure surfaced to callers is an [`SdkError`] tagged with an
//! [`ErrorKind`]. The original cause travels along for diagnostics.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Shared, cloneable error cause
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Classification attached to every SDK failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad or unsupported network, key or setting at construction time
    Configuration,
    /// Registry lookup failed or returned the zero address
    Resolution,
    /// Remote read failed or returned no usable value
    ValueUnavailable,
    /// Operation invoked on a disposed or unconstructed facade
    NotInitialized,
}

impl ErrorKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Resolution => "resolution_error",
            Self::ValueUnavailable => "value_unavailable",
            Self::NotInitialized => "not_initialized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK-level error
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct SdkError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Cause>,
}

impl SdkError {
    /// Create an error without an underlying cause
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn value_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueUnavailable, message)
    }

    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotInitialized, message)
    }

    /// Attach the underlying cause
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Attach an `anyhow` error returned by a [`crate::client::RemoteClient`]
    pub fn with_client_cause(self, cause: anyhow::Error) -> Self {
        self.with_cause(Box::<dyn std::error::Error + Send + Sync>::from(cause))
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Resolution | ErrorKind::ValueUnavailable)
    }
}

impl From<config::ConfigError> for SdkError {
    fn from(err: config::ConfigError) -> Self {
        SdkError::configuration("failed to load configuration").with_cause(err)
    }
}

impl From<AddressError> for SdkError {
    fn from(err: AddressError) -> Self {
        SdkError::configuration(err.to_string()).with_cause(err)
    }
}

/// Parsing errors for addresses and feed identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Missing 0x prefix or non-hex characters
    #[error("invalid hex in {0:?}")]
    InvalidHex(String),

    /// Wrong byte length
    #[error("expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Empty feed symbol
    #[error("feed symbol is empty")]
    EmptySymbol,

    /// Feed name does not fit the 20-byte name field
    #[error("feed name {0:?} exceeds 20 bytes")]
    NameTooLong(String),

    /// Feed names are ASCII on chain
    #[error("feed name {0:?} is not ASCII")]
    NonAsciiName(String),

    /// Unknown feed category prefix
    #[error("unknown feed category {0:#04x}")]
    UnknownCategory(u8),
}

/// Result type alias for convenience
pub type SdkResult<T> = Result<T, SdkError>;
