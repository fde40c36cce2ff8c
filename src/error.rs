// src/error.rs

//! Unified error handling for the tracker.
//!
//! Every failure is classified into an [`ErrorKind`] so the sync layer can
//! decide between retrying, marking an account as nonexistent, or surfacing
//! a hard error.

use std::fmt;

use thiserror::Error;

use crate::models::PlatformId;

/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed handle, id or query. A caller bug, never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Connection-level failure (DNS, TLS, reset, body read)
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The request did not complete within the configured timeout
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// Remote answered with a status the client does not accept
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Remote confirms the account or resource does not exist
    #[error("{platform}: {what} not found")]
    NotFound { platform: PlatformId, what: String },

    /// Remote refused the request because of its own call limits
    #[error("{platform}: rate limited")]
    RateLimited { platform: PlatformId },

    /// Payload did not have the expected shape
    #[error("{platform}: parse error: {message}")]
    Parse { platform: PlatformId, message: String },

    /// Durable storage failure
    #[error("Storage error for {key}: {message}")]
    Storage { key: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Coarse classification of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    NetworkFailure,
    Timeout,
    NotFound,
    RateLimited,
    Rejected,
    ParseFailure,
    StorageFailure,
    Config,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying with backoff.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::NetworkFailure | ErrorKind::Timeout | ErrorKind::RateLimited
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::NetworkFailure => "network_failure",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NotFound => "not_found",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Rejected => "rejected",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::Config => "config",
        };
        f.write_str(s)
    }
}

impl AppError {
    /// Create an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a network error for a URL.
    pub fn network(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(platform: PlatformId, what: impl Into<String>) -> Self {
        Self::NotFound {
            platform,
            what: what.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(platform: PlatformId, message: impl fmt::Display) -> Self {
        Self::Parse {
            platform,
            message: message.to_string(),
        }
    }

    /// Create a storage error for an item key.
    pub fn storage(key: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            Self::network(url, err)
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::Network { .. } => ErrorKind::NetworkFailure,
            AppError::Timeout { .. } => ErrorKind::Timeout,
            // 5xx and 429 are transient on the remote side.
            AppError::HttpStatus { status, .. } if *status >= 500 => ErrorKind::NetworkFailure,
            AppError::HttpStatus { status: 429, .. } => ErrorKind::RateLimited,
            AppError::HttpStatus { .. } => ErrorKind::Rejected,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::RateLimited { .. } => ErrorKind::RateLimited,
            AppError::Parse { .. } | AppError::Json(_) => ErrorKind::ParseFailure,
            AppError::Storage { .. } | AppError::Io(_) => ErrorKind::StorageFailure,
            AppError::Config(_)
            | AppError::Toml(_)
            | AppError::TomlSerialize(_)
            | AppError::Url(_) => ErrorKind::Config,
        }
    }

    /// Shorthand for `self.kind().is_retryable()`.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
