//! Error Handling Module
//!
//! A single error enum covers transport, API, storage and configuration
//! failures. Malformed stream records and empty chunks are deliberately
//! absent: they are absorbed by the decoder and never reach callers.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollachat::error::ChatError;
//!
//! let error = ChatError::api_error(503, "model is loading");
//! assert!(error.is_retryable());
//! ```

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors surfaced to callers of this crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The server answered with a non-success status.
    #[error("API error {code}: {message}")]
    ApiError { code: u16, message: String },

    /// The response body failed while streaming.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// A non-streaming response body could not be decoded.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The caller supplied unusable input (empty prompt, missing model).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading or writing the conversation file failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Configuration could not be built.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The operation was cancelled by its owner.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ChatError {
    /// Create an API error from a status code and message.
    pub fn api_error(code: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            code,
            message: message.into(),
        }
    }

    /// Whether a caller-side retry could plausibly succeed.
    ///
    /// The crate itself never retries; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(_) | Self::StreamError(_) => true,
            Self::ApiError { code, .. } => *code == 429 || *code >= 500,
            _ => false,
        }
    }

    /// Whether the error originated in the transport layer.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::ApiError { .. } | Self::StreamError(_)
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::api_error(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}
