//! Domain-level error types for refern-takeout.
//!
//! All errors are typed with `thiserror` and provide meaningful context
//! without exposing internal details to end users.

use thiserror::Error;

/// Application-level errors covering transport, protocol, and local I/O failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network request failed before a usable response was received.
    #[error("Request failed: {message}")]
    Request {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The service returned a payload outside the documented protocol.
    #[error("Protocol mismatch: {message}")]
    ProtocolMismatch { message: String },

    /// An operation was invoked before its preconditions held.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// The remote folder/item data is inconsistent (cycles, path collisions).
    #[error("Data integrity error: {message}")]
    DataIntegrity { message: String },

    /// Export polling exceeded the configured attempt bound.
    #[error("Timed out waiting for exports after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    /// JSON parsing failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl AppError {
    /// Create a request error from a reqwest error.
    pub fn request(message: impl Into<String>, err: reqwest::Error) -> Self {
        Self::Request {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Create a protocol-mismatch error.
    pub fn protocol_mismatch(message: impl Into<String>) -> Self {
        Self::ProtocolMismatch {
            message: message.into(),
        }
    }

    /// Create a data-integrity error.
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Create an invalid-state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
