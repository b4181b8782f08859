//! Error types for the JSONL binding.

use std::io;

use courier_core::ErrorShape;
use thiserror::Error;

/// Errors surfaced while reading a call or writing its result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The request line is empty or is not a valid call.
    #[error("malformed request: {message}")]
    MalformedJsonl {
        /// Parser diagnostic.
        message: String,
        /// Underlying parser error, when there is one.
        #[source]
        source: Option<serde_json::Error>,
    },
    /// The request line exceeds the size limit.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Configured limit.
        max_size: usize,
    },
    /// Reading or writing the connection failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Serialising the result failed.
    #[error("failed to serialise response: {0}")]
    SerializeResponse(#[from] serde_json::Error),
}

impl DispatchError {
    /// Creates a malformed request error from a parser error.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::MalformedJsonl {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a malformed request error with a custom message.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedJsonl {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a request too large error.
    #[must_use]
    pub const fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Returns `true` when the client sent something the daemon can answer.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedJsonl { .. } | Self::RequestTooLarge { .. }
        )
    }

    /// Describes the failure as a caller-visible error.
    #[must_use]
    pub fn to_shape(&self) -> ErrorShape {
        ErrorShape::malformed_call(self.to_string())
    }
}
