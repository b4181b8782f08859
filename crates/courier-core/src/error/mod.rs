//! Error codes, resolver errors, and the mapping onto caller-visible shapes.
//!
//! Every call settles to either a value or an [`ErrorShape`]. The shape always
//! carries one of the five stable [`ErrorCode`]s together with the
//! [`FailureKind`] that produced it, so transports can label failures without
//! inspecting messages.
//!
//! Resolvers signal intentional failures through [`ProcedureError::Domain`],
//! whose code passes through unchanged. Anything else is an
//! [`ProcedureError::Unexpected`] failure: its detail is logged here and the
//! caller only ever sees [`INTERNAL_FAILURE_MESSAGE`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::procedure::ProcedureKind;
use crate::schema::ValidationFailure;

/// Tracing target for error mapping.
pub(crate) const ERROR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::error");

/// Message returned for every unexpected failure.
pub const INTERNAL_FAILURE_MESSAGE: &str = "internal server error";

/// Message returned when an unexpected failure occurs while building context.
pub const CONTEXT_FAILURE_MESSAGE: &str = "failed to create request context";

/// Stable error codes crossing the dispatch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The call was malformed or its input violated the declared shape.
    BadRequest,
    /// The caller is not authenticated.
    Unauthorized,
    /// The caller is authenticated but not allowed to perform the call.
    Forbidden,
    /// The requested procedure does not exist.
    NotFound,
    /// The call failed for a reason the caller cannot act on.
    InternalServerError,
}

impl ErrorCode {
    /// All codes, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::BadRequest,
        Self::Unauthorized,
        Self::Forbidden,
        Self::NotFound,
        Self::InternalServerError,
    ];

    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Returns the HTTP status an HTTP binding should answer with.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::InternalServerError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown error code: {code}")]
pub struct UnknownErrorCode {
    /// The rejected input.
    pub code: String,
}

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value.trim();
        Self::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(normalised))
            .ok_or_else(|| UnknownErrorCode {
                code: value.to_owned(),
            })
    }
}

/// Failure raised by a resolver or a context factory.
#[derive(Debug, Error)]
pub enum ProcedureError {
    /// Intentional failure carrying a code chosen by business logic.
    #[error("{code}: {message}")]
    Domain {
        /// Code passed through to the caller unchanged.
        code: ErrorCode,
        /// Caller-visible message.
        message: String,
    },

    /// Any other failure. The detail is logged but never shown to callers.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ProcedureError {
    /// Creates a domain error with an explicit code.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Domain {
            code,
            message: message.into(),
        }
    }

    /// Creates a `BAD_REQUEST` domain error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Creates an `UNAUTHORIZED` domain error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Creates a `FORBIDDEN` domain error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Creates a `NOT_FOUND` domain error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Wraps an arbitrary failure as an unexpected error.
    #[must_use]
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected(source.into())
    }

    /// Returns the code this error maps to.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Domain { code, .. } => *code,
            Self::Unexpected(_) => ErrorCode::InternalServerError,
        }
    }
}

/// The stage of the pipeline, or the collaborator, that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The transport could not decode the call.
    MalformedCall,
    /// No procedure is registered at the requested path.
    NotFound,
    /// The call named a query as a mutation, or the reverse.
    KindMismatch,
    /// The raw input violated the declared schema.
    Validation,
    /// The context factory failed before any resolver ran.
    ContextCreation,
    /// The resolver raised a structured domain error.
    Domain,
    /// The resolver failed in an unexpected way, including panics.
    Unexpected,
    /// The call did not settle within the configured time budget.
    TimedOut,
    /// The call was cancelled before it settled.
    Cancelled,
}

impl FailureKind {
    /// Returns the canonical wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedCall => "malformed_call",
            Self::NotFound => "not_found",
            Self::KindMismatch => "kind_mismatch",
            Self::Validation => "validation",
            Self::ContextCreation => "context_creation",
            Self::Domain => "domain",
            Self::Unexpected => "unexpected",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Caller-visible description of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorShape {
    /// Stable error code.
    pub code: ErrorCode,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable message; generic for unexpected failures.
    pub message: String,
    /// Procedure path of the failed call, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Offending field for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<ValidationFailure>,
}

impl ErrorShape {
    /// Creates a shape without path or issue detail.
    #[must_use]
    pub fn new(code: ErrorCode, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            code,
            kind,
            message: message.into(),
            path: None,
            issue: None,
        }
    }

    /// Attaches the procedure path of the failed call.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Shape for a call the transport could not decode.
    #[must_use]
    pub fn malformed_call(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, FailureKind::MalformedCall, message)
    }

    /// Shape for an unknown procedure path.
    #[must_use]
    pub fn not_found(path: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            FailureKind::NotFound,
            format!("no procedure registered at '{path}'"),
        )
        .with_path(path)
    }

    /// Shape for a query invoked as a mutation, or the reverse.
    #[must_use]
    pub fn kind_mismatch(path: &str, declared: ProcedureKind, requested: ProcedureKind) -> Self {
        Self::new(
            ErrorCode::BadRequest,
            FailureKind::KindMismatch,
            format!("'{path}' is a {declared}, not a {requested}"),
        )
        .with_path(path)
    }

    /// Shape for input that violated the declared schema.
    #[must_use]
    pub fn validation(path: &str, failure: ValidationFailure) -> Self {
        let mut shape = Self::new(
            ErrorCode::BadRequest,
            FailureKind::Validation,
            format!("invalid input: {failure}"),
        )
        .with_path(path);
        shape.issue = Some(failure);
        shape
    }

    /// Shape for a call that exceeded its time budget.
    #[must_use]
    pub fn timed_out(path: &str, limit: Duration) -> Self {
        Self::new(
            ErrorCode::InternalServerError,
            FailureKind::TimedOut,
            format!("call did not settle within {}ms", limit.as_millis()),
        )
        .with_path(path)
    }

    /// Shape for a context factory that exceeded the time budget. The kind
    /// stays [`FailureKind::ContextCreation`] so callers can tell it apart from
    /// a resolver timeout.
    #[must_use]
    pub fn context_timed_out(path: &str, limit: Duration) -> Self {
        Self::new(
            ErrorCode::InternalServerError,
            FailureKind::ContextCreation,
            format!("context was not created within {}ms", limit.as_millis()),
        )
        .with_path(path)
    }

    /// Shape for a call cancelled before it settled.
    #[must_use]
    pub fn cancelled(path: &str) -> Self {
        Self::new(
            ErrorCode::InternalServerError,
            FailureKind::Cancelled,
            "call was cancelled before it settled",
        )
        .with_path(path)
    }

    /// Shape for a resolver that panicked.
    #[must_use]
    pub fn panicked(path: &str) -> Self {
        error!(
            target: ERROR_TARGET,
            path,
            "resolver panicked"
        );
        Self::new(
            ErrorCode::InternalServerError,
            FailureKind::Unexpected,
            INTERNAL_FAILURE_MESSAGE,
        )
        .with_path(path)
    }

    /// Shape for a failed context factory.
    ///
    /// Domain errors keep their declared code; anything else collapses to
    /// `INTERNAL_SERVER_ERROR` with a generic message.
    #[must_use]
    pub fn context_creation(error: ProcedureError) -> Self {
        match error {
            ProcedureError::Domain { code, message } => {
                Self::new(code, FailureKind::ContextCreation, message)
            }
            ProcedureError::Unexpected(source) => {
                error!(
                    target: ERROR_TARGET,
                    error = %source,
                    detail = ?source,
                    "context creation failed"
                );
                Self::new(
                    ErrorCode::InternalServerError,
                    FailureKind::ContextCreation,
                    CONTEXT_FAILURE_MESSAGE,
                )
            }
        }
    }
}

impl fmt::Display for ErrorShape {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} ({}): {}", self.code, self.kind, self.message)
    }
}

/// Maps a resolver failure onto the caller-visible shape.
///
/// Structured domain errors pass their code and message through. Unexpected
/// failures are logged with full detail and reduced to
/// [`INTERNAL_FAILURE_MESSAGE`].
#[must_use]
pub fn map_error(error: ProcedureError) -> ErrorShape {
    match error {
        ProcedureError::Domain { code, message } => {
            ErrorShape::new(code, FailureKind::Domain, message)
        }
        ProcedureError::Unexpected(source) => {
            error!(
                target: ERROR_TARGET,
                error = %source,
                detail = ?source,
                "resolver failed unexpectedly"
            );
            ErrorShape::new(
                ErrorCode::InternalServerError,
                FailureKind::Unexpected,
                INTERNAL_FAILURE_MESSAGE,
            )
        }
    }
}
