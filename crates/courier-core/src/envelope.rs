//! Call and result envelopes exchanged with transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorCode, ErrorShape};
use crate::procedure::ProcedureKind;

/// Normalised representation of an incoming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    /// Qualified procedure path, for example `posts.create`.
    pub path: String,
    /// Kind the caller expects the procedure to have.
    pub kind: ProcedureKind,
    /// Raw, unvalidated input. Defaults to `null` when omitted.
    #[serde(default)]
    pub input: Value,
}

impl CallEnvelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(path: impl Into<String>, kind: ProcedureKind, input: Value) -> Self {
        Self {
            path: path.into(),
            kind,
            input,
        }
    }

    /// Creates a query envelope.
    #[must_use]
    pub fn query(path: impl Into<String>, input: Value) -> Self {
        Self::new(path, ProcedureKind::Query, input)
    }

    /// Creates a mutation envelope.
    #[must_use]
    pub fn mutation(path: impl Into<String>, input: Value) -> Self {
        Self::new(path, ProcedureKind::Mutation, input)
    }
}

/// Outcome of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultEnvelope {
    /// The resolver produced a value.
    Ok {
        /// Resolver output.
        value: Value,
    },
    /// The call failed.
    Err {
        /// Caller-visible failure.
        error: ErrorShape,
    },
}

impl ResultEnvelope {
    /// Wraps a successful value.
    #[must_use]
    pub const fn ok(value: Value) -> Self {
        Self::Ok { value }
    }

    /// Wraps a failure.
    #[must_use]
    pub const fn err(error: ErrorShape) -> Self {
        Self::Err { error }
    }

    /// Returns `true` for a successful outcome.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Returns the error code of a failed outcome.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { error } => Some(error.code),
        }
    }

    /// Returns the value of a successful outcome.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Ok { value } => Some(value),
            Self::Err { .. } => None,
        }
    }

    /// Returns the failure of a failed outcome.
    #[must_use]
    pub const fn error(&self) -> Option<&ErrorShape> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { error } => Some(error),
        }
    }
}

impl From<Result<Value, ErrorShape>> for ResultEnvelope {
    fn from(result: Result<Value, ErrorShape>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::err(error),
        }
    }
}
