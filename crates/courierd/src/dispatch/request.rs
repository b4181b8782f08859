//! Request parsing for the JSONL binding.

use std::collections::BTreeMap;

use courier_core::{CallEnvelope, ProcedureKind};
use serde::Deserialize;
use serde_json::Value;

use super::errors::DispatchError;
use crate::app::RequestMeta;

/// One call as written by a client.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallRequest {
    /// Qualified procedure path, for example `posts.create`.
    pub path: String,
    /// Whether the client expects a query or a mutation.
    pub kind: ProcedureKind,
    /// Raw input; `null` when omitted.
    #[serde(default)]
    pub input: Value,
    /// Transport headers such as `authorization`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CallRequest {
    /// Parses a request line. Trailing whitespace, including the newline
    /// delimiter, is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedJsonl`] for an empty line or a line
    /// that is not a call.
    pub fn parse(line: &[u8]) -> Result<Self, DispatchError> {
        let trimmed = line.trim_ascii_end();
        if trimmed.is_empty() {
            return Err(DispatchError::malformed("empty request line"));
        }
        serde_json::from_slice(trimmed).map_err(DispatchError::from_json_error)
    }

    /// Splits the request into the data used to build the call context and
    /// the call itself.
    #[must_use]
    pub fn into_parts(self) -> (RequestMeta, CallEnvelope) {
        let Self {
            path,
            kind,
            input,
            headers,
        } = self;
        (
            RequestMeta::new(headers),
            CallEnvelope::new(path, kind, input),
        )
    }
}
