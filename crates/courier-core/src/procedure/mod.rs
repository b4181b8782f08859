//! Procedure declarations.
//!
//! A [`Procedure`] bundles a [`ProcedureKind`], an optional input [`Schema`],
//! and exactly one resolver. Procedures are built through
//! [`ProcedureBuilder`], which is consumed by [`ProcedureBuilder::resolve`]:
//! once a resolver is attached there is no builder left to attach a second
//! one to, and an input schema can only be declared once because
//! [`ProcedureBuilder::input`] is only available before a schema is set.
//!
//! ```
//! use courier_core::{Procedure, ProcedureKind, Schema};
//! use serde_json::Value;
//!
//! let create: Procedure<()> = Procedure::mutation()
//!     .input(Schema::object().field("title", Schema::String))
//!     .resolve(|_ctx, input: Value| async move { Ok(input) });
//! assert_eq!(create.kind(), ProcedureKind::Mutation);
//! assert!(create.input_schema().is_some());
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::ProcedureError;
use crate::schema::Schema;

/// Whether a procedure reads or changes state.
///
/// The kind is metadata: the dispatcher checks that calls name the right
/// kind, but it does not enforce read-only behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    /// Read-only operation.
    Query,
    /// State-changing operation.
    Mutation,
}

impl ProcedureKind {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown procedure kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown procedure kind: {kind}")]
pub struct UnknownProcedureKind {
    /// The rejected input.
    pub kind: String,
}

impl FromStr for ProcedureKind {
    type Err = UnknownProcedureKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "mutation" => Ok(Self::Mutation),
            _ => Err(UnknownProcedureKind {
                kind: value.to_owned(),
            }),
        }
    }
}

/// Future returned by a resolver.
pub type ResolveFuture = BoxFuture<'static, Result<Value, ProcedureError>>;

type Resolver<C> = Arc<dyn Fn(Arc<C>, Value) -> ResolveFuture + Send + Sync>;

/// A named operation's kind, input contract, and resolver.
pub struct Procedure<C> {
    kind: ProcedureKind,
    input: Option<Schema>,
    resolver: Resolver<C>,
}

impl<C> Procedure<C> {
    /// Starts declaring a query.
    #[must_use]
    pub fn query() -> ProcedureBuilder<C> {
        ProcedureBuilder::new(ProcedureKind::Query)
    }

    /// Starts declaring a mutation.
    #[must_use]
    pub fn mutation() -> ProcedureBuilder<C> {
        ProcedureBuilder::new(ProcedureKind::Mutation)
    }

    /// Returns the procedure kind.
    #[must_use]
    pub const fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Returns the declared input schema, if any.
    #[must_use]
    pub const fn input_schema(&self) -> Option<&Schema> {
        self.input.as_ref()
    }

    /// Runs the resolver with an already validated input.
    pub(crate) fn invoke(&self, context: Arc<C>, input: Value) -> ResolveFuture {
        (self.resolver)(context, input)
    }
}

impl<C> Clone for Procedure<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            input: self.input.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<C> fmt::Debug for Procedure<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}

/// Marker for a builder without an input schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInput;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::NoInput {}
    impl Sealed for crate::schema::Schema {}
}

/// Input slot of a [`ProcedureBuilder`]: either [`NoInput`] or a [`Schema`].
pub trait InputSlot: sealed::Sealed {
    /// Converts the slot into the optional schema stored on the procedure.
    fn into_schema(self) -> Option<Schema>;
}

impl InputSlot for NoInput {
    fn into_schema(self) -> Option<Schema> {
        None
    }
}

impl InputSlot for Schema {
    fn into_schema(self) -> Option<Schema> {
        Some(self)
    }
}

/// Builder for a [`Procedure`].
#[must_use = "a procedure builder does nothing until a resolver is attached"]
pub struct ProcedureBuilder<C, I = NoInput> {
    kind: ProcedureKind,
    input: I,
    context: PhantomData<fn(Arc<C>)>,
}

impl<C> ProcedureBuilder<C> {
    fn new(kind: ProcedureKind) -> Self {
        Self {
            kind,
            input: NoInput,
            context: PhantomData,
        }
    }

    /// Declares the input schema validated before the resolver runs.
    #[must_use]
    pub fn input(self, schema: impl Into<Schema>) -> ProcedureBuilder<C, Schema> {
        ProcedureBuilder {
            kind: self.kind,
            input: schema.into(),
            context: PhantomData,
        }
    }
}

impl<C, I: InputSlot> ProcedureBuilder<C, I> {
    /// Returns the kind being declared.
    #[must_use]
    pub const fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Attaches the resolver and finishes the declaration.
    ///
    /// The resolver receives the per-call context and the validated input
    /// (or the raw input, when no schema was declared).
    pub fn resolve<F, Fut>(self, resolver: F) -> Procedure<C>
    where
        F: Fn(Arc<C>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
    {
        Procedure {
            kind: self.kind,
            input: self.input.into_schema(),
            resolver: Arc::new(move |context, input| resolver(context, input).boxed()),
        }
    }

    /// Attaches a resolver working on typed input and output.
    ///
    /// The validated input is deserialised into `In`; a mismatch is reported
    /// as a `BAD_REQUEST` domain error without running the resolver. The
    /// resolver's output is serialised back into JSON.
    pub fn resolve_typed<In, Out, F, Fut>(self, resolver: F) -> Procedure<C>
    where
        In: DeserializeOwned + Send + 'static,
        Out: Serialize + Send + 'static,
        F: Fn(Arc<C>, In) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, ProcedureError>> + Send + 'static,
    {
        self.resolve(move |context, raw| {
            let pending = serde_json::from_value::<In>(raw).map(|input| resolver(context, input));
            async move {
                let output = pending
                    .map_err(|error| {
                        ProcedureError::bad_request(format!(
                            "input does not match the expected type: {error}"
                        ))
                    })?
                    .await?;
                serde_json::to_value(output).map_err(ProcedureError::unexpected)
            }
        })
    }
}

impl<C, I: fmt::Debug> fmt::Debug for ProcedureBuilder<C, I> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcedureBuilder")
            .field("kind", &self.kind)
            .field("input", &self.input)
            .finish()
    }
}
