//! Call dispatch.
//!
//! A call moves through a fixed pipeline: the path is looked up in the merged
//! router, the procedure kind is checked, the raw input is validated against
//! the declared schema, and only then is the resolver invoked. Lookup, kind
//! and validation failures settle the call before any resolver code runs.
//! Context creation and resolution are the only steps that suspend. Both are
//! bounded by the optional timeout and by the caller's cancellation future, and
//! a panic in either settles the call as an internal failure. Every path
//! through the pipeline ends in a [`ResultEnvelope`].

use std::future::{self, Future};
use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use futures::FutureExt;
use serde_json::Value;
use tracing::debug;

use crate::context::ContextFactory;
use crate::envelope::{CallEnvelope, ResultEnvelope};
use crate::error::{ErrorShape, ProcedureError, map_error};
use crate::merge::MergedRouter;
use crate::procedure::{Procedure, ProcedureKind};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Tunables for a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Upper bound on context creation and on resolution. `None` waits
    /// indefinitely.
    pub resolve_timeout: Option<Duration>,
}

impl DispatchOptions {
    /// Sets the resolve timeout.
    #[must_use]
    pub const fn with_resolve_timeout(mut self, limit: Duration) -> Self {
        self.resolve_timeout = Some(limit);
        self
    }
}

/// Dispatches calls against an immutable [`MergedRouter`].
///
/// The router is shared behind an [`Arc`], so clones are cheap and concurrent
/// calls read it without locking.
pub struct Dispatcher<C> {
    router: Arc<MergedRouter<C>>,
    options: DispatchOptions,
}

impl<C> Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    /// Creates a dispatcher with default options.
    #[must_use]
    pub fn new(router: MergedRouter<C>) -> Self {
        Self::with_options(router, DispatchOptions::default())
    }

    /// Creates a dispatcher with explicit options.
    #[must_use]
    pub fn with_options(router: MergedRouter<C>, options: DispatchOptions) -> Self {
        Self {
            router: Arc::new(router),
            options,
        }
    }

    /// Returns the router calls are dispatched against.
    #[must_use]
    pub fn router(&self) -> &MergedRouter<C> {
        &self.router
    }

    /// Returns the configured options.
    #[must_use]
    pub const fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Dispatches a call with an already created context.
    pub async fn dispatch(&self, call: CallEnvelope, context: Arc<C>) -> ResultEnvelope {
        self.dispatch_until(call, context, future::pending()).await
    }

    /// Dispatches a call, settling to a cancellation error if `cancel`
    /// completes before the resolver does.
    pub async fn dispatch_until<F>(
        &self,
        call: CallEnvelope,
        context: Arc<C>,
        cancel: F,
    ) -> ResultEnvelope
    where
        F: Future<Output = ()>,
    {
        run(&self.router, call, context, self.options.resolve_timeout, cancel)
            .await
            .into()
    }

    /// Builds the call context with `factory`, then dispatches the call.
    ///
    /// A failing factory settles the call before the path is looked up.
    pub async fn dispatch_with<R, F>(
        &self,
        factory: &F,
        request: R,
        call: CallEnvelope,
    ) -> ResultEnvelope
    where
        F: ContextFactory<R, Context = C> + ?Sized,
    {
        self.dispatch_with_until(factory, request, call, future::pending())
            .await
    }

    /// Builds the call context with `factory`, then dispatches the call.
    ///
    /// `cancel` is raced against the factory and then against the resolver.
    /// If it completes first, the call settles as cancelled and no later step
    /// runs.
    pub async fn dispatch_with_until<R, F, X>(
        &self,
        factory: &F,
        request: R,
        call: CallEnvelope,
        cancel: X,
    ) -> ResultEnvelope
    where
        F: ContextFactory<R, Context = C> + ?Sized,
        X: Future<Output = ()>,
    {
        let mut cancel = pin!(cancel);
        let created = tokio::select! {
            biased;
            () = cancel.as_mut() => {
                debug!(
                    target: DISPATCH_TARGET,
                    path = call.path.as_str(),
                    "cancelled before context creation"
                );
                return ResultEnvelope::err(ErrorShape::cancelled(&call.path));
            }
            created = self.create_context(factory, request, &call.path) => created,
        };
        match created {
            Ok(context) => self.dispatch_until(call, Arc::new(context), cancel).await,
            Err(error) => ResultEnvelope::err(error),
        }
    }

    async fn create_context<R, F>(
        &self,
        factory: &F,
        request: R,
        path: &str,
    ) -> Result<C, ErrorShape>
    where
        F: ContextFactory<R, Context = C> + ?Sized,
    {
        let creating =
            AssertUnwindSafe(async move { factory.create_context(request).await }).catch_unwind();
        let settled = match self.options.resolve_timeout {
            Some(limit) => tokio::time::timeout(limit, creating).await.map_err(|_| {
                debug!(target: DISPATCH_TARGET, path, "context creation timed out");
                ErrorShape::context_timed_out(path, limit)
            })?,
            None => creating.await,
        };
        match settled {
            Ok(Ok(context)) => Ok(context),
            Ok(Err(error)) => {
                debug!(
                    target: DISPATCH_TARGET,
                    path,
                    code = %error.code(),
                    "context creation failed"
                );
                Err(ErrorShape::context_creation(error).with_path(path))
            }
            Err(_) => {
                let error = ProcedureError::unexpected(anyhow!("context factory panicked"));
                Err(ErrorShape::context_creation(error).with_path(path))
            }
        }
    }
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            options: self.options,
        }
    }
}

impl<C> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("options", &self.options)
            .finish()
    }
}

/// Dispatches a single call against `router` without a timeout.
pub async fn dispatch<C>(
    router: &MergedRouter<C>,
    call: CallEnvelope,
    context: Arc<C>,
) -> ResultEnvelope {
    run(router, call, context, None, future::pending()).await.into()
}

async fn run<C, F>(
    router: &MergedRouter<C>,
    call: CallEnvelope,
    context: Arc<C>,
    timeout: Option<Duration>,
    cancel: F,
) -> Result<Value, ErrorShape>
where
    F: Future<Output = ()>,
{
    let CallEnvelope { path, kind, input } = call;
    debug!(
        target: DISPATCH_TARGET,
        path = path.as_str(),
        kind = %kind,
        "dispatching call"
    );
    let (procedure, input) = prepare(router, &path, kind, input)?;
    let outcome = resolve(procedure, &path, context, input, timeout, cancel).await;
    match &outcome {
        Ok(_) => debug!(target: DISPATCH_TARGET, path = path.as_str(), "call settled"),
        Err(error) => debug!(
            target: DISPATCH_TARGET,
            path = path.as_str(),
            code = %error.code,
            kind = %error.kind,
            "call failed"
        ),
    }
    outcome
}

/// Runs the steps that settle a call before any resolver code executes.
fn prepare<'r, C>(
    router: &'r MergedRouter<C>,
    path: &str,
    kind: ProcedureKind,
    input: Value,
) -> Result<(&'r Procedure<C>, Value), ErrorShape> {
    let Some(procedure) = router.get(path) else {
        debug!(target: DISPATCH_TARGET, path, "procedure not found");
        return Err(ErrorShape::not_found(path));
    };

    if procedure.kind() != kind {
        debug!(
            target: DISPATCH_TARGET,
            path,
            declared = %procedure.kind(),
            requested = %kind,
            "procedure kind mismatch"
        );
        return Err(ErrorShape::kind_mismatch(path, procedure.kind(), kind));
    }

    let Some(schema) = procedure.input_schema() else {
        return Ok((procedure, input));
    };
    let validated = schema.validate(&input).map_err(|failure| {
        debug!(
            target: DISPATCH_TARGET,
            path,
            field = %failure.path,
            reason = failure.reason.as_str(),
            "input rejected"
        );
        ErrorShape::validation(path, failure)
    })?;
    Ok((procedure, validated))
}

async fn resolve<C, F>(
    procedure: &Procedure<C>,
    path: &str,
    context: Arc<C>,
    input: Value,
    timeout: Option<Duration>,
    cancel: F,
) -> Result<Value, ErrorShape>
where
    F: Future<Output = ()>,
{
    // The resolver is only invoked once `bounded` is polled, after `cancel`.
    let guarded = AssertUnwindSafe(async move { procedure.invoke(context, input).await })
        .catch_unwind();
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| ErrorShape::timed_out(path, limit)),
            None => Ok(guarded.await),
        }
    };

    let settled = tokio::select! {
        biased;
        () = cancel => Err(ErrorShape::cancelled(path)),
        settled = bounded => settled,
    };

    match settled? {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(map_error(error).with_path(path)),
        Err(_) => Err(ErrorShape::panicked(path)),
    }
}

#[cfg(test)]
mod tests;
