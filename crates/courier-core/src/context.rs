//! Per-call context construction.
//!
//! Transports hand each incoming request to a [`ContextFactory`], which
//! produces the value every resolver for that call receives. The factory runs
//! once per call; a failing factory aborts the call before any procedure is
//! looked up.

use std::future::Future;
use std::marker::PhantomData;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::ProcedureError;

/// Builds the context for a single call from transport request data.
pub trait ContextFactory<R>: Send + Sync {
    /// Context passed to resolvers.
    type Context: Send + Sync + 'static;

    /// Creates the context for one call.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcedureError`]. Domain errors are reported to the caller
    /// with their code; unexpected errors are reported as internal failures.
    fn create_context(&self, request: R) -> BoxFuture<'_, Result<Self::Context, ProcedureError>>;
}

/// [`ContextFactory`] backed by a closure.
///
/// Created by [`context_fn`].
pub struct FnContextFactory<F, R> {
    factory: F,
    request: PhantomData<fn(R)>,
}

/// Wraps a closure returning a future into a [`ContextFactory`].
///
/// ```
/// use courier_core::context_fn;
///
/// let factory = context_fn(|token: Option<String>| async move {
///     Ok(token.filter(|value| value == "secret").map(|_| "alex"))
/// });
/// # let _ = &factory;
/// ```
pub fn context_fn<F, R, Fut, T>(factory: F) -> FnContextFactory<F, R>
where
    F: Fn(R) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ProcedureError>> + Send + 'static,
    T: Send + Sync + 'static,
{
    FnContextFactory {
        factory,
        request: PhantomData,
    }
}

impl<F, R, Fut, T> ContextFactory<R> for FnContextFactory<F, R>
where
    F: Fn(R) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, ProcedureError>> + Send + 'static,
    T: Send + Sync + 'static,
{
    type Context = T;

    fn create_context(&self, request: R) -> BoxFuture<'_, Result<T, ProcedureError>> {
        (self.factory)(request).boxed()
    }
}
