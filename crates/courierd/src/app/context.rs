//! Per-call context for the application procedures.

use std::collections::BTreeMap;
use std::sync::Arc;

use courier_core::{ContextFactory, Notifier, ProcedureError};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::auth::{Authenticator, User};
use super::store::{Message, Store};

/// Header carrying the caller's token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Transport data describing one incoming call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
    headers: BTreeMap<String, String>,
}

impl RequestMeta {
    /// Builds request metadata. Header names are matched case-insensitively.
    #[must_use]
    pub fn new(headers: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
        }
    }

    /// Shorthand for a request carrying only an authorisation token.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new([(String::from(AUTHORIZATION_HEADER), token.into())])
    }

    /// Returns a header value.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the authorisation token, if any.
    #[must_use]
    pub fn authorization(&self) -> Option<&str> {
        self.header(AUTHORIZATION_HEADER)
    }
}

/// Context handed to every application resolver.
#[derive(Debug)]
pub struct AppContext {
    request: RequestMeta,
    user: Option<User>,
    store: Arc<Store>,
    notifier: Arc<Notifier<Message>>,
}

impl AppContext {
    /// Returns the request metadata the context was built from.
    #[must_use]
    pub const fn request(&self) -> &RequestMeta {
        &self.request
    }

    /// Returns the authenticated caller.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the message notifier.
    #[must_use]
    pub fn notifier(&self) -> &Notifier<Message> {
        &self.notifier
    }
}

/// Builds an [`AppContext`] for each call.
#[derive(Clone)]
pub struct AppContextFactory {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<Store>,
    notifier: Arc<Notifier<Message>>,
}

impl AppContextFactory {
    /// Creates a factory sharing the given collaborators between calls.
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        store: Arc<Store>,
        notifier: Arc<Notifier<Message>>,
    ) -> Self {
        Self {
            authenticator,
            store,
            notifier,
        }
    }

    fn build(&self, request: RequestMeta) -> Result<AppContext, ProcedureError> {
        let user = match request.authorization() {
            Some(token) => self.authenticator.authenticate(token)?,
            None => None,
        };
        Ok(AppContext {
            request,
            user,
            store: Arc::clone(&self.store),
            notifier: Arc::clone(&self.notifier),
        })
    }
}

impl ContextFactory<RequestMeta> for AppContextFactory {
    type Context = AppContext;

    fn create_context(
        &self,
        request: RequestMeta,
    ) -> BoxFuture<'_, Result<Self::Context, ProcedureError>> {
        futures::future::ready(self.build(request)).boxed()
    }
}

impl std::fmt::Debug for AppContextFactory {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppContextFactory")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
