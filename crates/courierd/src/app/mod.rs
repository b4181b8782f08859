//! The posts and messages application served by the daemon.
//!
//! Three routers are merged into one call surface:
//!
//! | path             | kind     | input             |
//! |------------------|----------|-------------------|
//! | `posts.list`     | query    | none              |
//! | `posts.create`   | mutation | `{title: string}` |
//! | `messages.list`  | query    | none              |
//! | `messages.add`   | mutation | `string`          |
//! | `hello`          | query    | optional `string` |
//! | `secret`         | query    | none              |
//!
//! The store and the notifier are built once and shared by every call through
//! [`AppContext`].

mod auth;
mod context;
mod routers;
mod store;

use std::sync::Arc;

use courier_core::{
    CallEnvelope, DispatchOptions, Dispatcher, MergeError, Notifier, ResultEnvelope, RouterError,
    merge_routers,
};
use thiserror::Error;
use tracing::info;

pub use self::auth::{Authenticator, StaticTokenAuthenticator, User};
pub use self::context::{AUTHORIZATION_HEADER, AppContext, AppContextFactory, RequestMeta};
pub use self::routers::{greeting_router, messages_router, posts_router};
pub use self::store::{Message, Post, Store};

/// Event emitted after `messages.add` stores a message.
pub const NEW_MESSAGE_EVENT: &str = "newMessage";

const APP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::app");

/// Errors raised while assembling the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// A router was declared inconsistently.
    #[error("invalid router: {0}")]
    Router(#[from] RouterError),
    /// Two routers define the same procedure path.
    #[error("failed to merge routers: {0}")]
    Merge(#[from] MergeError),
}

/// The assembled application: merged routers plus shared state.
#[derive(Debug)]
pub struct App {
    dispatcher: Dispatcher<AppContext>,
    factory: AppContextFactory,
    store: Arc<Store>,
    notifier: Arc<Notifier<Message>>,
}

impl App {
    /// Builds the application around a seeded store.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the routers cannot be merged.
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        options: DispatchOptions,
    ) -> Result<Self, AppError> {
        Self::with_store(authenticator, options, Arc::new(Store::seeded()))
    }

    /// Builds the application around an existing store.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the routers cannot be merged.
    pub fn with_store(
        authenticator: Arc<dyn Authenticator>,
        options: DispatchOptions,
        store: Arc<Store>,
    ) -> Result<Self, AppError> {
        let router = merge_routers([posts_router()?, messages_router()?, greeting_router()?])?;
        let notifier = Arc::new(Notifier::new());
        notifier.subscribe(NEW_MESSAGE_EVENT, |message: &Message| {
            info!(
                target: APP_TARGET,
                id = message.id,
                text = message.text.as_str(),
                "new message"
            );
        });
        info!(
            target: APP_TARGET,
            procedures = router.len(),
            "application routers merged"
        );
        let factory =
            AppContextFactory::new(authenticator, Arc::clone(&store), Arc::clone(&notifier));
        Ok(Self {
            dispatcher: Dispatcher::with_options(router, options),
            factory,
            store,
            notifier,
        })
    }

    /// Builds the context for `request` and dispatches `call`.
    pub async fn call(&self, request: RequestMeta, call: CallEnvelope) -> ResultEnvelope {
        self.dispatcher
            .dispatch_with(&self.factory, request, call)
            .await
    }

    /// Returns the dispatcher serving the merged routers.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher<AppContext> {
        &self.dispatcher
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the notifier carrying `newMessage` events.
    #[must_use]
    pub fn notifier(&self) -> &Notifier<Message> {
        &self.notifier
    }
}
