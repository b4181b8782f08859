//! Typed procedure routing and dispatch.
//!
//! `courier-core` lets a server declare named operations ("procedures"),
//! group them into routers, merge independently authored routers into one
//! namespace, and dispatch incoming calls against the result. Input is
//! validated against a declared [`Schema`] before any resolver runs, every
//! call receives a context built once per call, and every outcome is
//! normalised into a [`ResultEnvelope`] carrying one of five stable
//! [`ErrorCode`]s.
//!
//! The crate defines no wire format. Transports decode bytes into a
//! [`CallEnvelope`], hand it to a [`Dispatcher`], and encode the returned
//! envelope however they like.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use courier_core::{
//!     CallEnvelope, Dispatcher, ErrorCode, Procedure, Router, Schema, merge_routers,
//! };
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let posts: Router<()> = Router::named("posts")
//!     .and_then(|router| {
//!         router.mutation(
//!             "create",
//!             Procedure::mutation()
//!                 .input(Schema::object().field("title", Schema::String))
//!                 .resolve(|_ctx, input| async move { Ok(input) }),
//!         )
//!     })
//!     .expect("posts router");
//! let dispatcher = Dispatcher::new(merge_routers([posts]).expect("merge"));
//!
//! let created = dispatcher
//!     .dispatch(CallEnvelope::mutation("posts.create", json!({"title": "hello"})), Arc::new(()))
//!     .await;
//! assert_eq!(created.value(), Some(&json!({"title": "hello"})));
//!
//! let rejected = dispatcher
//!     .dispatch(CallEnvelope::mutation("posts.create", json!({})), Arc::new(()))
//!     .await;
//! assert_eq!(rejected.code(), Some(ErrorCode::BadRequest));
//! # }
//! ```

pub mod context;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod events;
pub mod merge;
pub mod procedure;
pub mod router;
pub mod schema;

#[cfg(test)]
mod tests;

pub use self::context::{ContextFactory, FnContextFactory, context_fn};
pub use self::dispatch::{DispatchOptions, Dispatcher, dispatch};
pub use self::envelope::{CallEnvelope, ResultEnvelope};
pub use self::error::{ErrorCode, ErrorShape, FailureKind, ProcedureError, map_error};
pub use self::events::{EmitReport, Notifier, SubscriptionId};
pub use self::merge::{MergeError, MergedRouter, merge_routers};
pub use self::procedure::{Procedure, ProcedureBuilder, ProcedureKind, ResolveFuture};
pub use self::router::{Router, RouterEntry, RouterError};
pub use self::schema::{FieldPath, ObjectSchema, Schema, ValidationFailure};
