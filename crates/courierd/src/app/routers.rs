//! Application routers.

use std::sync::Arc;

use courier_core::{Procedure, ProcedureError, Router, RouterError, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::NEW_MESSAGE_EVENT;
use super::context::AppContext;
use super::store::{Message, Post};

/// Input accepted by `posts.create`.
#[derive(Debug, Deserialize)]
struct NewPost {
    title: String,
}

/// Output of the `secret` query.
#[derive(Debug, Serialize)]
struct Secret {
    secret: &'static str,
}

/// Builds the `posts` router: `list` and `create`.
///
/// # Errors
///
/// Returns [`RouterError`] if the router is declared inconsistently.
pub fn posts_router() -> Result<Router<AppContext>, RouterError> {
    Router::named("posts")?
        .query(
            "list",
            Procedure::query().resolve(|ctx: Arc<AppContext>, _input| async move {
                to_json(&ctx.store().posts())
            }),
        )?
        .mutation(
            "create",
            Procedure::mutation()
                .input(Schema::object().field("title", Schema::String))
                .resolve_typed(|ctx: Arc<AppContext>, input: NewPost| async move {
                    Ok::<Post, ProcedureError>(ctx.store().add_post(input.title))
                }),
        )
}

/// Builds the `messages` router: `list` and `add`.
///
/// `add` announces the stored message as a `newMessage` event once the write
/// has been committed.
///
/// # Errors
///
/// Returns [`RouterError`] if the router is declared inconsistently.
pub fn messages_router() -> Result<Router<AppContext>, RouterError> {
    Router::named("messages")?
        .query(
            "list",
            Procedure::query().resolve(|ctx: Arc<AppContext>, _input| async move {
                to_json(&ctx.store().messages())
            }),
        )?
        .mutation(
            "add",
            Procedure::mutation().input(Schema::String).resolve_typed(
                |ctx: Arc<AppContext>, text: String| async move {
                    let message = ctx.store().add_message(text);
                    ctx.notifier().emit(NEW_MESSAGE_EVENT, &message);
                    Ok::<Message, ProcedureError>(message)
                },
            ),
        )
}

/// Builds the root router: `hello` and `secret`.
///
/// # Errors
///
/// Returns [`RouterError`] if the router is declared inconsistently.
pub fn greeting_router() -> Result<Router<AppContext>, RouterError> {
    Router::new()
        .query(
            "hello",
            Procedure::query()
                .input(Schema::String.optional())
                .resolve_typed(|ctx: Arc<AppContext>, name: Option<String>| async move {
                    let name = name
                        .or_else(|| ctx.user().map(|user| user.name.clone()))
                        .unwrap_or_else(|| String::from("world"));
                    Ok::<String, ProcedureError>(format!("hello {name}"))
                }),
        )?
        .query(
            "secret",
            Procedure::query().resolve(|ctx: Arc<AppContext>, _input| async move {
                to_json(&reveal_secret(&ctx)?)
            }),
        )
}

fn reveal_secret(ctx: &AppContext) -> Result<Secret, ProcedureError> {
    match ctx.user() {
        None => Err(ProcedureError::unauthorized("sign in to read the secret")),
        Some(user) if user.name != "alex" => Err(ProcedureError::forbidden(format!(
            "{} may not read the secret",
            user.name
        ))),
        Some(_) => Ok(Secret { secret: "sauce" }),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ProcedureError> {
    serde_json::to_value(value).map_err(ProcedureError::unexpected)
}
