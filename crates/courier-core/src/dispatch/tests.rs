//! Unit tests for the dispatch pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tokio::sync::oneshot;

use super::*;
use crate::context::context_fn;
use crate::error::{
    CONTEXT_FAILURE_MESSAGE, ErrorCode, FailureKind, INTERNAL_FAILURE_MESSAGE, ProcedureError,
};
use crate::merge::merge_routers;
use crate::router::Router;
use crate::schema::{FieldPath, Schema};

/// Context recording which resolvers ran against it.
#[derive(Debug, Default)]
struct Witness {
    label: String,
    calls: AtomicUsize,
    seen: Mutex<Vec<Value>>,
}

impl Witness {
    fn labelled(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_owned(),
            ..Self::default()
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

type Recorder = fn(Arc<Witness>, Value) -> futures::future::Ready<Result<Value, ProcedureError>>;

fn recording() -> Recorder {
    |ctx, input| {
        ctx.calls.fetch_add(1, Ordering::SeqCst);
        ctx.seen.lock().expect("seen lock").push(input.clone());
        futures::future::ready(Ok(input))
    }
}

fn explode() -> Result<Value, ProcedureError> {
    panic!("resolver exploded");
}

fn exploding_factory((): ()) -> futures::future::Ready<Result<Witness, ProcedureError>> {
    panic!("auth backend exploded");
}

#[fixture]
fn dispatcher() -> Dispatcher<Witness> {
    let posts = Router::named("posts")
        .and_then(|router| router.query("list", Procedure::query().resolve(recording())))
        .and_then(|router| {
            router.mutation(
                "create",
                Procedure::mutation()
                    .input(Schema::object().field("title", Schema::String))
                    .resolve(recording()),
            )
        })
        .expect("posts router");
    let failures = Router::named("fail")
        .and_then(|router| {
            router.query(
                "unauthorized",
                Procedure::query().resolve(|_ctx, _input| async {
                    Err(ProcedureError::unauthorized("sign in first"))
                }),
            )
        })
        .and_then(|router| {
            router.query(
                "unexpected",
                Procedure::query().resolve(|_ctx, _input| async {
                    Err(ProcedureError::unexpected(anyhow::anyhow!(
                        "connection string postgres://admin:hunter2@db"
                    )))
                }),
            )
        })
        .and_then(|router| {
            router.query(
                "panics",
                Procedure::query().resolve(|_ctx, _input| async { explode() }),
            )
        })
        .and_then(|router| {
            router.query(
                "slow",
                Procedure::query().resolve(|_ctx, _input| async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(Value::Null)
                }),
            )
        })
        .expect("failure router");
    let merged = merge_routers([posts, failures]).expect("merge");
    Dispatcher::with_options(
        merged,
        DispatchOptions::default().with_resolve_timeout(Duration::from_millis(50)),
    )
}

#[rstest]
#[tokio::test]
async fn unknown_path_is_not_found(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(CallEnvelope::mutation("posts.delete", json!({"id": 1})), Arc::clone(&witness))
        .await;

    assert_eq!(result.code(), Some(ErrorCode::NotFound));
    assert_eq!(
        result.error().and_then(|error| error.path.as_deref()),
        Some("posts.delete")
    );
    assert_eq!(witness.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn kind_mismatch_is_bad_request(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(CallEnvelope::query("posts.create", json!({"title": "x"})), Arc::clone(&witness))
        .await;

    let error = result.error().expect("kind mismatch");
    assert_eq!(error.code, ErrorCode::BadRequest);
    assert_eq!(error.kind, FailureKind::KindMismatch);
    assert_eq!(witness.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn missing_required_field_never_reaches_resolver(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(CallEnvelope::mutation("posts.create", json!({})), Arc::clone(&witness))
        .await;

    let error = result.error().expect("validation failure");
    assert_eq!(error.code, ErrorCode::BadRequest);
    assert_eq!(error.kind, FailureKind::Validation);
    let issue = error.issue.as_ref().expect("issue detail");
    assert_eq!(issue.path, FieldPath::root().key("title"));
    assert_eq!(witness.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn validated_input_strips_undeclared_fields(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(
            CallEnvelope::mutation("posts.create", json!({"title": "hello", "id": 42})),
            Arc::clone(&witness),
        )
        .await;

    assert_eq!(result.value(), Some(&json!({"title": "hello"})));
    assert_eq!(witness.calls(), 1);
}

#[rstest]
#[case::null(Value::Null)]
#[case::string(json!("anything"))]
#[case::object(json!({"nested": [1, 2, {"deep": true}]}))]
#[tokio::test]
async fn input_without_schema_passes_through(
    dispatcher: Dispatcher<Witness>,
    #[case] input: Value,
) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(CallEnvelope::query("posts.list", input.clone()), Arc::clone(&witness))
        .await;

    assert_eq!(result.value(), Some(&input));
    assert_eq!(*witness.seen.lock().expect("seen lock"), vec![input]);
}

#[rstest]
#[tokio::test]
async fn resolver_receives_the_same_context_instance(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch(CallEnvelope::query("posts.list", json!(1)), Arc::clone(&witness))
        .await;

    assert!(result.is_ok());
    assert_eq!(witness.calls(), 1);
}

#[tokio::test]
async fn concurrent_calls_keep_their_own_context() {
    let router = Router::new()
        .query(
            "whoami",
            Procedure::query().resolve(|ctx: Arc<Witness>, _input| async move {
                tokio::task::yield_now().await;
                Ok(json!(ctx.label))
            }),
        )
        .expect("router");
    let dispatcher = Dispatcher::new(merge_routers([router]).expect("merge"));

    let (first, second) = tokio::join!(
        dispatcher.dispatch(CallEnvelope::query("whoami", Value::Null), Witness::labelled("a")),
        dispatcher.dispatch(CallEnvelope::query("whoami", Value::Null), Witness::labelled("b")),
    );
    assert_eq!(first.value(), Some(&json!("a")));
    assert_eq!(second.value(), Some(&json!("b")));
}

#[rstest]
#[tokio::test]
async fn domain_error_code_passes_through(dispatcher: Dispatcher<Witness>) {
    let result = dispatcher
        .dispatch(CallEnvelope::query("fail.unauthorized", Value::Null), Witness::labelled("a"))
        .await;

    let error = result.error().expect("domain error");
    assert_eq!(error.code, ErrorCode::Unauthorized);
    assert_eq!(error.kind, FailureKind::Domain);
    assert_eq!(error.message, "sign in first");
    assert_eq!(error.path.as_deref(), Some("fail.unauthorized"));
}

#[rstest]
#[tokio::test]
async fn unexpected_error_is_generic(dispatcher: Dispatcher<Witness>) {
    let result = dispatcher
        .dispatch(CallEnvelope::query("fail.unexpected", Value::Null), Witness::labelled("a"))
        .await;

    let error = result.error().expect("unexpected error");
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert_eq!(error.kind, FailureKind::Unexpected);
    assert_eq!(error.message, INTERNAL_FAILURE_MESSAGE);
    let rendered = serde_json::to_string(&result).expect("serialise");
    assert!(!rendered.contains("hunter2"));
}

#[rstest]
#[tokio::test]
async fn panicking_resolver_settles_as_internal_error(dispatcher: Dispatcher<Witness>) {
    let result = dispatcher
        .dispatch(CallEnvelope::query("fail.panics", Value::Null), Witness::labelled("a"))
        .await;

    let error = result.error().expect("panic settles");
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert_eq!(error.message, INTERNAL_FAILURE_MESSAGE);
}

#[rstest]
#[tokio::test]
async fn slow_resolver_times_out(dispatcher: Dispatcher<Witness>) {
    let result = dispatcher
        .dispatch(CallEnvelope::query("fail.slow", Value::Null), Witness::labelled("a"))
        .await;

    let error = result.error().expect("timeout");
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert_eq!(error.kind, FailureKind::TimedOut);
}

#[rstest]
#[tokio::test]
async fn cancellation_settles_before_resolving(dispatcher: Dispatcher<Witness>) {
    let witness = Witness::labelled("a");
    let result = dispatcher
        .dispatch_until(
            CallEnvelope::query("posts.list", Value::Null),
            Arc::clone(&witness),
            async {},
        )
        .await;

    let error = result.error().expect("cancelled");
    assert_eq!(error.kind, FailureKind::Cancelled);
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert!(witness.seen.lock().expect("seen lock").is_empty());
}

#[rstest]
#[tokio::test]
async fn context_factory_output_reaches_resolver(dispatcher: Dispatcher<Witness>) {
    let factory = context_fn(|label: &'static str| async move {
        Ok(Witness {
            label: label.to_owned(),
            ..Witness::default()
        })
    });
    let result = dispatcher
        .dispatch_with(&factory, "a", CallEnvelope::query("posts.list", json!("x")))
        .await;
    assert_eq!(result.value(), Some(&json!("x")));
}

#[rstest]
#[case::domain(ProcedureError::forbidden("banned"), ErrorCode::Forbidden, "banned")]
#[case::unexpected(
    ProcedureError::unexpected(anyhow::anyhow!("auth backend down")),
    ErrorCode::InternalServerError,
    CONTEXT_FAILURE_MESSAGE
)]
#[tokio::test]
async fn context_factory_failure_stops_the_call(
    dispatcher: Dispatcher<Witness>,
    #[case] failure: ProcedureError,
    #[case] code: ErrorCode,
    #[case] message: &str,
) {
    let failure = Mutex::new(Some(failure));
    let factory = context_fn(|(): ()| {
        let taken = failure.lock().expect("failure lock").take();
        let error = taken.unwrap_or_else(|| ProcedureError::bad_request("reused"));
        async move { Err::<Witness, _>(error) }
    });
    let result = dispatcher
        .dispatch_with(&factory, (), CallEnvelope::query("posts.delete", Value::Null))
        .await;

    let error = result.error().expect("context failure");
    assert_eq!(error.kind, FailureKind::ContextCreation);
    assert_eq!(error.code, code);
    assert_eq!(error.message, message);
}

#[rstest]
#[tokio::test]
async fn panicking_context_factory_settles_as_context_failure(dispatcher: Dispatcher<Witness>) {
    let factory = context_fn(exploding_factory);
    let result = dispatcher
        .dispatch_with(&factory, (), CallEnvelope::query("posts.list", Value::Null))
        .await;

    let error = result.error().expect("context failure");
    assert_eq!(error.kind, FailureKind::ContextCreation);
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert_eq!(error.message, CONTEXT_FAILURE_MESSAGE);
    assert_eq!(error.path.as_deref(), Some("posts.list"));
}

#[rstest]
#[tokio::test]
async fn slow_context_factory_times_out_as_context_failure(dispatcher: Dispatcher<Witness>) {
    let factory = context_fn(|(): ()| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Witness::default())
    });
    let result = dispatcher
        .dispatch_with(&factory, (), CallEnvelope::query("posts.list", Value::Null))
        .await;

    let error = result.error().expect("context timeout");
    assert_eq!(error.kind, FailureKind::ContextCreation);
    assert_eq!(error.code, ErrorCode::InternalServerError);
    assert_eq!(error.message, "context was not created within 50ms");
}

#[rstest]
#[tokio::test]
async fn cancellation_settles_before_creating_context(dispatcher: Dispatcher<Witness>) {
    let created = AtomicUsize::new(0);
    let factory = context_fn(|(): ()| {
        created.fetch_add(1, Ordering::SeqCst);
        async { Ok(Witness::default()) }
    });
    let result = dispatcher
        .dispatch_with_until(
            &factory,
            (),
            CallEnvelope::mutation("posts.create", json!({"title": "draft"})),
            async {},
        )
        .await;

    let error = result.error().expect("cancelled");
    assert_eq!(error.kind, FailureKind::Cancelled);
    assert_eq!(error.path.as_deref(), Some("posts.create"));
    assert_eq!(created.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn cancellation_after_context_creation_skips_the_resolver(dispatcher: Dispatcher<Witness>) {
    let (signal, cancelled) = oneshot::channel::<()>();
    let factory = context_fn(|signal: oneshot::Sender<()>| {
        signal.send(()).expect("cancel receiver alive");
        async { Ok(Witness::default()) }
    });
    let result = dispatcher
        .dispatch_with_until(
            &factory,
            signal,
            CallEnvelope::query("posts.list", json!("unseen")),
            async {
                cancelled.await.expect("cancel signal");
            },
        )
        .await;

    let error = result.error().expect("cancelled");
    assert_eq!(error.kind, FailureKind::Cancelled);
    assert_eq!(error.path.as_deref(), Some("posts.list"));
}

#[rstest]
#[tokio::test]
async fn free_function_dispatches_without_timeout(dispatcher: Dispatcher<Witness>) {
    let result = dispatch(
        dispatcher.router(),
        CallEnvelope::query("posts.list", json!([1])),
        Witness::labelled("a"),
    )
    .await;
    assert_eq!(result.value(), Some(&json!([1])));
}
