//! Crate-level integration and BDD tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rstest::rstest;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    CallEnvelope, Dispatcher, ErrorCode, Notifier, Procedure, Router, Schema, merge_routers,
};


/// Shared state standing in for a business store.
#[derive(Debug, Default)]
struct Board {
    state: Mutex<BoardState>,
    notifier: Notifier<Value>,
}

#[derive(Debug, Default)]
struct BoardState {
    next_id: u64,
    posts: Vec<Value>,
    messages: Vec<Value>,
}

impl Board {
    fn seeded() -> Arc<Self> {
        let board = Self::default();
        board.add_post(String::from("hello"));
        board.add_message(String::from("initial message"));
        Arc::new(board)
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn posts(&self) -> Vec<Value> {
        self.lock().posts.clone()
    }

    fn messages(&self) -> Vec<Value> {
        self.lock().messages.clone()
    }

    fn add_post(&self, title: String) -> Value {
        let mut state = self.lock();
        state.next_id += 1;
        let post = json!({ "id": state.next_id, "title": title });
        state.posts.push(post.clone());
        post
    }

    fn add_message(&self, text: String) -> Value {
        let message = {
            let mut state = self.lock();
            state.next_id += 1;
            let message = json!({ "id": state.next_id, "text": text });
            state.messages.push(message.clone());
            message
        };
        self.notifier.emit("newMessage", &message);
        message
    }
}

/// Per-call context handed to resolvers.
struct CallContext {
    board: Arc<Board>,
}

impl CallContext {
    fn new(board: &Arc<Board>) -> Arc<Self> {
        Arc::new(Self {
            board: Arc::clone(board),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NewPost {
    title: String,
}

fn posts_router() -> Router<CallContext> {
    Router::named("posts")
        .and_then(|router| {
            router.query(
                "list",
                Procedure::query().resolve(|ctx: Arc<CallContext>, _input| async move {
                    Ok(Value::Array(ctx.board.posts()))
                }),
            )
        })
        .and_then(|router| {
            router.mutation(
                "create",
                Procedure::mutation()
                    .input(Schema::object().field("title", Schema::String))
                    .resolve_typed(|ctx: Arc<CallContext>, input: NewPost| async move {
                        Ok(ctx.board.add_post(input.title))
                    }),
            )
        })
        .expect("posts router")
}

fn messages_router() -> Router<CallContext> {
    Router::named("messages")
        .and_then(|router| {
            router.query(
                "list",
                Procedure::query().resolve(|ctx: Arc<CallContext>, _input| async move {
                    Ok(Value::Array(ctx.board.messages()))
                }),
            )
        })
        .and_then(|router| {
            router.mutation(
                "add",
                Procedure::mutation()
                    .input(Schema::String)
                    .resolve_typed(|ctx: Arc<CallContext>, text: String| async move {
                        Ok(ctx.board.add_message(text))
                    }),
            )
        })
        .expect("messages router")
}

fn flat_router(names: &[&str]) -> Router<CallContext> {
    names.iter().fold(Router::new(), |router, name| {
        router
            .query(*name, Procedure::query().resolve(|_ctx, input| async move { Ok(input) }))
            .expect("flat router")
    })
}

#[rstest]
#[case::single(vec![vec!["a"]], 1)]
#[case::two_routers(vec![vec!["a", "b"], vec!["c"]], 3)]
#[case::three_routers(vec![vec!["a"], vec!["b"], vec!["c", "d", "e"]], 5)]
fn disjoint_merge_size_is_the_sum(#[case] routers: Vec<Vec<&str>>, #[case] expected: usize) {
    let merged = merge_routers(routers.iter().map(|names| flat_router(names))).expect("merge");
    assert_eq!(merged.len(), expected);
}

#[tokio::test]
async fn posts_and_messages_end_to_end() {
    let board = Board::seeded();
    let dispatcher = Dispatcher::new(
        merge_routers([posts_router(), messages_router()]).expect("merge"),
    );

    let created = dispatcher
        .dispatch(
            CallEnvelope::mutation("posts.create", json!({"title": "second"})),
            CallContext::new(&board),
        )
        .await;
    assert_eq!(created.value(), Some(&json!({"id": 3, "title": "second"})));

    let listed = dispatcher
        .dispatch(CallEnvelope::query("posts.list", Value::Null), CallContext::new(&board))
        .await;
    let posts = listed.value().and_then(Value::as_array).expect("post list");
    assert_eq!(posts.len(), 2);

    let missing = dispatcher
        .dispatch(CallEnvelope::query("messages.delete", Value::Null), CallContext::new(&board))
        .await;
    assert_eq!(missing.code(), Some(ErrorCode::NotFound));
}
