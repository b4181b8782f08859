//! In-memory post and message store.
//!
//! Posts and messages draw their identifiers from one shared counter, so an
//! identifier is unique across both collections. Writes are serialised by the
//! store's own mutex; readers receive snapshots.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Identifier drawn from the shared counter.
    pub id: u64,
    /// Post title.
    pub title: String,
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier drawn from the shared counter.
    pub id: u64,
    /// Message body.
    pub text: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Last update time in milliseconds since the Unix epoch.
    pub updated_at: u64,
}

#[derive(Debug, Default)]
struct StoreState {
    next_id: u64,
    posts: Vec<Post>,
    messages: Vec<Message>,
}

impl StoreState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared store for posts and messages.
#[derive(Debug, Default)]
pub struct Store {
    state: Mutex<StoreState>,
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the post `hello` and the message
    /// `initial message`.
    #[must_use]
    pub fn seeded() -> Self {
        let store = Self::new();
        store.add_post(String::from("hello"));
        store.add_message(String::from("initial message"));
        store
    }

    /// Returns a snapshot of all posts in creation order.
    #[must_use]
    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }

    /// Returns a snapshot of all messages in creation order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    /// Appends a post and returns it.
    pub fn add_post(&self, title: String) -> Post {
        let mut state = self.lock();
        let post = Post {
            id: state.allocate_id(),
            title,
        };
        state.posts.push(post.clone());
        post
    }

    /// Appends a message stamped with the current time and returns it.
    pub fn add_message(&self, text: String) -> Message {
        let now = now_millis();
        let mut state = self.lock();
        let message = Message {
            id: state.allocate_id(),
            text,
            created_at: now,
            updated_at: now,
        };
        state.messages.push(message.clone());
        message
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}
