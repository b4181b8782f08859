//! JSONL binding of the call surface.
//!
//! Each connection carries exactly one call. The client writes a single
//! request line:
//!
//! ```json
//! {"path":"posts.create","kind":"mutation","input":{"title":"hi"},"headers":{"authorization":"secret"}}
//! ```
//!
//! and the daemon answers with a single result line:
//!
//! ```json
//! {"status":"ok","value":{"id":3,"title":"hi"}}
//! ```
//!
//! Lines that cannot be read or parsed are answered with a `BAD_REQUEST`
//! envelope of kind `malformed_call`.

mod errors;
mod handler;
mod request;
mod response;

pub use self::errors::DispatchError;
pub use self::handler::{MAX_REQUEST_BYTES, RpcConnectionHandler};
pub use self::request::CallRequest;
pub use self::response::ResponseWriter;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
