//! Connection handler that serves one call per connection.

use std::io::{self, Read};
use std::sync::Arc;

use courier_core::ResultEnvelope;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::request::CallRequest;
use super::response::ResponseWriter;
use crate::app::App;
use crate::transport::{ConnectionHandler, ConnectionStream};

/// Maximum size of a single request line in bytes.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// Reads one call from a connection, dispatches it on the async runtime and
/// writes the result back.
///
/// Connection threads block on the runtime while the call resolves, so the
/// runtime must not be driven by the connection thread itself.
#[derive(Debug)]
pub struct RpcConnectionHandler {
    app: Arc<App>,
    runtime: Handle,
}

impl RpcConnectionHandler {
    /// Creates a handler serving `app` on `runtime`.
    #[must_use]
    pub const fn new(app: Arc<App>, runtime: Handle) -> Self {
        Self { app, runtime }
    }

    fn serve(&self, mut stream: ConnectionStream) {
        let line = match read_request_line(&mut stream) {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected without request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                if error.is_client_error() {
                    reply_error(&mut stream, &error);
                }
                return;
            }
        };

        let request = match CallRequest::parse(&line) {
            Ok(request) => request,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "malformed request");
                reply_error(&mut stream, &error);
                return;
            }
        };

        let (meta, call) = request.into_parts();
        debug!(
            target: DISPATCH_TARGET,
            path = call.path.as_str(),
            kind = %call.kind,
            input = %call.input,
            "call received"
        );
        let result = self.runtime.block_on(self.app.call(meta, call));
        reply(&mut stream, &result);
    }
}

impl ConnectionHandler for RpcConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        self.serve(stream);
    }
}

fn reply(stream: &mut ConnectionStream, result: &ResultEnvelope) {
    if let Err(error) = ResponseWriter::new(stream).write_result(result) {
        warn!(target: DISPATCH_TARGET, %error, "failed to write result");
    }
}

fn reply_error(stream: &mut ConnectionStream, error: &DispatchError) {
    if let Err(write_error) = ResponseWriter::new(stream).write_error(error) {
        warn!(
            target: DISPATCH_TARGET,
            error = %write_error,
            "failed to write error result"
        );
    }
}

/// Reads a bounded request line from the stream.
///
/// Returns `Ok(None)` if the client disconnects without sending data, and the
/// partial line if it disconnects before sending a newline.
fn read_request_line(stream: &mut impl Read) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let bytes_read = read_with_retry(stream, &mut chunk)?;
        let Some(received) = chunk.get(..bytes_read).filter(|bytes| !bytes.is_empty()) else {
            return Ok((!buffer.is_empty()).then_some(buffer));
        };

        if let Some(newline) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend(received.iter().take(newline + 1));
            enforce_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_limit(buffer.len())?;
    }
}

fn read_with_retry(stream: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(buf) {
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            outcome => return outcome,
        }
    }
}

fn enforce_limit(size: usize) -> Result<(), DispatchError> {
    if size > MAX_REQUEST_BYTES {
        return Err(DispatchError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Cursor, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    use courier_core::{DispatchOptions, ErrorCode, FailureKind};
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::app::StaticTokenAuthenticator;

    struct Server {
        addr: SocketAddr,
        thread: JoinHandle<()>,
        _runtime: tokio::runtime::Runtime,
    }

    #[fixture]
    fn server() -> Server {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime");
        let app = App::new(
            Arc::new(StaticTokenAuthenticator::default()),
            DispatchOptions::default(),
        )
        .expect("app");
        let handler = RpcConnectionHandler::new(Arc::new(app), runtime.handle().clone());
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let addr = listener.local_addr().expect("listener address");
        let thread = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            handler.handle(ConnectionStream::Tcp(stream));
        });
        Server {
            addr,
            thread,
            _runtime: runtime,
        }
    }

    fn exchange(server: Server, request: &[u8]) -> ResultEnvelope {
        let mut client = TcpStream::connect(server.addr).expect("connect client");
        client.write_all(request).expect("write request");
        let mut response = String::new();
        BufReader::new(&mut client)
            .read_line(&mut response)
            .expect("read response");
        server.thread.join().expect("join server");
        serde_json::from_str(&response).expect("result envelope")
    }

    #[rstest]
    fn serves_a_mutation(server: Server) {
        let result = exchange(
            server,
            b"{\"path\":\"posts.create\",\"kind\":\"mutation\",\"input\":{\"title\":\"wire\"}}\n",
        );
        assert_eq!(result.value(), Some(&json!({"id": 3, "title": "wire"})));
    }

    #[rstest]
    fn forwards_headers_to_the_context(server: Server) {
        let result = exchange(
            server,
            b"{\"path\":\"secret\",\"kind\":\"query\",\"headers\":{\"authorization\":\"secret\"}}\n",
        );
        assert_eq!(result.value(), Some(&json!({"secret": "sauce"})));
    }

    #[rstest]
    fn answers_malformed_lines(server: Server) {
        let result = exchange(server, b"not json\n");
        let error = result.error().expect("error envelope");
        assert_eq!(error.code, ErrorCode::BadRequest);
        assert_eq!(error.kind, FailureKind::MalformedCall);
    }

    #[rstest]
    fn answers_unknown_paths(server: Server) {
        let result = exchange(server, b"{\"path\":\"posts.delete\",\"kind\":\"query\"}\n");
        assert_eq!(result.code(), Some(ErrorCode::NotFound));
    }

    #[test]
    fn reads_up_to_the_first_newline() {
        let mut input = Cursor::new(b"first\nsecond\n".to_vec());
        let line = read_request_line(&mut input).expect("read");
        assert_eq!(line.as_deref(), Some(b"first\n".as_slice()));
    }

    #[test]
    fn returns_partial_line_at_end_of_stream() {
        let mut input = Cursor::new(b"partial".to_vec());
        let line = read_request_line(&mut input).expect("read");
        assert_eq!(line.as_deref(), Some(b"partial".as_slice()));
    }

    #[test]
    fn returns_none_for_empty_stream() {
        let mut input = Cursor::new(Vec::new());
        assert!(read_request_line(&mut input).expect("read").is_none());
    }

    #[test]
    fn rejects_oversized_lines() {
        let mut input = Cursor::new(vec![b'x'; MAX_REQUEST_BYTES + 2]);
        assert!(matches!(
            read_request_line(&mut input),
            Err(DispatchError::RequestTooLarge { .. })
        ));
    }
}
