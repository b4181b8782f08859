//! Accepted connections and the trait that serves them.

use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// A connection accepted by [`super::SocketListener`].
#[derive(Debug)]
pub enum ConnectionStream {
    /// TCP peer.
    Tcp(TcpStream),
    /// Unix domain socket peer.
    #[cfg(unix)]
    Unix(UnixStream),
}

trait Duplex: Read + Write {}

impl<T: Read + Write> Duplex for T {}

impl ConnectionStream {
    /// Describes the connected peer for logging.
    #[must_use]
    pub fn peer(&self) -> String {
        match self {
            Self::Tcp(stream) => stream
                .peer_addr()
                .map_or_else(|_| String::from("tcp:unknown"), |addr| format!("tcp:{addr}")),
            #[cfg(unix)]
            Self::Unix(_) => String::from("unix"),
        }
    }

    fn duplex(&mut self) -> &mut dyn Duplex {
        match self {
            Self::Tcp(stream) => stream,
            #[cfg(unix)]
            Self::Unix(stream) => stream,
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.duplex().read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.duplex().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.duplex().flush()
    }
}

/// Serves one accepted connection on the thread the listener spawned for it.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Consumes the connection. A panic here only takes down this connection's
    /// thread.
    fn handle(&self, stream: ConnectionStream);
}
