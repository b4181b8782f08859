//! Socket endpoint configuration.
//!
//! Endpoints are written as URLs (`unix:///run/courier/courierd.sock`,
//! `tcp://127.0.0.1:2022`) on the command line and in environment variables,
//! and as either a URL or a tagged table in configuration files.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Declarative configuration for the daemon socket.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind.
        port: u16,
    },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    ///
    /// # Errors
    ///
    /// Fails when a Unix socket path has no parent or the directory cannot be
    /// created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent().filter(|parent| !parent.as_str().is_empty()) else {
            return Err(SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let input = input.trim();
        let url = Url::parse(input).map_err(|source| SocketParseError::Url {
            input: input.to_owned(),
            source,
        })?;
        match url.scheme() {
            "unix" => unix_from_url(input, &url),
            "tcp" => tcp_from_url(input, &url),
            scheme => Err(SocketParseError::UnsupportedScheme {
                input: input.to_owned(),
                scheme: scheme.to_owned(),
            }),
        }
    }
}

fn unix_from_url(input: &str, url: &Url) -> Result<SocketEndpoint, SocketParseError> {
    match url.path() {
        "" => Err(SocketParseError::MissingUnixPath(input.to_owned())),
        path => Ok(SocketEndpoint::unix(path)),
    }
}

fn tcp_from_url(input: &str, url: &Url) -> Result<SocketEndpoint, SocketParseError> {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => Ok(SocketEndpoint::tcp(host, port)),
        (None, _) => Err(SocketParseError::MissingHost(input.to_owned())),
        (Some(_), None) => Err(SocketParseError::MissingPort(input.to_owned())),
    }
}

/// Tagged table form accepted in configuration files.
#[derive(Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
enum TaggedEndpoint {
    Unix { path: Utf8PathBuf },
    Tcp { host: String, port: u16 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Url(String),
    Tagged(TaggedEndpoint),
}

impl<'de> Deserialize<'de> for SocketEndpoint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match EndpointRepr::deserialize(deserializer)? {
            EndpointRepr::Url(text) => text.parse().map_err(de::Error::custom),
            EndpointRepr::Tagged(TaggedEndpoint::Unix { path }) => Ok(Self::Unix { path }),
            EndpointRepr::Tagged(TaggedEndpoint::Tcp { host, port }) => {
                Ok(Self::Tcp { host, port })
            }
        }
    }
}

/// Why a socket URL was rejected.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Only `unix://` and `tcp://` are served.
    #[error("socket '{input}' uses scheme '{scheme}'; expected unix:// or tcp://")]
    UnsupportedScheme {
        /// The rejected text.
        input: String,
        /// The scheme it named.
        scheme: String,
    },
    /// A `tcp://` URL without a host.
    #[error("socket '{0}' names no TCP host")]
    MissingHost(String),
    /// A `tcp://` URL without an explicit port.
    #[error("socket '{0}' names no TCP port")]
    MissingPort(String),
    /// A `unix://` URL without a path.
    #[error("socket '{0}' names no socket file")]
    MissingUnixPath(String),
    /// The text is not a URL at all.
    #[error("socket '{input}' is not a URL: {source}")]
    Url {
        /// The rejected text.
        input: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// The offending socket path.
        path: Utf8PathBuf,
    },
    /// Failed to create or adjust socket directories.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
