//! # Socket Abstraction
//!
//! A minimal, async interface for moving frames to and from the remote
//! debugger.
//!
//! ## Philosophy
//!
//! - **Frame-Oriented**: A socket knows text from binary but nothing about the
//!   JSON inside a text frame.
//! - **Event Mapping**: a successful `connect` is the open event, `recv`
//!   yielding `Ok(None)` is the close event and `Err` is the error event.

use std::fmt;

use tetherpc::SocketFrame;

/// Errors that occur at the network/socket layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The socket could not be opened.
    Connect(String),
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// Generic I/O error or internal socket failure.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(msg) => write!(f, "Connect failed: {}", msg),
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A live, bidirectional frame connection.
///
/// This trait is designed to be object-safe (`Box<dyn Socket>`).
#[async_trait::async_trait]
pub trait Socket: Send + Sync + 'static {
    /// Sends a frame to the peer.
    async fn send(&self, frame: &SocketFrame) -> Result<()>;

    /// Receives the next frame.
    ///
    /// # Invariants
    /// - Returns `Ok(None)` once the peer has closed the connection.
    /// - Must be cancel-safe: the transport endpoint polls it inside `select!`.
    async fn recv(&self) -> Result<Option<SocketFrame>>;

    /// Closes the connection. Closing twice is not an error.
    async fn close(&self) -> Result<()>;
}

/// Opens sockets to a remote debugger address.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Socket>>;
}
