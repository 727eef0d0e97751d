//! In-memory sockets for testing.
//!
//! [`pair`] returns a client socket for the transport endpoint and a
//! [`ServerEnd`] that plays the remote debugger, usually from a plain thread
//! via [`ServerEnd::spawn`].

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use tetherpc::SocketFrame;
use tetherpc::TextRequest;
use tetherpc::TextResponse;

use crate::transport;
use crate::transport::Connector;
use crate::transport::Socket;

/// Client half of an in-memory connection.
pub struct ChannelSocket {
    tx: std::sync::Mutex<Option<mpsc::UnboundedSender<SocketFrame>>>,
    rx: Mutex<mpsc::UnboundedReceiver<SocketFrame>>,
}

/// Server half of an in-memory connection.
///
/// Dropping it closes the connection from the client's point of view.
pub struct ServerEnd {
    tx: mpsc::UnboundedSender<SocketFrame>,
    rx: mpsc::UnboundedReceiver<SocketFrame>,
}

/// What the client sent, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Text(TextRequest),
    Binary(Vec<u8>),
}

/// Creates a connected client socket and server end.
pub fn pair() -> (ChannelSocket, ServerEnd) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();

    let client = ChannelSocket {
        tx: std::sync::Mutex::new(Some(client_tx)),
        rx: Mutex::new(client_rx),
    };
    let server = ServerEnd {
        tx: server_tx,
        rx: server_rx,
    };

    (client, server)
}

#[async_trait::async_trait]
impl Socket for ChannelSocket {
    async fn send(&self, frame: &SocketFrame) -> transport::Result<()> {
        let tx = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(tx) = tx.as_ref() else {
            return Err(transport::Error::ConnectionLost("Socket closed".into()));
        };
        tx.send(frame.clone())
            .map_err(|_| transport::Error::ConnectionLost("Channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<SocketFrame>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) -> transport::Result<()> {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        Ok(())
    }
}

impl ServerEnd {
    pub fn send(&self, frame: SocketFrame) -> bool {
        self.tx.send(frame).is_ok()
    }

    pub fn reply(&self, response: impl Into<TextResponse>) -> bool {
        match tetherpc::encode_response(&response.into()) {
            Ok(frame) => self.send(frame),
            Err(e) => {
                warn!("failed to encode mock response: {}", e);
                false
            }
        }
    }

    /// Next frame from the client. Must not be called from async code.
    pub fn blocking_recv(&mut self) -> Option<SocketFrame> {
        self.rx.blocking_recv()
    }

    pub async fn recv(&mut self) -> Option<SocketFrame> {
        self.rx.recv().await
    }

    /// Next decodable request; undecodable text frames are skipped.
    pub fn next_request(&mut self) -> Option<Incoming> {
        loop {
            match self.blocking_recv()? {
                SocketFrame::Binary(bytes) => return Some(Incoming::Binary(bytes)),
                SocketFrame::Text(body) => match tetherpc::decode_request(&body) {
                    Ok(request) => return Some(Incoming::Text(request)),
                    Err(e) => warn!("mock server skipping undecodable request: {}", e),
                },
            }
        }
    }

    /// Serves requests on a new thread until the client closes the socket.
    pub fn spawn<F>(mut self, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(&mut ServerEnd, Incoming) + Send + 'static,
    {
        std::thread::spawn(move || {
            while let Some(request) = self.next_request() {
                handler(&mut self, request);
            }
        })
    }
}

/// Hands out a single pre-made socket.
pub struct MockConnector {
    socket: std::sync::Mutex<Option<Box<dyn Socket>>>,
}

impl MockConnector {
    pub fn new(socket: impl Socket) -> Self {
        Self {
            socket: std::sync::Mutex::new(Some(Box::new(socket))),
        }
    }

    /// A connector whose every `connect` fails.
    pub fn refusing() -> Self {
        Self {
            socket: std::sync::Mutex::new(None),
        }
    }

    /// A connector for a fresh [`pair`], plus the server end.
    pub fn pair() -> (Arc<Self>, ServerEnd) {
        let (client, server) = pair();
        (Arc::new(Self::new(client)), server)
    }
}

#[async_trait::async_trait]
impl Connector for MockConnector {
    async fn connect(&self, addr: &str) -> transport::Result<Box<dyn Socket>> {
        self.socket
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or_else(|| transport::Error::Connect(format!("{}: connection refused", addr)))
    }
}
