//! # WebSocket Connector
//!
//! The production `Connector`: the remote debugger listens for WebSocket
//! connections and exchanges one application message per WebSocket message.

use futures::SinkExt;
use futures::StreamExt;
use futures::stream::SplitSink;
use futures::stream::SplitStream;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use tetherpc::SocketFrame;

use crate::transport;
use crate::transport::Connector;
use crate::transport::Socket;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connects with `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, addr: &str) -> transport::Result<Box<dyn Socket>> {
        let (stream, _response) = tokio_tungstenite::connect_async(addr)
            .await
            .map_err(|e| transport::Error::Connect(format!("{}: {}", addr, e)))?;

        let (sink, stream) = stream.split();
        Ok(Box::new(WebSocket {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        }))
    }
}

/// Sink and stream halves are locked separately so a pending `recv` never
/// blocks a `send`.
pub struct WebSocket {
    sink: Mutex<WsSink>,
    stream: Mutex<WsStream>,
}

#[async_trait::async_trait]
impl Socket for WebSocket {
    async fn send(&self, frame: &SocketFrame) -> transport::Result<()> {
        let message = match frame {
            SocketFrame::Text(text) => Message::Text(text.clone()),
            SocketFrame::Binary(bytes) => Message::Binary(bytes.clone()),
        };

        self.sink
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| transport::Error::Io(e.to_string()))
    }

    async fn recv(&self) -> transport::Result<Option<SocketFrame>> {
        let mut stream = self.stream.lock().await;
        loop {
            let Some(message) = stream.next().await else {
                return Ok(None);
            };

            match message.map_err(|e| transport::Error::ConnectionLost(e.to_string()))? {
                Message::Text(text) => return Ok(Some(SocketFrame::Text(text))),
                Message::Binary(bytes) => return Ok(Some(SocketFrame::Binary(bytes))),
                Message::Close(_) => return Ok(None),
                // control frames are answered by tungstenite itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&self) -> transport::Result<()> {
        match self.sink.lock().await.close().await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(transport::Error::Io(e.to_string())),
        }
    }
}
