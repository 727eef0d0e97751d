//! # RPC Client
//!
//! Typed request/response helpers on top of the channel. Requests are encoded
//! into socket frames; responses are unwrapped from `SocketResponse`, checked
//! for the expected frame type and application kind, then decoded.

use std::sync::Arc;

use tetherpc::BinaryResponse;
use tetherpc::BinaryResponseKind;
use tetherpc::FrameKind;
use tetherpc::ResponseKind;
use tetherpc::SocketFrame;
use tetherpc::TextRequest;
use tetherpc::TextResponsePayload;

use crate::channel;
use crate::channel::ChannelClient;
use crate::message::ContextRequest;
use crate::message::ContextResponse;
use crate::message::ContextResponseKind;

#[derive(Debug)]
pub enum Error {
    Channel(channel::Error),
    Wire(tetherpc::Error),
    UnexpectedFrame {
        expected: FrameKind,
        actual: FrameKind,
    },
    UnexpectedResponse {
        expected: ResponseKind,
        actual: ResponseKind,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Channel(e) => write!(f, "Channel error: {}", e),
            Self::Wire(e) => write!(f, "Wire error: {}", e),
            Self::UnexpectedFrame { expected, actual } => {
                write!(f, "Expected {} but received {}", expected, actual)
            }
            Self::UnexpectedResponse { expected, actual } => {
                write!(f, "Expected {} but received {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Channel(e) => Some(e),
            Self::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<channel::Error> for Error {
    fn from(e: channel::Error) -> Self {
        Self::Channel(e)
    }
}

impl From<tetherpc::Error> for Error {
    fn from(e: tetherpc::Error) -> Self {
        Self::Wire(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Cheap to clone; every clone talks to the same transport context.
#[derive(Clone)]
pub struct RpcClient {
    channel: Arc<ChannelClient>,
}

impl RpcClient {
    pub fn new(channel: Arc<ChannelClient>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &Arc<ChannelClient> {
        &self.channel
    }

    pub fn text_request(&self, body: &TextRequest, is_blocking: bool) -> Result<()> {
        let frame = tetherpc::encode_request(body)?;
        self.channel.post_request(ContextRequest::Socket(frame), is_blocking)?;
        Ok(())
    }

    pub fn binary_request(&self, body: Vec<u8>, is_blocking: bool) -> Result<()> {
        let frame = SocketFrame::Binary(body);
        self.channel.post_request(ContextRequest::Socket(frame), is_blocking)?;
        Ok(())
    }

    /// Next raw frame, for callers that dispatch on several response kinds.
    pub async fn receive(&self) -> Result<SocketFrame> {
        let response = self.channel.receive(ContextResponseKind::SocketResponse).await?;
        into_frame(response)
    }

    pub fn blocking_receive(&self) -> Result<SocketFrame> {
        let response = self.channel.blocking_receive(ContextResponseKind::SocketResponse)?;
        into_frame(response)
    }

    pub async fn text_response<T: TextResponsePayload>(&self) -> Result<T> {
        cast_text(self.receive().await?)
    }

    pub fn blocking_text_response<T: TextResponsePayload>(&self) -> Result<T> {
        cast_text(self.blocking_receive()?)
    }

    /// Payload of the next binary response, after its kind byte.
    pub async fn binary_response(&self, kind: BinaryResponseKind) -> Result<Vec<u8>> {
        cast_binary(self.receive().await?, kind)
    }

    pub fn blocking_binary_response(&self, kind: BinaryResponseKind) -> Result<Vec<u8>> {
        cast_binary(self.blocking_receive()?, kind)
    }
}

fn into_frame(response: ContextResponse) -> Result<SocketFrame> {
    match response {
        ContextResponse::Socket(frame) => Ok(frame),
        other => Err(Error::Channel(channel::Error::UnexpectedResponse {
            expected: ContextResponseKind::SocketResponse,
            actual: other.kind(),
        })),
    }
}

fn cast_text<T: TextResponsePayload>(frame: SocketFrame) -> Result<T> {
    let SocketFrame::Text(body) = frame else {
        return Err(Error::UnexpectedFrame {
            expected: FrameKind::Text,
            actual: frame.kind(),
        });
    };

    let response = tetherpc::decode_response(&body)?;
    T::select(response).map_err(|other| Error::UnexpectedResponse {
        expected: ResponseKind::Text(T::KIND),
        actual: ResponseKind::Text(other.kind()),
    })
}

fn cast_binary(frame: SocketFrame, kind: BinaryResponseKind) -> Result<Vec<u8>> {
    let SocketFrame::Binary(body) = frame else {
        return Err(Error::UnexpectedFrame {
            expected: FrameKind::Binary,
            actual: frame.kind(),
        });
    };

    let response = BinaryResponse::decode(&body)?;
    if response.kind != kind {
        return Err(Error::UnexpectedResponse {
            expected: ResponseKind::Binary(kind),
            actual: ResponseKind::Binary(response.kind),
        });
    }
    Ok(response.bytes)
}
