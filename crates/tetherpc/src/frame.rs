//! # Socket Frames
//!
//! The unit of exchange on the socket: a UTF-8 text frame carrying JSON, or a
//! binary frame carrying raw bytes. Binary responses start with a one-byte
//! kind discriminant followed by the payload.

use crate::error::Error;
use crate::error::Result;

/// A single socket message.
#[derive(Clone, PartialEq, Eq)]
pub enum SocketFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Whether a frame is text or binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "TextResponse"),
            Self::Binary => write!(f, "BinaryResponse"),
        }
    }
}

impl SocketFrame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Self::Text(_) => FrameKind::Text,
            Self::Binary(_) => FrameKind::Binary,
        }
    }

    /// Size of the frame body in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Module images and memory snapshots can be large; print their size only.
impl std::fmt::Debug for SocketFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Binary(bytes) => write!(f, "Binary({} bytes)", bytes.len()),
        }
    }
}

/// Discriminant carried in the first byte of a binary response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryResponseKind {
    InitMemory = 0,
}

impl std::fmt::Display for BinaryResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InitMemory => write!(f, "InitMemory"),
        }
    }
}

impl TryFrom<u8> for BinaryResponseKind {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::InitMemory),
            other => Err(Error::UnknownBinaryKind(other)),
        }
    }
}

/// A decoded binary response: its kind and the bytes after the discriminant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResponse {
    pub kind: BinaryResponseKind,
    pub bytes: Vec<u8>,
}

impl BinaryResponse {
    pub fn new(kind: BinaryResponseKind, bytes: Vec<u8>) -> Self {
        Self { kind, bytes }
    }

    /// Splits a binary frame body into its discriminant and payload.
    pub fn decode(body: &[u8]) -> Result<Self> {
        let (&kind, bytes) = body.split_first().ok_or(Error::EmptyBinaryFrame)?;
        Ok(Self {
            kind: BinaryResponseKind::try_from(kind)?,
            bytes: bytes.to_vec(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.bytes.len() + 1);
        body.push(self.kind as u8);
        body.extend_from_slice(&self.bytes);
        body
    }

    pub fn into_frame(self) -> SocketFrame {
        SocketFrame::Binary(self.encode())
    }
}
