//! # Remote Memory View
//!
//! Local handles onto the linear memory of the remotely executing module.
//! Creating windows is free; reads and writes are blocking exchanges with the
//! remote debugger.
//!
//! ## Index Resolution
//!
//! `subarray` and `slice` take optional, possibly negative, indices:
//!
//! - negative indices count from the end of the window;
//! - omitted indices default to the start and the end;
//! - `start > end` gives an empty window;
//! - `end` past the window gives an empty view.

pub mod codec;
pub mod typed;
pub mod view;

use std::sync::Arc;

use tetherpc::LoadMemoryResponse;
use tetherpc::StoreMemoryResponse;
use tetherpc::TextRequest;

use crate::rpc;
use crate::rpc::RpcClient;

pub use typed::Element;
pub use typed::TypedArray;
pub use view::DataView;

#[derive(Debug)]
pub enum Error {
    Rpc(rpc::Error),
    /// A view-style access reached past the end of the window.
    OutOfRange {
        offset: usize,
        width: usize,
        length: usize,
    },
    /// The remote side returned fewer bytes than were asked for.
    ShortRead {
        expected: usize,
        actual: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rpc(e) => write!(f, "RPC error: {}", e),
            Self::OutOfRange { offset, width, length } => write!(
                f,
                "Offset is outside the bounds of the view: {} + {} > {}",
                offset, width, length
            ),
            Self::ShortRead { expected, actual } => {
                write!(f, "Short read: expected {} bytes, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rpc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rpc::Error> for Error {
    fn from(e: rpc::Error) -> Self {
        Self::Rpc(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A byte window `[offset, offset + length)` of a remote memory export.
#[derive(Clone)]
pub struct RemoteMemory {
    name: Arc<str>,
    offset: usize,
    length: usize,
    rpc: RpcClient,
}

impl RemoteMemory {
    pub fn new(name: impl Into<Arc<str>>, offset: usize, length: usize, rpc: RpcClient) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            rpc,
        }
    }

    /// Name of the memory export this window belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute offset of the window in the remote memory.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    fn resolve(&self, start: Option<i64>, end: Option<i64>) -> Option<(usize, usize)> {
        let len = self.length as i64;
        let from_end = |index: i64| if index < 0 { (len + index).max(0) } else { index };

        let end = end.map_or(len, from_end);
        if end > len {
            return None;
        }
        let start = start.map_or(0, from_end).min(end);
        Some((start as usize, end as usize))
    }

    /// A narrower window sharing the same export. Never touches the network.
    pub fn subarray(&self, start: Option<i64>, end: Option<i64>) -> RemoteMemory {
        let (offset, length) = match self.resolve(start, end) {
            Some((start, end)) => (self.offset + start, end - start),
            None => (0, 0),
        };
        RemoteMemory {
            name: self.name.clone(),
            offset,
            length,
            rpc: self.rpc.clone(),
        }
    }

    /// Copies bytes out of the remote memory.
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> Result<Vec<u8>> {
        match self.resolve(start, end) {
            Some((start, end)) if start < end => self.load(self.offset + start, end - start),
            _ => Ok(Vec::new()),
        }
    }

    /// Writes `bytes` at `offset` within the window.
    ///
    /// Returns `false` without contacting the remote side if they do not fit.
    pub fn set(&self, offset: usize, bytes: &[u8]) -> Result<bool> {
        let fits = offset
            .checked_add(bytes.len())
            .is_some_and(|end| end <= self.length);
        if !fits {
            return Ok(false);
        }

        let request = TextRequest::StoreMemory {
            name: self.name.to_string(),
            offset: (self.offset + offset) as u64,
            bytes: bytes.to_vec(),
        };
        self.rpc.text_request(&request, true)?;
        self.rpc.blocking_text_response::<StoreMemoryResponse>()?;
        Ok(true)
    }

    /// The whole window decoded as UTF-8, invalid sequences replaced.
    pub fn decode_utf8(&self) -> Result<String> {
        let bytes = self.slice(None, None)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Exactly `width` bytes at `offset`, or `None` if they do not fit.
    pub(crate) fn read_exact(&self, offset: usize, width: usize) -> Result<Option<Vec<u8>>> {
        let fits = offset
            .checked_add(width)
            .is_some_and(|end| end <= self.length);
        if !fits {
            return Ok(None);
        }

        let bytes = self.load(self.offset + offset, width)?;
        if bytes.len() != width {
            return Err(Error::ShortRead {
                expected: width,
                actual: bytes.len(),
            });
        }
        Ok(Some(bytes))
    }

    fn load(&self, offset: usize, length: usize) -> Result<Vec<u8>> {
        let request = TextRequest::LoadMemory {
            name: self.name.to_string(),
            offset: offset as u64,
            length: length as u64,
        };
        self.rpc.text_request(&request, true)?;
        let response = self.rpc.blocking_text_response::<LoadMemoryResponse>()?;
        Ok(response.bytes)
    }
}

impl std::fmt::Debug for RemoteMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteMemory")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .finish()
    }
}

/// A memory export of a remote instance.
#[derive(Debug, Clone)]
pub struct Memory {
    buffer: RemoteMemory,
}

impl Memory {
    pub fn new(buffer: RemoteMemory) -> Self {
        Self { buffer }
    }

    /// The full memory as it was sized when the module was compiled.
    pub fn buffer(&self) -> &RemoteMemory {
        &self.buffer
    }

    /// Growth is not forwarded to the remote side; always returns `0`.
    pub fn grow(&self, _delta: u32) -> u32 {
        0
    }
}
