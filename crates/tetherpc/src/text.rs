//! # Application Text Messages
//!
//! JSON messages carried in text frames, discriminated by a `type` field.
//!
//! ## Invariants
//!
//! - Every request has exactly one matching response kind, see
//!   [`TextRequest::expected_response`].
//! - Responses self-identify through their tag, so a response of the wrong
//!   kind is detected rather than misread.

use serde::Deserialize;
use serde::Serialize;

use crate::export::WasmExport;
use crate::frame::BinaryResponseKind;
use crate::value::Number;
use crate::value::WasmValue;

/// Requests sent to the remote debugger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextRequest {
    Version,
    InitMemory,
    CallExported {
        name: String,
        args: Vec<Number>,
    },
    /// Answers a `CallHost` response with the host function's return value.
    /// An absent return value is encoded as `null`.
    CallResult {
        values: Vec<Option<Number>>,
    },
    LoadMemory {
        name: String,
        offset: u64,
        length: u64,
    },
    StoreMemory {
        name: String,
        offset: u64,
        bytes: Vec<u8>,
    },
}

/// The kind of response a request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Text(TextResponseKind),
    Binary(BinaryResponseKind),
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(kind) => write!(f, "{}", kind),
            Self::Binary(kind) => write!(f, "Binary({})", kind),
        }
    }
}

impl TextRequest {
    /// The response kind that completes this request.
    ///
    /// `CallExported` completes with `CallResult`, though the remote side may
    /// interleave any number of `CallHost` round trips before it.
    pub fn expected_response(&self) -> ResponseKind {
        match self {
            Self::Version => ResponseKind::Text(TextResponseKind::Version),
            Self::InitMemory => ResponseKind::Binary(BinaryResponseKind::InitMemory),
            Self::CallExported { .. } => ResponseKind::Text(TextResponseKind::CallResult),
            Self::CallResult { .. } => ResponseKind::Text(TextResponseKind::CallResult),
            Self::LoadMemory { .. } => ResponseKind::Text(TextResponseKind::LoadMemoryResult),
            Self::StoreMemory { .. } => ResponseKind::Text(TextResponseKind::StoreMemoryResult),
        }
    }
}

/// Responses received from the remote debugger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextResponse {
    Version(VersionResponse),
    Init(InitResponse),
    CallResult(CallResultResponse),
    CallHost(CallHostResponse),
    LoadMemoryResult(LoadMemoryResponse),
    StoreMemoryResult(StoreMemoryResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub value: String,
}

/// Sent once the remote side has loaded the module bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitResponse {
    pub exports: Vec<WasmExport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResultResponse {
    pub values: Vec<WasmValue>,
}

/// The remote module is calling one of the caller's imports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallHostResponse {
    pub module: String,
    pub field: String,
    pub args: Vec<WasmValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadMemoryResponse {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMemoryResponse {}

/// The tag of a `TextResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextResponseKind {
    Version,
    Init,
    CallResult,
    CallHost,
    LoadMemoryResult,
    StoreMemoryResult,
}

impl std::fmt::Display for TextResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Version => "Version",
            Self::Init => "Init",
            Self::CallResult => "CallResult",
            Self::CallHost => "CallHost",
            Self::LoadMemoryResult => "LoadMemoryResult",
            Self::StoreMemoryResult => "StoreMemoryResult",
        };
        f.write_str(name)
    }
}

impl TextResponse {
    pub fn kind(&self) -> TextResponseKind {
        match self {
            Self::Version(_) => TextResponseKind::Version,
            Self::Init(_) => TextResponseKind::Init,
            Self::CallResult(_) => TextResponseKind::CallResult,
            Self::CallHost(_) => TextResponseKind::CallHost,
            Self::LoadMemoryResult(_) => TextResponseKind::LoadMemoryResult,
            Self::StoreMemoryResult(_) => TextResponseKind::StoreMemoryResult,
        }
    }
}

/// A payload type that can be selected out of a `TextResponse` by its kind.
///
/// Lets callers say which response they expect as a type and get the payload
/// back without a second match.
pub trait TextResponsePayload: Sized {
    const KIND: TextResponseKind;

    /// Returns the payload if the response is of kind `Self::KIND`, otherwise
    /// hands the response back untouched.
    fn select(response: TextResponse) -> std::result::Result<Self, TextResponse>;
}

macro_rules! payload {
    ($ty:ty, $variant:ident) => {
        impl TextResponsePayload for $ty {
            const KIND: TextResponseKind = TextResponseKind::$variant;

            fn select(response: TextResponse) -> std::result::Result<Self, TextResponse> {
                match response {
                    TextResponse::$variant(payload) => Ok(payload),
                    other => Err(other),
                }
            }
        }

        impl From<$ty> for TextResponse {
            fn from(payload: $ty) -> Self {
                TextResponse::$variant(payload)
            }
        }
    };
}

payload!(VersionResponse, Version);
payload!(InitResponse, Init);
payload!(CallResultResponse, CallResult);
payload!(CallHostResponse, CallHost);
payload!(LoadMemoryResponse, LoadMemoryResult);
payload!(StoreMemoryResponse, StoreMemoryResult);
