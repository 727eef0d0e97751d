//! # TetheRPC
//!
//! The wire protocol between a local caller and a WebAssembly module running
//! inside a remote debugger.
//!
//! ## Architecture
//!
//! - **Frames**: the socket carries text frames (JSON application messages)
//!   and binary frames (raw bytes behind a one-byte kind discriminant).
//! - **Messages**: requests and responses are closed sum types; every
//!   consumer matches them exhaustively.
//! - **Values**: responses carry typed `WasmValue`s, requests carry plain
//!   `Number`s interpreted by the remote side.

pub mod codec;
pub mod error;
pub mod export;
pub mod frame;
pub mod text;
pub mod value;

pub use codec::decode_request;
pub use codec::decode_response;
pub use codec::encode_request;
pub use codec::encode_response;
pub use error::Error;
pub use error::Result;
pub use export::ExportKind;
pub use export::WasmExport;
pub use frame::BinaryResponse;
pub use frame::BinaryResponseKind;
pub use frame::FrameKind;
pub use frame::SocketFrame;
pub use text::CallHostResponse;
pub use text::CallResultResponse;
pub use text::InitResponse;
pub use text::LoadMemoryResponse;
pub use text::ResponseKind;
pub use text::StoreMemoryResponse;
pub use text::TextRequest;
pub use text::TextResponse;
pub use text::TextResponseKind;
pub use text::TextResponsePayload;
pub use text::VersionResponse;
pub use value::Number;
pub use value::ValueKind;
pub use value::WasmValue;

#[cfg(test)]
mod tests;
