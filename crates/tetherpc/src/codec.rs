//! # Text Codec
//!
//! Moves application messages in and out of text frames. Both directions are
//! provided so that the same crate can back a client and a test server.

use crate::error::Result;
use crate::frame::SocketFrame;
use crate::text::TextRequest;
use crate::text::TextResponse;

pub fn encode_request(request: &TextRequest) -> Result<SocketFrame> {
    Ok(SocketFrame::Text(serde_json::to_string(request)?))
}

pub fn decode_request(text: &str) -> Result<TextRequest> {
    Ok(serde_json::from_str(text)?)
}

pub fn encode_response(response: &TextResponse) -> Result<SocketFrame> {
    Ok(SocketFrame::Text(serde_json::to_string(response)?))
}

pub fn decode_response(text: &str) -> Result<TextResponse> {
    Ok(serde_json::from_str(text)?)
}
