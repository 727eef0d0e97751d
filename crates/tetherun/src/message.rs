//! # Inter-Context Messages
//!
//! What crosses the boundary between the caller context and the transport
//! context. Socket frames travel wrapped; everything else drives the
//! connection lifecycle or a blocking exchange.

use std::sync::Arc;

use tetherpc::SocketFrame;

use crate::config::Configuration;
use crate::handoff::Handoff;

/// Requests from the caller context to the transport endpoint.
#[derive(Debug)]
pub enum ContextRequest {
    /// Open the socket and adopt the given settings.
    Configure(Configuration),
    /// Close the socket and stop the transport context.
    Terminate,
    /// Forward a frame to the remote debugger.
    Socket(SocketFrame),
    /// Hand the next response of the current blocking exchange to this slot.
    BlockingReceive(Arc<Handoff<ContextResponse>>),
}

impl ContextRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "Configure",
            Self::Terminate => "Terminate",
            Self::Socket(_) => "SocketRequest",
            Self::BlockingReceive(_) => "BlockingReceive",
        }
    }
}

/// A request tagged with whether the response to it is awaited synchronously.
///
/// The transport endpoint adopts `is_blocking` on every envelope; while it is
/// set, inbound responses go to the blocking rendezvous instead of the inbox.
#[derive(Debug)]
pub struct Envelope {
    pub request: ContextRequest,
    pub is_blocking: bool,
}

/// Responses from the transport endpoint to the caller context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextResponse {
    OnSocketOpen,
    SetConfiguration,
    /// The connection is gone, either on request or because the socket failed.
    Terminated,
    Socket(SocketFrame),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextResponseKind {
    OnSocketOpen,
    SetConfiguration,
    Terminated,
    SocketResponse,
}

impl std::fmt::Display for ContextResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::OnSocketOpen => "OnSocketOpen",
            Self::SetConfiguration => "SetConfiguration",
            Self::Terminated => "Terminated",
            Self::SocketResponse => "SocketResponse",
        };
        f.write_str(name)
    }
}

impl ContextResponse {
    pub fn kind(&self) -> ContextResponseKind {
        match self {
            Self::OnSocketOpen => ContextResponseKind::OnSocketOpen,
            Self::SetConfiguration => ContextResponseKind::SetConfiguration,
            Self::Terminated => ContextResponseKind::Terminated,
            Self::Socket(_) => ContextResponseKind::SocketResponse,
        }
    }
}
