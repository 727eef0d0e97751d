//! # Error Definitions
//!
//! Failures while encoding or decoding frames. These describe malformed wire
//! data only; a well-formed response of the wrong kind is the caller's concern.

/// Wire-level failures.
#[derive(Debug)]
pub enum Error {
    /// A text frame was not a valid JSON encoding of the expected message family.
    Json(serde_json::Error),
    /// A binary response frame carried no discriminant byte.
    EmptyBinaryFrame,
    /// The leading discriminant byte of a binary response is not a known kind.
    UnknownBinaryKind(u8),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "Malformed text frame: {}", e),
            Self::EmptyBinaryFrame => write!(f, "Binary frame is missing its kind byte"),
            Self::UnknownBinaryKind(kind) => write!(f, "Unknown binary response kind: {}", kind),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// A specialized Result type for wire operations.
pub type Result<T> = std::result::Result<T, Error>;
