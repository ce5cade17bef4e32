//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding the PKCS#11 RPC wire format.
///
/// Every variant abandons the decode of a single message; the bytes were
/// already forwarded before decoding began. [`FrameTooLarge`] is the one
/// exception: it is raised at the framing layer, before any forwarding,
/// and costs the connection because the next frame boundary is unknowable.
///
/// [`FrameTooLarge`]: ProtocolError::FrameTooLarge
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("unreasonable array length: {count} elements (max {max})")]
    UnreasonableLength { count: u32, max: u32 },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("format mismatch: expected {expected:?}, message carries {actual:?}")]
    FormatMismatch { expected: String, actual: String },

    #[error("unknown call id: {0}")]
    UnknownCall(u32),

    #[error("unrecognized buffer element type: {0:?}")]
    UnrecognizedBufferType(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ProtocolError::Truncated {
            needed: 8,
            available: 3,
        };
        assert!(err.to_string().contains("8"));
        assert!(err.to_string().contains("3"));

        let err = ProtocolError::FormatMismatch {
            expected: "uu".into(),
            actual: "u".into(),
        };
        assert!(err.to_string().contains("uu"));

        let err = ProtocolError::UnknownCall(70);
        assert!(err.to_string().contains("70"));
    }
}
