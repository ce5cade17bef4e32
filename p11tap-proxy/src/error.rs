//! Proxy error types.

use p11tap_protocol::ProtocolError;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors terminating a relay or the listener.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("peer closed connection mid-frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    #[error("failed to connect to upstream {addr}: {source}")]
    UpstreamConnect {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ProxyError::TruncatedFrame {
            expected: 4,
            got: 1,
        };
        assert!(err.to_string().contains("mid-frame"));

        let err = ProxyError::UpstreamConnect {
            addr: "127.0.0.1:2346".parse().unwrap(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.to_string().contains("127.0.0.1:2346"));
    }
}
