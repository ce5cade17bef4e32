//! Trace rendering for decoded traffic.
//!
//! Decoded messages are rendered through `tracing` and dropped; nothing is
//! persisted. Call names go to info, values and diagnostic notes to debug.

use p11tap_protocol::{DecodedMessage, Direction};
use std::fmt::Write as _;
use std::net::SocketAddr;

/// Decodes a copy of one relayed payload and renders the result.
///
/// Returns whether the payload decoded. The bytes were forwarded before
/// this runs, so a failure here is logged and otherwise ignored.
pub fn inspect(peer: SocketAddr, direction: Direction, body: &[u8]) -> bool {
    match DecodedMessage::parse(direction, body) {
        Ok(msg) => {
            render(peer, &msg);
            true
        }
        Err(e) => {
            tracing::warn!(
                "[{}] undecodable {} ({} bytes): {}",
                peer,
                direction,
                body.len(),
                e
            );
            false
        }
    }
}

fn render(peer: SocketAddr, msg: &DecodedMessage) {
    match msg.result {
        Some(code) => {
            tracing::info!("[{}] {} {}: {}", peer, msg.direction, msg.call.name, code);
        }
        None => {
            tracing::info!(
                "[{}] {} {} ({} values)",
                peer,
                msg.direction,
                msg.call.name,
                msg.output.values.len()
            );
        }
    }
    for value in &msg.output.values {
        tracing::debug!("[{}]   {}", peer, value);
    }
    for note in &msg.output.notes {
        tracing::debug!("[{}]   note: {}", peer, note);
    }
}

/// Renders bytes as lowercase hex.
pub fn hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:4444".parse().unwrap()
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xAB, 0xFF]), "00abff");
        assert_eq!(hex(&[]), "");
    }

    #[test]
    fn test_inspect_decodable() {
        // C_Logout request: id 22, empty-payload format "u" with one ulong.
        let mut body = Vec::new();
        body.extend_from_slice(&22u32.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.push(b'u');
        body.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0, 9]);
        assert!(inspect(peer(), Direction::Request, &body));
    }

    #[test]
    fn test_inspect_undecodable_is_contained() {
        assert!(!inspect(peer(), Direction::Request, &[0xFF; 6]));
        assert!(!inspect(peer(), Direction::Response, &[]));
    }
}
