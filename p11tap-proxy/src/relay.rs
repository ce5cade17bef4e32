//! Per-connection relay: handshake forwarding, frame reading, and the
//! forward-then-inspect loop.

use crate::error::ProxyError;
use crate::server::ServerStats;
use crate::trace;
use p11tap_protocol::{Direction, HANDSHAKE_LEN, MAX_FRAME_SIZE, ProtocolError};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads one length-prefixed frame.
///
/// Returns `Ok(None)` when the peer closed the connection cleanly, i.e. at a
/// frame boundary. A close mid-prefix or mid-body is a
/// [`ProxyError::TruncatedFrame`]: the stream's framing is lost, so the
/// caller must tear the connection down rather than guess where the next
/// frame starts.
pub async fn read_frame<R>(source: &mut R) -> Result<Option<Vec<u8>>, ProxyError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = source.read(&mut prefix[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(ProxyError::TruncatedFrame {
                expected: prefix.len(),
                got: filled,
            });
        }
        filled += n;
    }

    let len = u32::from_be_bytes(prefix);
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        }
        .into());
    }

    let mut body = vec![0u8; len as usize];
    let mut filled = 0;
    while filled < body.len() {
        let n = source.read(&mut body[filled..]).await?;
        if n == 0 {
            return Err(ProxyError::TruncatedFrame {
                expected: len as usize,
                got: filled,
            });
        }
        filled += n;
    }
    Ok(Some(body))
}

/// Writes one frame: 4-byte big-endian length, then exactly `body.len()`
/// payload bytes.
async fn forward<W>(sink: &mut W, body: &[u8]) -> Result<(), ProxyError>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(&(body.len() as u32).to_be_bytes()).await?;
    sink.write_all(body).await?;
    Ok(())
}

/// One client/upstream socket pair. The relay exclusively owns both sockets
/// for the lifetime of the connection.
pub struct Relay<C, U> {
    client: C,
    upstream: U,
    peer: SocketAddr,
    stats: Arc<ServerStats>,
}

impl<C, U> Relay<C, U>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(client: C, upstream: U, peer: SocketAddr, stats: Arc<ServerStats>) -> Self {
        Self {
            client,
            upstream,
            peer,
            stats,
        }
    }

    /// Runs the relay to completion: handshake, then the request/response
    /// loop until either side closes.
    ///
    /// Every frame is forwarded before its copy is inspected; decode
    /// failures are logged and never affect the relayed bytes.
    pub async fn run(mut self) -> Result<(), ProxyError> {
        self.handshake().await?;

        loop {
            let frame = match read_frame(&mut self.client).await? {
                Some(frame) => frame,
                None => {
                    tracing::debug!("[{}] client closed", self.peer);
                    return Ok(());
                }
            };
            forward(&mut self.upstream, &frame).await?;
            self.record(Direction::Request, &frame);

            let frame = match read_frame(&mut self.upstream).await? {
                Some(frame) => frame,
                None => {
                    tracing::debug!("[{}] upstream closed", self.peer);
                    return Ok(());
                }
            };
            forward(&mut self.client, &frame).await?;
            self.record(Direction::Response, &frame);
        }
    }

    /// Forwards the opaque application identifier that precedes all framed
    /// traffic. Not decoded.
    async fn handshake(&mut self) -> Result<(), ProxyError> {
        let mut ident = [0u8; HANDSHAKE_LEN];
        self.client.read_exact(&mut ident).await?;
        self.upstream.write_all(&ident).await?;
        tracing::debug!("[{}] handshake {}", self.peer, trace::hex(&ident));
        Ok(())
    }

    fn record(&self, direction: Direction, body: &[u8]) {
        self.stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
        if !trace::inspect(self.peer, direction, body) {
            self.stats.decode_failures.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_bytes(body: &[u8]) -> Vec<u8> {
        let mut buf = (body.len() as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(body);
        buf
    }

    #[tokio::test]
    async fn test_read_frame() {
        let wire = frame_bytes(b"hello");
        let mut source = std::io::Cursor::new(wire);
        let frame = read_frame(&mut source).await.unwrap().unwrap();
        assert_eq!(frame, b"hello");
    }

    #[tokio::test]
    async fn test_read_frame_across_partial_reads() {
        let wire = frame_bytes(b"split");
        let mut mock = tokio_test::io::Builder::new()
            .read(&wire[..2])
            .read(&wire[2..5])
            .read(&wire[5..])
            .build();
        let frame = read_frame(&mut mock).await.unwrap().unwrap();
        assert_eq!(frame, b"split");
    }

    #[tokio::test]
    async fn test_read_frame_clean_close() {
        let mut source = std::io::Cursor::new(Vec::new());
        assert!(read_frame(&mut source).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_close_mid_prefix() {
        let mut source = std::io::Cursor::new(vec![0x00, 0x00]);
        let err = read_frame(&mut source).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::TruncatedFrame {
                expected: 4,
                got: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_read_frame_close_mid_body() {
        let mut wire = frame_bytes(b"hello");
        wire.truncate(6); // length promises 5, only 2 body bytes present
        let mut source = std::io::Cursor::new(wire);
        let err = read_frame(&mut source).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::TruncatedFrame {
                expected: 5,
                got: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_absurd_length() {
        let wire = (u32::MAX).to_be_bytes().to_vec();
        let mut source = std::io::Cursor::new(wire);
        let err = read_frame(&mut source).await.unwrap_err();
        assert!(matches!(
            err,
            ProxyError::Protocol(ProtocolError::FrameTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_forward_is_byte_exact() {
        let mut sink = Vec::new();
        forward(&mut sink, b"abc").await.unwrap();
        assert_eq!(sink, frame_bytes(b"abc"));
    }

    #[tokio::test]
    async fn test_relay_forwards_handshake_and_frames() {
        // Undecodable garbage payload: forwarding must be unaffected.
        let garbage = vec![0xFFu8; 12];
        let request = frame_bytes(&garbage);

        let mut client_wire = b"PKCS11PX".to_vec();
        client_wire.extend_from_slice(&request);

        let (client_side, mut client_peer) = tokio::io::duplex(1024);
        let (upstream_side, mut upstream_peer) = tokio::io::duplex(1024);

        client_peer.write_all(&client_wire).await.unwrap();
        client_peer.shutdown().await.unwrap();

        let stats = Arc::new(ServerStats::default());
        let relay = Relay::new(
            client_side,
            upstream_side,
            "127.0.0.1:5555".parse().unwrap(),
            stats.clone(),
        );

        // Upstream answers one ERROR frame then closes.
        let response = frame_bytes(&[0, 0, 0, 0, 0, 0, 0, 0x05]); // CKR_GENERAL_ERROR
        let upstream_task = tokio::spawn(async move {
            let mut seen = vec![0u8; client_wire.len()];
            upstream_peer.read_exact(&mut seen).await.unwrap();
            upstream_peer.write_all(&response).await.unwrap();
            upstream_peer.shutdown().await.unwrap();
            seen
        });

        relay.run().await.unwrap();

        let seen = upstream_task.await.unwrap();
        assert_eq!(&seen[..8], b"PKCS11PX");
        assert_eq!(&seen[8..], &request[..]);

        // One relayed response frame came back to the client side.
        let mut returned = Vec::new();
        client_peer.read_to_end(&mut returned).await.unwrap();
        assert_eq!(returned, frame_bytes(&[0, 0, 0, 0, 0, 0, 0, 0x05]));

        assert_eq!(stats.frames_relayed.load(Ordering::Relaxed), 2);
        // The garbage request failed decode; the ERROR response decoded fine.
        assert_eq!(stats.decode_failures.load(Ordering::Relaxed), 1);
    }
}
