//! Listener lifecycle: bind, accept, dial upstream, spawn relays.

use crate::config::Config;
use crate::error::ProxyError;
use crate::relay::Relay;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Proxy statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub frames_relayed: AtomicU64,
    pub decode_failures: AtomicU64,
}

/// The listening proxy.
///
/// Each accepted client gets a freshly dialed upstream connection and its
/// own relay task; the two sockets are owned exclusively by that task. The
/// only state shared across connections is the read-only call table and the
/// stats counters.
pub struct ProxyServer {
    config: Config,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl ProxyServer {
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn run(&self) -> Result<(), ProxyError> {
        let listener = TcpListener::bind(self.config.listen.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serves on an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ProxyError> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            "Relaying {} -> {}",
            listener.local_addr()?,
            self.config.upstream.addr
        );

        let accept_timeout = self.config.listen.accept_timeout();
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                result = tokio::time::timeout(accept_timeout, listener.accept()) => {
                    match result {
                        // Accept wait elapsed; loop around and wait again.
                        Err(_) => continue,
                        Ok(Ok((client, addr))) => self.spawn_relay(client, addr),
                        Ok(Err(e)) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Proxy shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_relay(&self, client: TcpStream, addr: std::net::SocketAddr) {
        self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
        self.stats.connections_active.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Client connected: {}", addr);

        let upstream_addr = self.config.upstream.addr;
        let connect_timeout = self.config.upstream.connect_timeout();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            match Self::dial_upstream(upstream_addr, connect_timeout).await {
                Ok(upstream) => {
                    client.set_nodelay(true).ok();
                    let relay = Relay::new(client, upstream, addr, stats.clone());
                    match relay.run().await {
                        Ok(()) => tracing::info!("Client disconnected: {}", addr),
                        Err(e) => tracing::warn!("[{}] relay terminated: {}", addr, e),
                    }
                }
                Err(e) => tracing::warn!("[{}] {}", addr, e),
            }
            stats.connections_active.fetch_sub(1, Ordering::Relaxed);
        });
    }

    async fn dial_upstream(
        addr: std::net::SocketAddr,
        timeout: std::time::Duration,
    ) -> Result<TcpStream, ProxyError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProxyError::UpstreamConnect {
                addr,
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })?
            .map_err(|source| ProxyError::UpstreamConnect { addr, source })?;
        stream.set_nodelay(true).ok();
        Ok(stream)
    }

    /// Initiates shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the proxy is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns proxy statistics.
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_starts_stopped() {
        let server = ProxyServer::new(Config::default());
        assert!(!server.is_running());
        assert_eq!(server.stats().connections_total.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_serve() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Arc::new(ProxyServer::new(Config::default()));

        let task = {
            let server = server.clone();
            tokio::spawn(async move { server.serve(listener).await })
        };

        // Give serve a moment to subscribe, then stop it.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(server.is_running());
        server.shutdown();

        task.await.unwrap().unwrap();
        assert!(!server.is_running());
    }
}
