//! # p11tap-proxy
//!
//! TCP relay for p11tap: accepts PKCS#11 RPC clients, dials the real server,
//! forwards every byte unmodified in both directions, and decodes a copy of
//! each frame for trace output.
//!
//! The relay is a read-only observer. Forwarding always happens before any
//! decode attempt, so nothing on the inspection side can delay, corrupt, or
//! drop relayed traffic.

pub mod config;
pub mod error;
pub mod relay;
pub mod server;
pub mod trace;

pub use config::{Config, ConfigError, ListenConfig, UpstreamConfig};
pub use error::ProxyError;
pub use relay::{read_frame, Relay};
pub use server::{ProxyServer, ServerStats};
