//! # p11tap-protocol
//!
//! Wire protocol decoder for the PKCS#11 RPC transport spoken by
//! pkcs11-proxy style daemons.
//!
//! This crate provides:
//! - Cursor-based primitive readers for the big-endian wire encoding
//! - The static call-id table with per-call format signatures
//! - A format-string-driven value decoder (arrays, buffers, attributes,
//!   mechanisms, strings, fixed-width scalars)
//! - PKCS#11 result-code names for ERROR responses
//!
//! The crate is I/O-free: everything operates on in-memory byte buffers so
//! the relay layer can decode a copy of relayed traffic without touching the
//! bytes in flight.

pub mod calls;
pub mod cursor;
pub mod error;
pub mod message;
pub mod result_code;
pub mod value;

pub use calls::{lookup, CallDescriptor, CALL_ERROR};
pub use cursor::Cursor;
pub use error::ProtocolError;
pub use message::{DecodedMessage, Direction};
pub use result_code::ResultCode;
pub use value::{Attribute, BufferInfo, DecodeOutput, Mechanism, Note, Value};

/// Size of the opaque application identifier sent once per connection,
/// before any framed traffic. Not length-prefixed.
pub const HANDSHAKE_LEN: usize = 8;

/// Size of the big-endian length prefix preceding every frame.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Sentinel length meaning "value absent". Distinct from a genuine
/// zero-length value: a reader seeing this consumes no further bytes.
pub const ABSENT_LENGTH: u32 = 0xFFFF_FFFF;

/// Sanity bound on declared array element counts. Not a protocol limit;
/// counts above this almost always mean the decoder lost sync with the
/// stream.
pub const MAX_ARRAY_ELEMENTS: u32 = 256;

/// Maximum accepted frame payload size (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;
