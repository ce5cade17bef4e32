//! Cursor-based primitive readers for the big-endian wire encoding.

use crate::error::ProtocolError;
use crate::ABSENT_LENGTH;

/// A read cursor over a borrowed byte buffer.
///
/// Reads advance an internal offset; the underlying buffer is never
/// mutated. All integers are big-endian. Protocol ulongs are transmitted as
/// two 32-bit halves, not a native 8-byte word.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if self.remaining() < n {
            return Err(ProtocolError::Truncated {
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads a 4-byte big-endian unsigned integer.
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads a protocol ulong: two consecutive 32-bit big-endian halves
    /// combined as `(high << 32) | low`.
    pub fn read_u64(&mut self) -> Result<u64, ProtocolError> {
        let high = self.read_u32()? as u64;
        let low = self.read_u32()? as u64;
        Ok((high << 32) | low)
    }

    /// Reads a single byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a length-prefixed byte blob.
    ///
    /// A length of [`ABSENT_LENGTH`] means the value is absent: the result
    /// is empty and no bytes beyond the length field are consumed.
    pub fn read_byte_array(&mut self) -> Result<&'a [u8], ProtocolError> {
        let len = self.read_u32()?;
        if len == ABSENT_LENGTH {
            return Ok(&[]);
        }
        self.take(len as usize)
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        self.take(n)
    }

    /// Returns the last four unread bytes as a big-endian u32 without
    /// advancing the cursor. Used for the result code trailing an ERROR
    /// response.
    pub fn peek_trailing_u32(&self) -> Result<u32, ProtocolError> {
        if self.remaining() < 4 {
            return Err(ProtocolError::Truncated {
                needed: 4,
                available: self.remaining(),
            });
        }
        let b = &self.buf[self.buf.len() - 4..];
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }
}
