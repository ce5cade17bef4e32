//! Whole-message parsing.
//!
//! A frame payload starts with a u32 call id, followed by the message's own
//! copy of its format signature (length-prefixed), followed by the encoded
//! values. The embedded signature is redundant: it must equal the static
//! signature the call table declares for that id and direction.

use crate::calls::{self, CallDescriptor, CALL_ERROR};
use crate::cursor::Cursor;
use crate::error::ProtocolError;
use crate::result_code::ResultCode;
use crate::value::{self, DecodeOutput};
use std::fmt;

/// Which side of the conversation a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => f.write_str("request"),
            Direction::Response => f.write_str("response"),
        }
    }
}

/// A fully decoded payload, produced per message and dropped once logged.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub call: &'static CallDescriptor,
    pub direction: Direction,
    pub output: DecodeOutput,
    /// Result code carried by an ERROR response; `None` for everything else.
    pub result: Option<ResultCode>,
}

impl DecodedMessage {
    /// Decodes one frame payload.
    ///
    /// This runs on a copy of bytes that were already forwarded, so any
    /// error here is diagnostic-only; the caller decides what (if anything)
    /// it means for the connection.
    pub fn parse(direction: Direction, body: &[u8]) -> Result<Self, ProtocolError> {
        let mut cur = Cursor::new(body);
        let call_id = cur.read_u32()?;
        let call = calls::lookup(call_id)?;

        // An ERROR response carries no value payload; its last four bytes
        // are the result code.
        if direction == Direction::Response && call_id == CALL_ERROR {
            let code = cur.peek_trailing_u32()?;
            return Ok(Self {
                call,
                direction,
                output: DecodeOutput::default(),
                result: Some(ResultCode(code)),
            });
        }

        let wire_format = cur.read_byte_array()?;
        let expected = call.format(direction);
        if wire_format != expected.as_bytes() {
            return Err(ProtocolError::FormatMismatch {
                expected: expected.to_string(),
                actual: String::from_utf8_lossy(wire_format).into_owned(),
            });
        }

        let output = value::decode_values(expected, &mut cur)?;
        Ok(Self {
            call,
            direction,
            output,
            result: None,
        })
    }
}
