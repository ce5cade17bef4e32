//! Format-string-driven value decoder.
//!
//! Every payload carries a format signature: an ordered sequence of
//! single-character codes, each naming a decode rule. The `a` and `f` codes
//! consume the following code as an element-type operand instead of standing
//! alone.
//!
//! | code   | meaning                                           |
//! |--------|---------------------------------------------------|
//! | `u`    | 64-bit ulong, transmitted as two 32-bit halves    |
//! | `s`    | space-padded string, length-prefixed              |
//! | `z`    | null-terminated string, length-prefixed           |
//! | `v`    | version pair, 2 raw bytes (diagnostic only)       |
//! | `y`    | single byte (diagnostic only)                     |
//! | `M`    | mechanism: u32 type + length-prefixed parameter   |
//! | `A`    | attribute record                                  |
//! | `a<X>` | array of element type `X`                         |
//! | `f<X>` | output-buffer descriptor of element type `X`      |
//!
//! Decoding is an observation step over a copy of already-forwarded bytes,
//! so the policy on anything unexpected is to give up on the current message
//! and keep relaying, never to fault the connection.

use crate::cursor::Cursor;
use crate::error::ProtocolError;
use crate::{ABSENT_LENGTH, MAX_ARRAY_ELEMENTS};
use bytes::Bytes;
use std::fmt;

/// A decoded payload value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// 64-bit unsigned protocol integer.
    Ulong(u64),
    /// Raw byte blob (array-of-bytes fields).
    Bytes(Bytes),
    /// String field (`s` and `z` codes); padding preserved as transmitted.
    Str(Bytes),
    /// Attribute record.
    Attribute(Attribute),
    /// Mechanism record.
    Mechanism(Mechanism),
    /// Output-buffer descriptor.
    Buffer(BufferInfo),
}

/// A typed, optionally-present token property.
///
/// The value length is transmitted twice: once as an explicit field, once as
/// the length prefix of the data blob. Both are consumed; the blob prefix is
/// authoritative, `value_len` is kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attr_type: u32,
    pub valid: bool,
    pub value_len: Option<u32>,
    pub data: Bytes,
}

impl Attribute {
    /// Reads one attribute record. An invalid attribute consumes exactly
    /// five bytes (type + validity flag).
    pub fn read(cur: &mut Cursor<'_>) -> Result<Self, ProtocolError> {
        let attr_type = cur.read_u32()?;
        let valid = cur.read_u8()? != 0;
        if !valid {
            return Ok(Self {
                attr_type,
                valid,
                value_len: None,
                data: Bytes::new(),
            });
        }
        let value_len = cur.read_u32()?;
        let data = Bytes::copy_from_slice(cur.read_byte_array()?);
        Ok(Self {
            attr_type,
            valid,
            value_len: Some(value_len),
            data,
        })
    }
}

/// A mechanism identifier plus algorithm-specific parameter bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mechanism {
    pub mech_type: u32,
    pub parameter: Bytes,
}

/// A placeholder describing an output buffer the caller pre-declared,
/// without carrying its eventual contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferInfo {
    /// Declared byte-buffer size; no data follows.
    Bytes(u32),
    /// Declared attribute slots as (attr_type, buffer_len) pairs.
    Attributes(Vec<(u32, u32)>),
    /// Scalar buffer-length placeholder.
    Ulong(u32),
}

/// Diagnostic events produced alongside the value sequence.
///
/// Version pairs and single bytes are consumed from the wire but contribute
/// nothing to the output sequence; they surface here instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    Version { major: u8, minor: u8 },
    Byte(u8),
    /// Array marked invalid or absent; only the declared count was
    /// meaningful (the buffer-too-small response path).
    AbsentArray { declared: u32 },
    /// Decoder hit a code it does not implement and gave up on the rest of
    /// this message.
    UnrecognizedCode(char),
    /// Bytes left in the buffer after the format string was exhausted.
    TrailingBytes(usize),
}

/// Result of decoding one payload: the value sequence plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOutput {
    pub values: Vec<Value>,
    pub notes: Vec<Note>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Halt,
}

/// Walks a format string against the cursor, producing a fresh
/// [`DecodeOutput`] per call.
///
/// Leftover buffer bytes once the format is exhausted are reported as a
/// [`Note::TrailingBytes`], never an error. An unrecognized code halts the
/// walk with a partial output. Truncation and unreasonable declared lengths
/// are errors; the caller decides what they mean for the connection.
pub fn decode_values(format: &str, cur: &mut Cursor<'_>) -> Result<DecodeOutput, ProtocolError> {
    let mut out = DecodeOutput::default();
    let mut fmt = format.chars();
    while let Some(code) = fmt.next() {
        let flow = match code {
            'a' => match fmt.next() {
                Some(elem) => decode_array(elem, cur, &mut out)?,
                None => halt(code, &mut out),
            },
            'f' => match fmt.next() {
                Some(elem) => decode_buffer(elem, cur, &mut out)?,
                None => halt(code, &mut out),
            },
            _ => decode_scalar(code, cur, &mut out)?,
        };
        if flow == Flow::Halt {
            break;
        }
    }
    if cur.remaining() > 0 {
        out.notes.push(Note::TrailingBytes(cur.remaining()));
    }
    Ok(out)
}

fn halt(code: char, out: &mut DecodeOutput) -> Flow {
    out.notes.push(Note::UnrecognizedCode(code));
    Flow::Halt
}

fn decode_scalar(
    code: char,
    cur: &mut Cursor<'_>,
    out: &mut DecodeOutput,
) -> Result<Flow, ProtocolError> {
    match code {
        'u' => out.values.push(Value::Ulong(cur.read_u64()?)),
        // 'z' reads its length exactly once; the absent sentinel yields an
        // empty string with only the length field consumed.
        's' | 'z' => out
            .values
            .push(Value::Str(Bytes::copy_from_slice(cur.read_byte_array()?))),
        'v' => {
            let major = cur.read_u8()?;
            let minor = cur.read_u8()?;
            out.notes.push(Note::Version { major, minor });
        }
        'y' => out.notes.push(Note::Byte(cur.read_u8()?)),
        'M' => {
            let mech_type = cur.read_u32()?;
            let parameter = Bytes::copy_from_slice(cur.read_byte_array()?);
            out.values.push(Value::Mechanism(Mechanism {
                mech_type,
                parameter,
            }));
        }
        'A' => out.values.push(Value::Attribute(Attribute::read(cur)?)),
        other => return Ok(halt(other, out)),
    }
    Ok(Flow::Continue)
}

/// `a<X>`: validity byte (attribute arrays are always valid), then a u32
/// element count, then `count` elements of type `X`.
fn decode_array(
    elem: char,
    cur: &mut Cursor<'_>,
    out: &mut DecodeOutput,
) -> Result<Flow, ProtocolError> {
    let valid = if elem == 'A' {
        true
    } else {
        cur.read_u8()? != 0
    };
    let count = cur.read_u32()?;

    // The absent-length sentinel only has meaning for byte blobs, which
    // share the length-prefixed encoding of string fields. For any other
    // element type the sentinel is just an unreasonable count.
    if elem == 'y' && count == ABSENT_LENGTH {
        if valid {
            out.values.push(Value::Bytes(Bytes::new()));
        } else {
            out.notes.push(Note::AbsentArray { declared: count });
        }
        return Ok(Flow::Continue);
    }
    if count > MAX_ARRAY_ELEMENTS {
        return Err(ProtocolError::UnreasonableLength {
            count,
            max: MAX_ARRAY_ELEMENTS,
        });
    }
    if !valid {
        out.notes.push(Note::AbsentArray { declared: count });
        return Ok(Flow::Continue);
    }
    if elem == 'y' {
        // A valid byte array is one blob of `count` raw bytes.
        let data = Bytes::copy_from_slice(cur.read_bytes(count as usize)?);
        out.values.push(Value::Bytes(data));
        return Ok(Flow::Continue);
    }
    for _ in 0..count {
        if decode_scalar(elem, cur, out)? == Flow::Halt {
            return Ok(Flow::Halt);
        }
    }
    Ok(Flow::Continue)
}

/// `f<X>`: descriptor of an output buffer the peer pre-declared.
fn decode_buffer(
    elem: char,
    cur: &mut Cursor<'_>,
    out: &mut DecodeOutput,
) -> Result<Flow, ProtocolError> {
    if elem == 'y' {
        let _flags = cur.read_u8()?;
    }
    let count = cur.read_u32()?;
    let info = match elem {
        'A' => {
            let mut slots = Vec::new();
            for _ in 0..count {
                let attr_type = cur.read_u32()?;
                let buffer_len = cur.read_u32()?;
                slots.push((attr_type, buffer_len));
            }
            BufferInfo::Attributes(slots)
        }
        // The count is itself the declared buffer size; the peer has not
        // supplied any data yet.
        'y' => BufferInfo::Bytes(count),
        'u' => BufferInfo::Ulong(cur.read_u32()?),
        other => return Err(ProtocolError::UnrecognizedBufferType(other)),
    };
    out.values.push(Value::Buffer(info));
    Ok(Flow::Continue)
}

fn hex_preview(data: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    const PREVIEW: usize = 16;
    for b in data.iter().take(PREVIEW) {
        write!(f, "{:02x}", b)?;
    }
    if data.len() > PREVIEW {
        write!(f, ".. ({} bytes)", data.len())?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ulong(v) => write!(f, "{} (0x{:x})", v, v),
            Value::Bytes(data) => hex_preview(data, f),
            Value::Str(data) => match std::str::from_utf8(data) {
                Ok(s) => write!(f, "{:?}", s.trim_end_matches([' ', '\0'])),
                Err(_) => hex_preview(data, f),
            },
            Value::Attribute(attr) => write!(f, "{}", attr),
            Value::Mechanism(mech) => write!(f, "{}", mech),
            Value::Buffer(info) => write!(f, "{}", info),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr 0x{:08x} ", self.attr_type)?;
        if self.valid {
            hex_preview(&self.data, f)
        } else {
            write!(f, "<invalid>")
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mech 0x{:08x} param ", self.mech_type)?;
        hex_preview(&self.parameter, f)
    }
}

impl fmt::Display for BufferInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferInfo::Bytes(n) => write!(f, "buffer<{} bytes>", n),
            BufferInfo::Attributes(slots) => {
                write!(f, "buffer<{} attr slots:", slots.len())?;
                for (t, len) in slots {
                    write!(f, " 0x{:08x}/{}", t, len)?;
                }
                write!(f, ">")
            }
            BufferInfo::Ulong(n) => write!(f, "buffer<ulong {}>", n),
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Version { major, minor } => write!(f, "version {}.{}", major, minor),
            Note::Byte(b) => write!(f, "byte 0x{:02x}", b),
            Note::AbsentArray { declared } => write!(f, "absent array (declared {})", declared),
            Note::UnrecognizedCode(c) => write!(f, "unrecognized format code {:?}", c),
            Note::TrailingBytes(n) => write!(f, "{} trailing bytes", n),
        }
    }
}
