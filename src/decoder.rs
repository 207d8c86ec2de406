// src/decoder.rs
//! Streaming frame decoder for the binary market-data wire format.
//!
//! Frames are a little-endian header (`seq: u32, size: u32`), one type byte
//! in `{A, U, D, E}`, then `size - 1` body bytes. The decoder is resumable:
//! `push` appends arbitrary chunks to an internal buffer and `next_record`
//! yields complete records as they become available, so frames may straddle
//! chunk boundaries freely. `finish` tells a clean end of stream apart from
//! truncation mid-record.

use crate::book::Symbol;
use thiserror::Error;

/// Wire header length in bytes. Configurable upward; the seq and size
/// fields always occupy the first eight bytes.
pub const DEFAULT_HEADER_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub seq: u32,
    pub size: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MsgType {
    Add,
    Update,
    Delete,
    Execute,
}

impl MsgType {
    fn from_wire(b: u8) -> Option<MsgType> {
        match b {
            b'A' => Some(MsgType::Add),
            b'U' => Some(MsgType::Update),
            b'D' => Some(MsgType::Delete),
            b'E' => Some(MsgType::Execute),
            _ => None,
        }
    }

    // Packed body sizes: symbol[3] + order_id[8] + side[1], then per type
    // reserved[3] + volume[8] + price[4] + reserved[4] (A/U) or
    // reserved[3] + traded_qty[8] (E).
    const fn body_len(self) -> usize {
        match self {
            MsgType::Add | MsgType::Update => 31,
            MsgType::Delete => 12,
            MsgType::Execute => 23,
        }
    }
}

/// Decoded message body. The side stays a raw wire byte here; validation
/// happens in the book engine so that a bad side drops one record instead
/// of killing the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Body {
    Add {
        symbol: Symbol,
        order_id: u64,
        side: u8,
        volume: u64,
        price: i32,
    },
    Update {
        symbol: Symbol,
        order_id: u64,
        side: u8,
        volume: u64,
        price: i32,
    },
    Delete {
        symbol: Symbol,
        order_id: u64,
        side: u8,
    },
    Execute {
        symbol: Symbol,
        order_id: u64,
        side: u8,
        traded_qty: u64,
    },
}

impl Body {
    #[inline]
    pub fn symbol(&self) -> Symbol {
        match *self {
            Body::Add { symbol, .. }
            | Body::Update { symbol, .. }
            | Body::Delete { symbol, .. }
            | Body::Execute { symbol, .. } => symbol,
        }
    }
}

/// One fully framed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Record {
    pub seq: u32,
    pub body: Body,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("unknown message type byte 0x{0:02x}")]
    UnknownType(u8),
    #[error("header size {header} does not match expected body length {expected}")]
    SizeMismatch { header: u32, expected: usize },
    #[error("stream truncated mid-record ({buffered} bytes left in buffer)")]
    Truncated { buffered: usize },
}

pub struct FrameDecoder {
    buf: Vec<u8>,
    pos: usize,
    header_len: usize,
    header: Option<Header>,
    msg_type: Option<MsgType>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_header_len(DEFAULT_HEADER_LEN)
    }

    /// `header_len` must be at least eight bytes; anything past the seq and
    /// size fields is skipped.
    pub fn with_header_len(header_len: usize) -> Self {
        assert!(header_len >= 8, "header length below the seq/size fields");
        Self {
            buf: Vec::new(),
            pos: 0,
            header_len,
            header: None,
            msg_type: None,
        }
    }

    /// Appends one chunk of raw input.
    pub fn push(&mut self, chunk: &[u8]) {
        // reclaim the consumed prefix before growing
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    #[inline]
    fn take(&mut self, count: usize) -> Option<&[u8]> {
        if self.buf.len() - self.pos < count {
            return None;
        }
        let raw = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Some(raw)
    }

    /// Yields the next complete record, or `Ok(None)` when more input is
    /// needed. Unknown type bytes and size mismatches are fatal for the
    /// stream.
    pub fn next_record(&mut self) -> Result<Option<Record>, FrameError> {
        let header = match self.header {
            Some(h) => h,
            None => {
                let n = self.header_len;
                let Some(raw) = self.take(n) else {
                    return Ok(None);
                };
                let h = Header {
                    seq: u32_le(raw, 0),
                    size: u32_le(raw, 4),
                };
                self.header = Some(h);
                h
            }
        };

        let msg_type = match self.msg_type {
            Some(t) => t,
            None => {
                let Some(raw) = self.take(1) else {
                    return Ok(None);
                };
                let b = raw[0];
                let t = MsgType::from_wire(b).ok_or(FrameError::UnknownType(b))?;
                self.msg_type = Some(t);
                t
            }
        };

        // size counts the type byte plus the body; cross-check it against
        // the layout before trusting it
        let expected = msg_type.body_len();
        if header.size as usize != expected + 1 {
            return Err(FrameError::SizeMismatch {
                header: header.size,
                expected,
            });
        }

        let Some(raw) = self.take(expected) else {
            return Ok(None);
        };
        let body = parse_body(msg_type, raw);
        self.header = None;
        self.msg_type = None;
        Ok(Some(Record { seq: header.seq, body }))
    }

    /// Call at end of input: `Ok` on a clean record boundary, `Truncated`
    /// if a partial record is still pending.
    pub fn finish(&self) -> Result<(), FrameError> {
        if self.header.is_none() && self.msg_type.is_none() && self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(FrameError::Truncated {
                buffered: self.buf.len() - self.pos,
            })
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_body(msg_type: MsgType, b: &[u8]) -> Body {
    let symbol = Symbol([b[0], b[1], b[2]]);
    let order_id = u64_le(b, 3);
    let side = b[11];

    match msg_type {
        MsgType::Add => Body::Add {
            symbol,
            order_id,
            side,
            volume: u64_le(b, 15),
            price: i32_le(b, 23),
        },
        MsgType::Update => Body::Update {
            symbol,
            order_id,
            side,
            volume: u64_le(b, 15),
            price: i32_le(b, 23),
        },
        MsgType::Delete => Body::Delete {
            symbol,
            order_id,
            side,
        },
        MsgType::Execute => Body::Execute {
            symbol,
            order_id,
            side,
            traded_qty: u64_le(b, 15),
        },
    }
}

#[inline]
fn u32_le(b: &[u8], off: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&b[off..off + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
fn u64_le(b: &[u8], off: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[off..off + 8]);
    u64::from_le_bytes(raw)
}

#[inline]
fn i32_le(b: &[u8], off: usize) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&b[off..off + 4]);
    i32::from_le_bytes(raw)
}
