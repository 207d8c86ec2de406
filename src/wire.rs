// src/wire.rs
use bytes::Bytes;
use itoa::Buffer;

use crate::book::{Level, Symbol};

#[inline(always)]
fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(s.as_bytes());
}

#[inline(always)]
fn push_u64(out: &mut Vec<u8>, buf: &mut Buffer, v: u64) {
    push_str(out, buf.format(v));
}

#[inline(always)]
fn push_i32(out: &mut Vec<u8>, buf: &mut Buffer, v: i32) {
    push_str(out, buf.format(v));
}

fn push_levels(out: &mut Vec<u8>, buf: &mut Buffer, levels: &[Level]) {
    out.push(b'[');
    for (i, lv) in levels.iter().enumerate() {
        if i != 0 {
            push_str(out, ", ");
        }
        out.push(b'(');
        push_i32(out, buf, lv.price);
        push_str(out, ", ");
        push_u64(out, buf, lv.volume);
        out.push(b')');
    }
    out.push(b']');
}

/// Encodes one depth line:
/// `{seq}, {symbol}, [(price, volume), ...], [(price, volume), ...]\n`
/// with bids descending and asks ascending, empty sides rendered as `[]`.
pub fn encode_depth_line(seq: u32, symbol: Symbol, bids: &[Level], asks: &[Level]) -> Bytes {
    let mut out = Vec::with_capacity(24 + (bids.len() + asks.len()) * 24);
    let mut b = Buffer::new();

    push_u64(&mut out, &mut b, seq as u64);
    push_str(&mut out, ", ");
    out.extend_from_slice(symbol.as_bytes());
    push_str(&mut out, ", ");
    push_levels(&mut out, &mut b, bids);
    push_str(&mut out, ", ");
    push_levels(&mut out, &mut b, asks);
    out.push(b'\n');

    Bytes::from(out)
}
