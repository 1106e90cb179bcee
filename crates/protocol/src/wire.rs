//! Native protocol primitives
//!
//! Varints, length-prefixed strings and little-endian scalars. Decoders read
//! from `&mut &[u8]` and check the remaining length before every read, so a
//! short buffer yields [`ProtocolError::UnexpectedEnd`] instead of a panic.
//! The connection relies on that to tell "wait for more bytes" apart from
//! malformed input.

use bytes::{Buf, BufMut, BytesMut};

use crate::{ProtocolError, Result};

/// Longest valid LEB128 encoding of a u64
const MAX_VARINT_LEN: usize = 10;

// =============================================================================
// Encoding
// =============================================================================

/// Write an unsigned LEB128 varint
#[inline]
pub fn put_uvarint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Write a length-prefixed byte string
#[inline]
pub fn put_bytes(buf: &mut BytesMut, value: &[u8]) {
    put_uvarint(buf, value.len() as u64);
    buf.put_slice(value);
}

/// Write a length-prefixed UTF-8 string
#[inline]
pub fn put_string(buf: &mut BytesMut, value: &str) {
    put_bytes(buf, value.as_bytes());
}

/// Write a bool as a single byte
#[inline]
pub fn put_bool(buf: &mut BytesMut, value: bool) {
    buf.put_u8(u8::from(value));
}

// =============================================================================
// Decoding
// =============================================================================

/// Fail unless at least `needed` bytes remain
#[inline]
pub fn ensure(buf: &&[u8], needed: usize) -> Result<()> {
    if buf.len() < needed {
        return Err(ProtocolError::unexpected_end(needed, buf.len()));
    }
    Ok(())
}

/// Byte length of `rows` fixed-width values
///
/// A row count whose length overflows `usize` is garbage, not a short
/// read, so it is reported as `Unsupported` rather than `UnexpectedEnd`.
#[inline]
pub fn fixed_len(rows: usize, width: usize) -> Result<usize> {
    rows.checked_mul(width).ok_or_else(|| {
        ProtocolError::Unsupported(format!("{rows} rows of {width} bytes"))
    })
}

/// Read an unsigned LEB128 varint
pub fn get_uvarint(buf: &mut &[u8]) -> Result<u64> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        ensure(buf, 1)?;
        let byte = buf.get_u8();
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(ProtocolError::VarintOverflow);
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte < 0x80 {
            return Ok(value);
        }
    }
    Err(ProtocolError::VarintOverflow)
}

/// Read a length-prefixed byte string
pub fn get_bytes(buf: &mut &[u8]) -> Result<Vec<u8>> {
    let len = get_uvarint(buf)? as usize;
    ensure(buf, len)?;
    let value = buf[..len].to_vec();
    buf.advance(len);
    Ok(value)
}

/// Read a length-prefixed UTF-8 string
pub fn get_string(buf: &mut &[u8]) -> Result<String> {
    String::from_utf8(get_bytes(buf)?).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Read a single-byte bool
#[inline]
pub fn get_bool(buf: &mut &[u8]) -> Result<bool> {
    Ok(get_u8(buf)? != 0)
}

/// Read a u8
#[inline]
pub fn get_u8(buf: &mut &[u8]) -> Result<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

/// Read a little-endian i32
#[inline]
pub fn get_i32(buf: &mut &[u8]) -> Result<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32_le())
}

/// Read a little-endian i64
#[inline]
pub fn get_i64(buf: &mut &[u8]) -> Result<i64> {
    ensure(buf, 8)?;
    Ok(buf.get_i64_le())
}

/// Take exactly `len` raw bytes
pub fn get_raw<'a>(buf: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    ensure(buf, len)?;
    let slice: &'a [u8] = *buf;
    let (head, tail) = slice.split_at(len);
    *buf = tail;
    Ok(head)
}

#[cfg(test)]
#[path = "wire_test.rs"]
mod wire_test;
