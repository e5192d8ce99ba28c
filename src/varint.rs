//! LEB128 varint and zigzag primitives shared by the reader and writer.
//!
//! `write_varint64`/`read_varint` operate on `(lo, hi)` 32-bit halves rather
//! than a bare `u64` parameter, even though Rust has native 64-bit integers.
//! This mirrors the algorithm the codec is specified to implement (a host
//! without native 64-bit integers builds the same varint one 32-bit half at
//! a time) and keeps [`Long64`](crate::long64::Long64) able to hand either
//! half to the wire layer without ever materializing a `u64` it doesn't
//! otherwise need.

use bytes::{Buf, BufMut};

use crate::error::ReadError;

/// Encodes `value` as a LEB128 varint (1-5 bytes) into `buf`.
#[inline]
pub fn write_varint32(mut value: u32, buf: &mut impl BufMut) {
    for _ in 0..5 {
        if value < 0x80 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

/// The encoded width, in bytes, of `write_varint32(value, _)`.
#[inline]
pub fn encoded_len_varint32(value: u32) -> usize {
    encoded_len_varint64_raw(u64::from(value))
}

/// Encodes the 64-bit value `(hi << 32) | lo` as a LEB128 varint (1-10
/// bytes) into `buf`. A negative `int32` sign-extended to 64 bits lands here
/// with `hi == 0xffff_ffff`, producing the canonical 10-byte proto3 encoding.
#[inline]
pub fn write_varint64(lo: u32, hi: u32, buf: &mut impl BufMut) {
    let mut value = (u64::from(hi) << 32) | u64::from(lo);
    for _ in 0..10 {
        if value < 0x80 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8(((value & 0x7f) | 0x80) as u8);
        value >>= 7;
    }
}

/// The encoded width, in bytes, of `write_varint64(lo, hi, _)`.
#[inline]
pub fn encoded_len_varint64(lo: u32, hi: u32) -> usize {
    encoded_len_varint64_raw((u64::from(hi) << 32) | u64::from(lo))
}

#[inline]
fn encoded_len_varint64_raw(value: u64) -> usize {
    // Every 7 bits needs another byte; `value | 1` avoids a zero-special-case
    // in the leading_zeros computation (mirrors the teacher's bit trick).
    ((((value | 1).leading_zeros() ^ 63) * 9 + 73) / 64) as usize
}

/// Decodes a LEB128 varint, returning `(lo, hi, bytes_consumed)`.
///
/// Fails with [`ReadError::MalformedVarint`] if the stream ends before a
/// terminating byte is found, or if a 10th byte is still read with its
/// continuation bit set.
pub fn read_varint(buf: &mut impl Buf) -> Result<(u32, u32, usize), ReadError> {
    let mut value: u64 = 0;
    for i in 0..10 {
        if !buf.has_remaining() {
            return Err(ReadError::MalformedVarint);
        }
        let byte = buf.get_u8();
        if i < 9 {
            value |= u64::from(byte & 0x7f) << (7 * i);
        } else {
            // The 10th byte of a 64-bit varint may only carry the single
            // remaining bit; proto3 varints never span an 11th byte.
            if byte & 0xfe != 0 {
                return Err(ReadError::MalformedVarint);
            }
            value |= u64::from(byte & 0x1) << 63;
        }
        if byte < 0x80 {
            return Ok((value as u32, (value >> 32) as u32, i + 1));
        }
    }
    Err(ReadError::MalformedVarint)
}

/// Zigzag-encodes a signed 32-bit integer: small magnitudes (positive or
/// negative) map to small unsigned values.
#[inline]
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
#[inline]
pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Zigzag-encodes a signed 64-bit integer given as `(lo, hi)` halves,
/// following the exact bit formula the reflection spec documents:
/// `sign = hi >> 31 (arithmetic)`, `lo' = (lo << 1) ^ sign`,
/// `hi' = ((hi << 1) | (lo >> 31)) ^ sign`.
#[inline]
pub fn zigzag_encode64(lo: u32, hi: u32) -> (u32, u32) {
    let sign = (hi as i32 >> 31) as u32;
    let lo_out = (lo << 1) ^ sign;
    let hi_out = ((hi << 1) | (lo >> 31)) ^ sign;
    (lo_out, hi_out)
}

/// Inverse of [`zigzag_encode64`].
#[inline]
pub fn zigzag_decode64(lo: u32, hi: u32) -> (u32, u32) {
    // Zigzag is an involution once you recompute the sign from the encoded
    // low bit rather than from `hi`: the encoded sign lives in bit 0 of `lo`.
    let sign = 0u32.wrapping_sub(lo & 1);
    let lo_out = (lo >> 1) | (hi << 31);
    let hi_out = hi >> 1;
    (lo_out ^ sign, hi_out ^ sign)
}
