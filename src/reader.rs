//! A byte cursor over a fully-buffered proto3 wire region, with typed read
//! operations for every scalar and wire-level primitive.
//!
//! Generic over [`bytes::Buf`] rather than a concrete slice type, so callers
//! can back it with `&[u8]`, `Bytes`, a chain of buffers, or any other `Buf`
//! implementation — this is the Rust equivalent of the distilled spec's
//! `readerFactory` hook (see SPEC_FULL.md REDESIGN FLAGS).

use bytes::{Buf, Bytes};

use crate::error::ReadError;
use crate::long64::{Long64, Signedness};
use crate::varint;
use crate::wire::WireType;

/// A cursor over a proto3 wire byte region.
pub struct BinaryReader<B> {
    buf: B,
    total_len: usize,
}

impl<B: Buf> BinaryReader<B> {
    /// Wraps `buf`, treating its current `remaining()` as the cursor's
    /// declared length.
    pub fn new(buf: B) -> Self {
        let total_len = buf.remaining();
        BinaryReader { buf, total_len }
    }

    /// Bytes consumed so far.
    pub fn pos(&self) -> usize {
        self.total_len - self.buf.remaining()
    }

    /// Total length the cursor was constructed with.
    pub fn len(&self) -> usize {
        self.total_len
    }

    /// Whether the cursor has reached its declared end.
    pub fn is_empty(&self) -> bool {
        self.buf.remaining() == 0
    }

    /// Bytes left to read before the cursor's declared end.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn require(&self, n: usize) -> Result<(), ReadError> {
        if self.buf.remaining() < n {
            Err(ReadError::TruncatedInput {
                requested: n,
                remaining: self.buf.remaining(),
            })
        } else {
            Ok(())
        }
    }

    /// Reads a wire tag, returning `(field_no, wire_type)`.
    pub fn tag(&mut self) -> Result<(u32, WireType), ReadError> {
        crate::wire::decode_tag(&mut self.buf)
    }

    /// Skips a value of the given wire type without interpreting it,
    /// returning the number of bytes skipped.
    pub fn skip(&mut self, wire_type: WireType) -> Result<usize, ReadError> {
        let before = self.buf.remaining();
        match wire_type {
            WireType::Varint => {
                varint::read_varint(&mut self.buf)?;
            }
            WireType::Bit32 => {
                self.require(4)?;
                self.buf.advance(4);
            }
            WireType::Bit64 => {
                self.require(8)?;
                self.buf.advance(8);
            }
            WireType::LengthDelimited => {
                let len = self.read_length_prefix()?;
                self.require(len)?;
                self.buf.advance(len);
            }
        }
        Ok(before - self.buf.remaining())
    }

    /// Like [`skip`](Self::skip), but returns the raw bytes that made up the
    /// value (for the unknown-field recorder). For `LengthDelimited`, this
    /// is the *content* only — the length prefix is reconstructed on replay.
    pub fn skip_capture(&mut self, wire_type: WireType) -> Result<Bytes, ReadError> {
        match wire_type {
            WireType::Varint => {
                let mut raw = Vec::with_capacity(4);
                for _ in 0..10 {
                    self.require(1)?;
                    let byte = self.buf.get_u8();
                    raw.push(byte);
                    if byte < 0x80 {
                        return Ok(Bytes::from(raw));
                    }
                }
                Err(ReadError::MalformedVarint)
            }
            WireType::Bit32 => {
                self.require(4)?;
                Ok(self.buf.copy_to_bytes(4))
            }
            WireType::Bit64 => {
                self.require(8)?;
                Ok(self.buf.copy_to_bytes(8))
            }
            WireType::LengthDelimited => {
                let len = self.read_length_prefix()?;
                self.require(len)?;
                Ok(self.buf.copy_to_bytes(len))
            }
        }
    }

    fn read_length_prefix(&mut self) -> Result<usize, ReadError> {
        let (lo, hi, _) = varint::read_varint(&mut self.buf)?;
        if hi != 0 {
            // A length prefix can never legitimately exceed u32, let alone
            // need the high half; treat it as a malformed varint.
            return Err(ReadError::MalformedVarint);
        }
        Ok(lo as usize)
    }

    pub fn int32(&mut self) -> Result<i32, ReadError> {
        let (lo, _hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(lo as i32)
    }

    pub fn uint32(&mut self) -> Result<u32, ReadError> {
        let (lo, _hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(lo)
    }

    pub fn sint32(&mut self) -> Result<i32, ReadError> {
        let (lo, _hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(varint::zigzag_decode32(lo))
    }

    pub fn bool(&mut self) -> Result<bool, ReadError> {
        let (lo, _hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(lo != 0)
    }

    pub fn fixed32(&mut self) -> Result<u32, ReadError> {
        self.require(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn sfixed32(&mut self) -> Result<i32, ReadError> {
        self.require(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn float(&mut self) -> Result<f32, ReadError> {
        self.require(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn double(&mut self) -> Result<f64, ReadError> {
        self.require(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Reads a length-delimited byte chunk.
    pub fn bytes(&mut self) -> Result<Bytes, ReadError> {
        let len = self.read_length_prefix()?;
        self.require(len)?;
        Ok(self.buf.copy_to_bytes(len))
    }

    /// Reads a length-delimited, UTF-8 validated string.
    pub fn string(&mut self) -> Result<String, ReadError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ReadError::InvalidUtf8)
    }

    pub fn int64(&mut self) -> Result<Long64, ReadError> {
        let (lo, hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(Long64::from_halves(lo, hi, Signedness::Signed))
    }

    pub fn uint64(&mut self) -> Result<Long64, ReadError> {
        let (lo, hi, _) = varint::read_varint(&mut self.buf)?;
        Ok(Long64::from_halves(lo, hi, Signedness::Unsigned))
    }

    pub fn sint64(&mut self) -> Result<Long64, ReadError> {
        let (lo, hi, _) = varint::read_varint(&mut self.buf)?;
        let (lo, hi) = varint::zigzag_decode64(lo, hi);
        Ok(Long64::from_halves(lo, hi, Signedness::Signed))
    }

    pub fn fixed64(&mut self) -> Result<Long64, ReadError> {
        self.require(8)?;
        let value = self.buf.get_u64_le();
        Ok(Long64::from_halves(
            value as u32,
            (value >> 32) as u32,
            Signedness::Unsigned,
        ))
    }

    pub fn sfixed64(&mut self) -> Result<Long64, ReadError> {
        self.require(8)?;
        let value = self.buf.get_u64_le();
        Ok(Long64::from_halves(
            value as u32,
            (value >> 32) as u32,
            Signedness::Signed,
        ))
    }
}
