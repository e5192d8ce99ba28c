//! A growable, fork-capable byte emitter producing proto3 wire output.
//!
//! Mirrors the teacher's encoding primitives (`encode_key`/`encode_varint`
//! etc. in the upstream `prost` crate) but as a stateful object with a
//! fork/join stack, since the reflective writer needs to produce
//! length-prefixed sub-regions (nested messages, packed repeats) without
//! knowing their length in advance.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::WriteError;
use crate::long64::Long64;
use crate::varint;
use crate::wire::WireType;

/// A growable proto3 byte emitter with fork/join support for
/// length-delimited sub-regions.
///
/// Not safe for concurrent use from multiple threads; callers needing
/// concurrent encodes should use one `BinaryWriter` per operation.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    /// Completed, immutable chunks already flushed out of `buf`.
    chunks: Vec<Bytes>,
    /// The in-progress buffer that typed writes append to.
    buf: BytesMut,
    /// Saved `(chunks, buf)` pairs for each open `fork()`.
    forks: Vec<(Vec<Bytes>, BytesMut)>,
}

impl BinaryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let chunk = self.buf.split().freeze();
            self.chunks.push(chunk);
        }
    }

    /// Emits `(field_no << 3) | wire_type` as a `uint32` varint.
    pub fn tag(&mut self, field_no: u32, wire_type: WireType) -> &mut Self {
        crate::wire::encode_tag(field_no, wire_type, &mut self.buf);
        self
    }

    /// Flushes the in-progress buffer, then appends `data` as a new chunk
    /// without copying it.
    pub fn raw(&mut self, data: Bytes) -> &mut Self {
        self.flush();
        self.chunks.push(data);
        self
    }

    /// Writes an unsigned varint. Fails if `value` does not fit in `u32`.
    pub fn uint32(&mut self, value: u64) -> Result<&mut Self, WriteError> {
        if value > u32::MAX as u64 {
            return Err(WriteError::RangeError { op: "uint32" });
        }
        varint::write_varint32(value as u32, &mut self.buf);
        Ok(self)
    }

    /// Writes a signed varint; negative values are sign-extended and emitted
    /// as 10-byte varints per the proto3 `int32` rule.
    pub fn int32(&mut self, value: i64) -> Result<&mut Self, WriteError> {
        if value < i32::MIN as i64 || value > i32::MAX as i64 {
            return Err(WriteError::RangeError { op: "int32" });
        }
        let value = value as i32;
        if value < 0 {
            varint::write_varint64(value as u32, 0xffff_ffff, &mut self.buf);
        } else {
            varint::write_varint32(value as u32, &mut self.buf);
        }
        Ok(self)
    }

    /// Writes a zigzag-encoded signed varint.
    pub fn sint32(&mut self, value: i64) -> Result<&mut Self, WriteError> {
        if value < i32::MIN as i64 || value > i32::MAX as i64 {
            return Err(WriteError::RangeError { op: "sint32" });
        }
        varint::write_varint32(varint::zigzag_encode32(value as i32), &mut self.buf);
        Ok(self)
    }

    /// Writes a single `0`/`1` byte.
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(value as u8);
        self
    }

    /// Writes a `uint32` length prefix followed by `value` verbatim.
    pub fn bytes(&mut self, value: &[u8]) -> Result<&mut Self, WriteError> {
        if value.len() > u32::MAX as usize {
            return Err(WriteError::RangeError { op: "bytes" });
        }
        varint::write_varint32(value.len() as u32, &mut self.buf);
        self.buf.put_slice(value);
        Ok(self)
    }

    /// UTF-8 encodes `value` and writes it as `bytes`.
    pub fn string(&mut self, value: &str) -> Result<&mut Self, WriteError> {
        self.bytes(value.as_bytes())
    }

    /// Writes 4 little-endian bytes. Narrowing from `f64` is permissive: only
    /// the bit pattern of `value as f32` is ever emitted, matching the
    /// reference behavior documented in SPEC_FULL.md's design notes.
    pub fn float(&mut self, value: f64) -> &mut Self {
        self.buf.put_f32_le(value as f32);
        self
    }

    /// Writes 8 little-endian bytes.
    pub fn double(&mut self, value: f64) -> &mut Self {
        self.buf.put_f64_le(value);
        self
    }

    /// Writes 4 little-endian bytes, unsigned. Fails if `value` does not fit
    /// in `u32`.
    pub fn fixed32(&mut self, value: u64) -> Result<&mut Self, WriteError> {
        if value > u32::MAX as u64 {
            return Err(WriteError::RangeError { op: "fixed32" });
        }
        self.buf.put_u32_le(value as u32);
        Ok(self)
    }

    /// Writes 4 little-endian bytes, signed. Fails if `value` does not fit
    /// in `i32`.
    pub fn sfixed32(&mut self, value: i64) -> Result<&mut Self, WriteError> {
        if value < i32::MIN as i64 || value > i32::MAX as i64 {
            return Err(WriteError::RangeError { op: "sfixed32" });
        }
        self.buf.put_i32_le(value as i32);
        Ok(self)
    }

    /// Writes 8 little-endian bytes (`fixed64`/`sfixed64`; sign is just a
    /// bit pattern at this width, so one method covers both).
    pub fn fixed64(&mut self, value: Long64) -> &mut Self {
        let (lo, hi) = value.halves();
        self.buf.put_u32_le(lo);
        self.buf.put_u32_le(hi);
        self
    }

    /// Writes an unsigned 64-bit varint.
    pub fn uint64(&mut self, value: Long64) -> &mut Self {
        let (lo, hi) = value.halves();
        varint::write_varint64(lo, hi, &mut self.buf);
        self
    }

    /// Writes a signed 64-bit varint.
    pub fn int64(&mut self, value: Long64) -> &mut Self {
        self.uint64(value)
    }

    /// Writes a zigzag-encoded signed 64-bit varint.
    pub fn sint64(&mut self, value: Long64) -> &mut Self {
        let (lo, hi) = value.halves();
        let (lo, hi) = varint::zigzag_encode64(lo, hi);
        varint::write_varint64(lo, hi, &mut self.buf);
        self
    }

    /// Pushes the current `(chunks, buf)` state onto the fork stack and
    /// starts a fresh, empty one. Pair with [`join`](Self::join).
    pub fn fork(&mut self) -> &mut Self {
        let chunks = core::mem::take(&mut self.chunks);
        let buf = core::mem::take(&mut self.buf);
        self.forks.push((chunks, buf));
        self
    }

    /// Finishes the current fork's output into a contiguous byte sequence,
    /// restores the state saved by the matching [`fork`](Self::fork), then
    /// emits a `uint32` length prefix followed by the fork's bytes.
    ///
    /// Fails with [`WriteError::EmptyForkStack`] if no fork is open.
    pub fn join(&mut self) -> Result<&mut Self, WriteError> {
        self.flush();
        let forked_chunks = core::mem::take(&mut self.chunks);
        let (outer_chunks, outer_buf) =
            self.forks.pop().ok_or(WriteError::EmptyForkStack)?;
        self.chunks = outer_chunks;
        self.buf = outer_buf;

        let body = concat_chunks(forked_chunks);
        self.bytes_raw_length_prefixed(body)
    }

    fn bytes_raw_length_prefixed(&mut self, body: Bytes) -> Result<&mut Self, WriteError> {
        if body.len() > u32::MAX as usize {
            return Err(WriteError::RangeError { op: "join" });
        }
        varint::write_varint32(body.len() as u32, &mut self.buf);
        Ok(self.raw(body))
    }

    /// Concatenates all completed chunks (flushing the in-progress buffer
    /// first) into a single byte sequence, and resets the writer to a fresh
    /// state. Any forks left un-joined are silently dropped — an abandoned
    /// fork is not an error, it simply never contributes bytes. Dropping an
    /// open fork means discarding everything written since its matching
    /// `fork()` call, then falling back to the state that call saved; if
    /// several forks were opened without being joined, only the outermost
    /// saved state (everything written before the first of them) survives.
    pub fn finish(&mut self) -> Bytes {
        if let Some((chunks, buf)) = self.forks.drain(..).next() {
            self.chunks = chunks;
            self.buf = buf;
        }
        self.forks.clear();
        self.flush();
        let chunks = core::mem::take(&mut self.chunks);
        concat_chunks(chunks)
    }
}

fn concat_chunks(chunks: Vec<Bytes>) -> Bytes {
    if chunks.len() == 1 {
        return chunks.into_iter().next().unwrap();
    }
    let total: usize = chunks.iter().map(Bytes::len).sum();
    let mut out = BytesMut::with_capacity(total);
    for chunk in chunks {
        out.put_slice(&chunk);
    }
    out.freeze()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_int32_field_150() {
        let mut w = BinaryWriter::new();
        w.tag(1, WireType::Varint);
        w.int32(150).unwrap();
        assert_eq!(&w.finish()[..], &[0x08, 0x96, 0x01]);
    }

    #[test]
    fn s2_string_field_testing() {
        let mut w = BinaryWriter::new();
        w.tag(2, WireType::LengthDelimited);
        w.string("testing").unwrap();
        assert_eq!(
            &w.finish()[..],
            &[0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]
        );
    }

    #[test]
    fn s4_negative_int32_is_ten_bytes() {
        let mut w = BinaryWriter::new();
        w.tag(1, WireType::Varint);
        w.int32(-1).unwrap();
        assert_eq!(
            &w.finish()[..],
            &[0x08, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn s5_sint32_negative_one() {
        let mut w = BinaryWriter::new();
        w.tag(1, WireType::Varint);
        w.sint32(-1).unwrap();
        assert_eq!(&w.finish()[..], &[0x08, 0x01]);
    }

    #[test]
    fn join_without_fork_errors() {
        let mut w = BinaryWriter::new();
        assert_eq!(w.join().unwrap_err(), WriteError::EmptyForkStack);
    }

    #[test]
    fn fork_join_prepends_length_of_inner_output() {
        let mut baseline = BinaryWriter::new();
        baseline.tag(1, WireType::Varint).int32(5).unwrap();
        let inner = baseline.finish();

        let mut w = BinaryWriter::new();
        w.fork();
        w.tag(1, WireType::Varint).int32(5).unwrap();
        w.join().unwrap();
        let joined = w.finish();

        let mut expected = Vec::new();
        expected.push(inner.len() as u8);
        expected.extend_from_slice(&inner);
        assert_eq!(&joined[..], &expected[..]);
    }

    #[test]
    fn finish_without_join_drops_the_abandoned_fork_but_keeps_prior_bytes() {
        let mut w = BinaryWriter::new();
        w.tag(1, WireType::Varint).int32(5).unwrap();
        w.fork();
        w.tag(2, WireType::Varint).int32(9).unwrap();
        assert_eq!(&w.finish()[..], &[0x08, 0x05]);
    }

    #[test]
    fn finish_with_nested_abandoned_forks_keeps_only_outermost_prior_bytes() {
        let mut w = BinaryWriter::new();
        w.tag(1, WireType::Varint).int32(5).unwrap();
        w.fork();
        w.tag(2, WireType::Varint).int32(9).unwrap();
        w.fork();
        w.tag(3, WireType::Varint).int32(3).unwrap();
        assert_eq!(&w.finish()[..], &[0x08, 0x05]);
    }

    #[test]
    fn range_errors_reject_out_of_range_values() {
        let mut w = BinaryWriter::new();
        assert_eq!(
            w.uint32(u32::MAX as u64 + 1).unwrap_err(),
            WriteError::RangeError { op: "uint32" }
        );
        assert_eq!(
            w.int32(i32::MAX as i64 + 1).unwrap_err(),
            WriteError::RangeError { op: "int32" }
        );
    }
}
