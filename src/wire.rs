//! The wire-type enumeration and tag encoding shared by the reader and writer.

use crate::error::ReadError;
use crate::varint;

/// One of the five wire types proto3 uses to tag a field's value. Groups
/// (wire types 3 and 4) are not part of proto3 and are not supported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Varint-encoded: int32, int64, uint32, uint64, sint32, sint64, bool, enum.
    Varint = 0,
    /// 8 fixed little-endian bytes: fixed64, sfixed64, double.
    Bit64 = 1,
    /// A varint length prefix followed by that many bytes: string, bytes,
    /// embedded messages, packed repeated fields.
    LengthDelimited = 2,
    /// 4 fixed little-endian bytes: fixed32, sfixed32, float.
    Bit32 = 5,
}

impl WireType {
    /// The integer tag this variant is encoded as on the wire.
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for WireType {
    type Error = ReadError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Bit64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Bit32),
            _ => Err(ReadError::InvalidWireType { value }),
        }
    }
}

/// Smallest and largest field numbers proto3 allows (field 0 is reserved;
/// 19000-19999 are reserved for implementations, but that restriction lives
/// above this layer in schema validation, not the wire codec).
pub const MIN_FIELD_NO: u32 = 1;
pub const MAX_FIELD_NO: u32 = (1 << 29) - 1;

/// Encodes `(field_no << 3) | wire_type` as a `uint32` varint into `buf`.
pub fn encode_tag(field_no: u32, wire_type: WireType, buf: &mut impl bytes::BufMut) {
    debug_assert!((MIN_FIELD_NO..=MAX_FIELD_NO).contains(&field_no));
    let key = (field_no << 3) | wire_type.as_u32();
    varint::write_varint32(key, buf);
}

/// The encoded width, in bytes, of `encode_tag(field_no, _, _)`.
pub fn tag_len(field_no: u32) -> usize {
    varint::encoded_len_varint32(field_no << 3)
}

/// Decodes a wire tag, returning `(field_no, wire_type)`.
pub fn decode_tag(buf: &mut impl bytes::Buf) -> Result<(u32, WireType), ReadError> {
    let (lo, _hi, _len) = varint::read_varint(buf)?;
    let wire_type = WireType::try_from(lo & 0x7)?;
    let field_no = lo >> 3;
    Ok((field_no, wire_type))
}
