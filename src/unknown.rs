//! Per-message storage of unrecognized tagged bytes, preserving insertion
//! order so re-serialization through an older schema is lossless (see
//! Testable Property 7 in SPEC_FULL.md).

use bytes::Bytes;

use crate::error::WriteError;
use crate::wire::WireType;
use crate::writer::BinaryWriter;

/// One recorded unknown field: its number, wire type, and raw value bytes.
/// For `LengthDelimited` entries, `data` is the *content* only — the length
/// prefix is reconstructed on replay, not stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownField {
    pub field_no: u32,
    pub wire_type: WireType,
    pub data: Bytes,
}

/// An ordered list of [`UnknownField`]s belonging to one decoded message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnknownFieldStore {
    entries: Vec<UnknownField>,
}

impl UnknownFieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a recorded unknown field, preserving call order.
    pub fn push(&mut self, field_no: u32, wire_type: WireType, data: Bytes) {
        self.entries.push(UnknownField {
            field_no,
            wire_type,
            data,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnknownField> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replays every recorded field verbatim, in recorded order.
    pub fn write_to(&self, writer: &mut BinaryWriter) -> Result<(), WriteError> {
        for field in &self.entries {
            writer.tag(field.field_no, field.wire_type);
            match field.wire_type {
                WireType::Varint | WireType::Bit32 | WireType::Bit64 => {
                    writer.raw(field.data.clone());
                }
                WireType::LengthDelimited => {
                    writer.bytes(&field.data)?;
                }
            }
        }
        Ok(())
    }
}
