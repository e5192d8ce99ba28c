//! Decodes a proto3 wire byte stream into a [`DynamicMessage`], driven
//! entirely by a [`MessageInfo`] field table rather than per-message
//! generated code.

use bytes::{Buf, Bytes};

use crate::descriptor::{FieldInfo, FieldKind, MapValueKind, MessageInfo, Repeat, ScalarType};
use crate::error::ReadError;
use crate::long64::{reflection_long_convert, LongType};
use crate::options::{ReadOptions, UnknownFieldPolicy};
use crate::reader::BinaryReader;
use crate::value::{DynamicMessage, FieldValue, MapKey, OneofValue, Value};
use crate::wire::WireType;

/// Decodes proto3 wire bytes into a [`DynamicMessage`] shaped by a
/// [`MessageInfo`]. Safe to share across threads: all state it holds is
/// immutable field metadata (the field index `MessageInfo` itself
/// lazily builds and memoizes).
pub struct ReflectionBinaryReader<'a> {
    info: &'a MessageInfo,
}

impl<'a> ReflectionBinaryReader<'a> {
    pub fn new(info: &'a MessageInfo) -> Self {
        ReflectionBinaryReader { info }
    }

    /// Decodes from the reader's current position through to its end,
    /// merging each field into `target` per the rules in SPEC_FULL.md
    /// §4.4. Nested messages and map entries are decoded by slicing their
    /// length-delimited bytes into a fresh [`BinaryReader`] and recursing
    /// into this same method, so a sub-message's "end" is just that
    /// sub-reader's end — there is no separate bounded-length variant.
    pub fn read<B: Buf>(
        &self,
        reader: &mut BinaryReader<B>,
        target: &mut DynamicMessage,
        options: &ReadOptions,
    ) -> Result<(), ReadError> {
        let end_pos = reader.len();

        while reader.pos() < end_pos {
            let (field_no, wire_type) = reader.tag()?;

            let field = match self.info.field(field_no) {
                Some(field) => field,
                None => {
                    self.handle_unknown_field(reader, target, options, field_no, wire_type)?;
                    continue;
                }
            };

            self.read_known_field(reader, target, options, field, wire_type)?;
        }
        Ok(())
    }

    fn handle_unknown_field<B: Buf>(
        &self,
        reader: &mut BinaryReader<B>,
        target: &mut DynamicMessage,
        options: &ReadOptions,
        field_no: u32,
        wire_type: WireType,
    ) -> Result<(), ReadError> {
        match &options.unknown_field_policy {
            UnknownFieldPolicy::Throw => Err(ReadError::UnknownField {
                type_name: self.info.type_name.to_string(),
                field_no,
                wire_type,
            }),
            UnknownFieldPolicy::Skip => {
                reader.skip(wire_type)?;
                Ok(())
            }
            UnknownFieldPolicy::Record => {
                let raw = reader.skip_capture(wire_type)?;
                target.unknown.push(field_no, wire_type, raw);
                Ok(())
            }
            UnknownFieldPolicy::Callback(callback) => {
                let raw = reader.skip_capture(wire_type)?;
                callback(self.info.type_name, target, field_no, wire_type, &raw);
                Ok(())
            }
        }
    }

    fn read_known_field<B: Buf>(
        &self,
        reader: &mut BinaryReader<B>,
        target: &mut DynamicMessage,
        options: &ReadOptions,
        field: &FieldInfo,
        wire_type: WireType,
    ) -> Result<(), ReadError> {
        if let FieldKind::Map { key, value } = &field.kind {
            let entry_bytes = reader.bytes()?;
            let (map_key, map_value) = self.read_map_entry(&entry_bytes, options, *key, value)?;
            if let FieldValue::Map(map) = target.field_mut(field.local_name) {
                map.insert(map_key, map_value);
            }
            return Ok(());
        }

        if let Some(group) = field.oneof {
            let existing = match target.oneof(group) {
                Some(OneofValue {
                    kind: Some(selected),
                    value: Some(current),
                }) if *selected == field.local_name => match current.as_ref() {
                    Value::Message(m) => Some(m.clone()),
                    _ => None,
                },
                _ => None,
            };
            let value = self.read_value(reader, options, field, existing)?;
            let slot = target.oneof_mut(group);
            slot.kind = Some(field.local_name);
            slot.value = Some(Box::new(value));
            return Ok(());
        }

        match field.repeat {
            Repeat::None => {
                let existing = match target.field(field.local_name) {
                    Some(FieldValue::Singular(Some(Value::Message(m)))) => Some(m.clone()),
                    _ => None,
                };
                let value = self.read_value(reader, options, field, existing)?;
                *target.field_mut(field.local_name) = FieldValue::Singular(Some(value));
            }
            Repeat::Packed | Repeat::Unpacked => {
                let packable = matches!(&field.kind, FieldKind::Scalar(ty, _) if ty.is_packable())
                    || matches!(&field.kind, FieldKind::Enum);
                if wire_type == WireType::LengthDelimited && packable {
                    let packed_bytes = reader.bytes()?;
                    let mut sub = BinaryReader::new(&packed_bytes[..]);
                    let mut values = Vec::new();
                    while !sub.is_empty() {
                        values.push(self.read_scalar_or_enum(&mut sub, &field.kind)?);
                    }
                    if let FieldValue::Repeated(v) = target.field_mut(field.local_name) {
                        v.extend(values);
                    }
                } else {
                    // Unpacked element, or a repeated message (never packable):
                    // always a fresh value, never merged with a sibling element.
                    let value = self.read_value(reader, options, field, None)?;
                    if let FieldValue::Repeated(v) = target.field_mut(field.local_name) {
                        v.push(value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Reads one value occurrence: a scalar/enum element, or a nested
    /// message, merged into `existing` when one is supplied (singular-field
    /// and same-member-oneof merge semantics; repeated elements always pass
    /// `None`).
    fn read_value<B: Buf>(
        &self,
        reader: &mut BinaryReader<B>,
        options: &ReadOptions,
        field: &FieldInfo,
        existing: Option<DynamicMessage>,
    ) -> Result<Value, ReadError> {
        match &field.kind {
            FieldKind::Scalar(..) | FieldKind::Enum => self.read_scalar_or_enum(reader, &field.kind),
            FieldKind::Message(message_ref) => {
                let sub_bytes = reader.bytes()?;
                let nested_info = message_ref.get();
                let nested_reader = ReflectionBinaryReader::new(nested_info);
                let mut nested = existing.unwrap_or_else(|| DynamicMessage::new(nested_info));
                let mut sub = BinaryReader::new(&sub_bytes[..]);
                nested_reader.read(&mut sub, &mut nested, options)?;
                Ok(Value::Message(nested))
            }
            FieldKind::Map { .. } => unreachable!("map fields are handled in read_known_field"),
        }
    }

    fn read_scalar_or_enum<B: Buf>(
        &self,
        reader: &mut BinaryReader<B>,
        kind: &FieldKind,
    ) -> Result<Value, ReadError> {
        match kind {
            FieldKind::Enum => Ok(Value::Enum(reader.int32()?)),
            FieldKind::Scalar(ty, long_type) => read_scalar_value(reader, *ty, *long_type),
            _ => unreachable!("read_scalar_or_enum called with non-scalar field kind"),
        }
    }

    fn read_map_entry(
        &self,
        entry_bytes: &Bytes,
        options: &ReadOptions,
        key_type: ScalarType,
        value_kind: &MapValueKind,
    ) -> Result<(MapKey, Value), ReadError> {
        let mut sub = BinaryReader::new(&entry_bytes[..]);
        let mut key: Option<Value> = None;
        let mut value: Option<Value> = None;

        while !sub.is_empty() {
            let (field_no, wire_type) = sub.tag()?;
            match field_no {
                1 => key = Some(read_scalar_value(&mut sub, key_type, LongType::BigInt)?),
                2 => {
                    value = Some(match value_kind {
                        MapValueKind::Scalar(ty, long_type) => {
                            read_scalar_value(&mut sub, *ty, *long_type)?
                        }
                        MapValueKind::Enum => Value::Enum(sub.int32()?),
                        MapValueKind::Message(message_ref) => {
                            let sub_bytes = sub.bytes()?;
                            let nested_info = message_ref.get();
                            let mut nested = DynamicMessage::new(nested_info);
                            let mut nested_cursor = BinaryReader::new(&sub_bytes[..]);
                            ReflectionBinaryReader::new(nested_info)
                                .read(&mut nested_cursor, &mut nested, options)?;
                            Value::Message(nested)
                        }
                    });
                }
                other => return Err(ReadError::MalformedMapEntry { field_no: other }),
            }
            let _ = wire_type;
        }

        let key = key.unwrap_or_else(|| value_from_map_key(&MapKey::zero(key_type)));
        let value = value.unwrap_or_else(|| zero_value_for(value_kind));
        Ok((value_to_map_key(&key), value))
    }
}

fn read_scalar_value<B: Buf>(
    reader: &mut BinaryReader<B>,
    ty: ScalarType,
    long_type: LongType,
) -> Result<Value, ReadError> {
    use ScalarType::*;
    Ok(match ty {
        Double => Value::F64(reader.double()?),
        Float => Value::F32(reader.float()?),
        Bool => Value::Bool(reader.bool()?),
        Int32 => Value::I32(reader.int32()?),
        Uint32 => Value::U32(reader.uint32()?),
        SInt32 => Value::I32(reader.sint32()?),
        Fixed32 => Value::U32(reader.fixed32()?),
        SFixed32 => Value::I32(reader.sfixed32()?),
        String => Value::String(reader.string()?),
        Bytes => Value::Bytes(reader.bytes()?),
        Int64 => Value::Long(reflection_long_convert(reader.int64()?, long_type)),
        Uint64 => Value::Long(reflection_long_convert(reader.uint64()?, long_type)),
        SInt64 => Value::Long(reflection_long_convert(reader.sint64()?, long_type)),
        Fixed64 => Value::Long(reflection_long_convert(reader.fixed64()?, long_type)),
        SFixed64 => Value::Long(reflection_long_convert(reader.sfixed64()?, long_type)),
    })
}

fn value_to_map_key(value: &Value) -> MapKey {
    match value {
        Value::Bool(b) => MapKey::Bool(*b),
        Value::I32(v) => MapKey::I32(*v),
        Value::U32(v) => MapKey::U32(*v),
        Value::String(s) => MapKey::String(s.clone()),
        Value::Long(crate::long64::LongValue::Signed(v)) => MapKey::I64(*v),
        Value::Long(crate::long64::LongValue::Unsigned(v)) => MapKey::U64(*v),
        Value::Long(crate::long64::LongValue::String(s)) => {
            // Map keys always decode through `LongType::BigInt` internally
            // (see `read_map_entry`), so this arm is unreachable in
            // practice; kept for exhaustiveness.
            s.parse::<i64>().map(MapKey::I64).unwrap_or(MapKey::I64(0))
        }
        Value::Long(crate::long64::LongValue::Number(n)) => MapKey::I64(*n as i64),
        other => panic!("{other:?} is not a valid map key representation"),
    }
}

fn value_from_map_key(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(b) => Value::Bool(*b),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::I64(v) => Value::Long(crate::long64::LongValue::Signed(*v)),
        MapKey::U64(v) => Value::Long(crate::long64::LongValue::Unsigned(*v)),
        MapKey::String(s) => Value::String(s.clone()),
    }
}

fn zero_value_for(kind: &MapValueKind) -> Value {
    match kind {
        MapValueKind::Scalar(ty, long_type) => zero_scalar(*ty, *long_type),
        MapValueKind::Enum => Value::Enum(0),
        MapValueKind::Message(message_ref) => Value::Message(DynamicMessage::new(message_ref.get())),
    }
}

fn zero_scalar(ty: ScalarType, long_type: LongType) -> Value {
    use crate::long64::Long64;
    use ScalarType::*;
    match ty {
        Double => Value::F64(0.0),
        Float => Value::F32(0.0),
        Bool => Value::Bool(false),
        Int32 | SInt32 | SFixed32 => Value::I32(0),
        Uint32 | Fixed32 => Value::U32(0),
        String => Value::String(String::new()),
        Bytes => Value::Bytes(Bytes::new()),
        Int64 | SInt64 | SFixed64 => {
            Value::Long(reflection_long_convert(Long64::from_i64(0), long_type))
        }
        Uint64 | Fixed64 => Value::Long(reflection_long_convert(Long64::from_u64(0), long_type)),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::{FieldInfo, MessageInfo, MessageRef, Repeat};

    fn int32_message() -> MessageInfo {
        MessageInfo::new(
            "Int32Msg",
            vec![FieldInfo {
                no: 1,
                name: "value",
                local_name: "value",
                kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                repeat: Repeat::None,
                oneof: None,
            }],
        )
    }

    #[test]
    fn s1_decodes_int32_field() {
        let info = int32_message();
        let mut target = DynamicMessage::new(&info);
        let mut cursor = BinaryReader::new(&[0x08u8, 0x96, 0x01][..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &ReadOptions::default())
            .unwrap();
        assert_eq!(target.field("value"), Some(&FieldValue::Singular(Some(Value::I32(150)))));
    }

    fn packed_repeated_message() -> MessageInfo {
        MessageInfo::new(
            "Repeated",
            vec![FieldInfo {
                no: 4,
                name: "values",
                local_name: "values",
                kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                repeat: Repeat::Packed,
                oneof: None,
            }],
        )
    }

    #[test]
    fn s3_packed_and_unpacked_decode_equally() {
        let info = packed_repeated_message();

        let mut packed_target = DynamicMessage::new(&info);
        let mut packed_cursor = BinaryReader::new(&[0x22u8, 0x03, 0x01, 0x02, 0x03][..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut packed_cursor, &mut packed_target, &ReadOptions::default())
            .unwrap();

        let mut unpacked_target = DynamicMessage::new(&info);
        let mut unpacked_cursor =
            BinaryReader::new(&[0x20u8, 0x01, 0x20, 0x02, 0x20, 0x03][..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut unpacked_cursor, &mut unpacked_target, &ReadOptions::default())
            .unwrap();

        assert_eq!(packed_target.field("values"), unpacked_target.field("values"));
        assert_eq!(
            packed_target.field("values"),
            Some(&FieldValue::Repeated(vec![Value::I32(1), Value::I32(2), Value::I32(3)]))
        );
    }

    fn oneof_message() -> MessageInfo {
        MessageInfo::new(
            "OneofMsg",
            vec![
                FieldInfo {
                    no: 1,
                    name: "a",
                    local_name: "a",
                    kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: Some("choice"),
                },
                FieldInfo {
                    no: 2,
                    name: "b",
                    local_name: "b",
                    kind: FieldKind::Scalar(ScalarType::String, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: Some("choice"),
                },
            ],
        )
    }

    #[test]
    fn oneof_last_write_wins_with_no_trace_of_sibling() {
        let info = oneof_message();
        let mut target = DynamicMessage::new(&info);

        // field 1 (varint 7) then field 2 (string "hi")
        let bytes = [0x08u8, 0x07, 0x12, 0x02, b'h', b'i'];
        let mut cursor = BinaryReader::new(&bytes[..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &ReadOptions::default())
            .unwrap();

        let choice = target.oneof("choice").unwrap();
        assert_eq!(choice.kind, Some("b"));
        assert_eq!(choice.value.as_deref(), Some(&Value::String("hi".to_string())));
    }

    #[test]
    fn unknown_field_throw_policy_errors() {
        let info = int32_message();
        let mut target = DynamicMessage::new(&info);
        let mut cursor = BinaryReader::new(&[0x10u8, 0x01][..]); // field 2, varint
        let options = ReadOptions {
            unknown_field_policy: UnknownFieldPolicy::Throw,
        };
        let err = ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &options)
            .unwrap_err();
        assert_eq!(
            err,
            ReadError::UnknownField {
                type_name: "Int32Msg".to_string(),
                field_no: 2,
                wire_type: WireType::Varint,
            }
        );
    }

    #[test]
    fn unknown_field_record_policy_preserves_bytes() {
        let info = int32_message();
        let mut target = DynamicMessage::new(&info);
        let mut cursor = BinaryReader::new(&[0x10u8, 0x01][..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &ReadOptions::default())
            .unwrap();
        assert_eq!(target.unknown.len(), 1);
    }

    fn map_message() -> MessageInfo {
        MessageInfo::new(
            "MapMsg",
            vec![FieldInfo {
                no: 7,
                name: "entries",
                local_name: "entries",
                kind: FieldKind::Map {
                    key: ScalarType::String,
                    value: MapValueKind::Scalar(ScalarType::Int32, LongType::BigInt),
                },
                repeat: Repeat::None,
                oneof: None,
            }],
        )
    }

    #[test]
    fn s6_decodes_string_int32_map_entry() {
        let info = map_message();
        let mut target = DynamicMessage::new(&info);
        let bytes = [0x3au8, 0x05, 0x0a, 0x01, b'a', 0x10, 0x01];
        let mut cursor = BinaryReader::new(&bytes[..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &ReadOptions::default())
            .unwrap();
        match target.field("entries") {
            Some(FieldValue::Map(map)) => {
                assert_eq!(
                    map.get(&MapKey::String("a".to_string())),
                    Some(&Value::I32(1))
                );
            }
            other => panic!("expected map field, got {other:?}"),
        }
    }

    fn merge_message() -> MessageInfo {
        MessageInfo::new(
            "Outer",
            vec![FieldInfo {
                no: 1,
                name: "inner",
                local_name: "inner",
                kind: FieldKind::Message(MessageRef::new(|| {
                    MessageInfo::new(
                        "Inner",
                        vec![
                            FieldInfo {
                                no: 1,
                                name: "a",
                                local_name: "a",
                                kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                                repeat: Repeat::None,
                                oneof: None,
                            },
                            FieldInfo {
                                no: 2,
                                name: "b",
                                local_name: "b",
                                kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                                repeat: Repeat::None,
                                oneof: None,
                            },
                        ],
                    )
                })),
                repeat: Repeat::None,
                oneof: None,
            }],
        )
    }

    #[test]
    fn singular_message_merge_concatenates_fields() {
        let info = merge_message();
        let mut target = DynamicMessage::new(&info);

        // First `inner { a: 1 }`, then `inner { b: 2 }` — same field 1.
        let first = [0x0au8, 0x02, 0x08, 0x01];
        let second = [0x0au8, 0x02, 0x10, 0x02];
        let mut concatenated = Vec::new();
        concatenated.extend_from_slice(&first);
        concatenated.extend_from_slice(&second);

        let mut cursor = BinaryReader::new(&concatenated[..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut target, &ReadOptions::default())
            .unwrap();

        match target.field("inner") {
            Some(FieldValue::Singular(Some(Value::Message(inner)))) => {
                assert_eq!(inner.field("a"), Some(&FieldValue::Singular(Some(Value::I32(1)))));
                assert_eq!(inner.field("b"), Some(&FieldValue::Singular(Some(Value::I32(2)))));
            }
            other => panic!("expected merged nested message, got {other:?}"),
        }
    }
}
