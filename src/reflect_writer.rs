//! Encodes a [`DynamicMessage`] into proto3 wire bytes, driven by the same
//! [`MessageInfo`] field table the reflective reader consumes.
//!
//! The distilled specification names this component only implicitly (the
//! encoder "walks field descriptors", §2) while fully detailing the reader;
//! see SPEC_FULL.md §4.5 for the writer-side walk this module implements.

use crate::descriptor::{FieldInfo, FieldKind, MapValueKind, MessageInfo, Repeat, ScalarType};
use crate::error::WriteError;
use crate::long64::{Long64, LongValue};
use crate::options::WriteOptions;
use crate::value::{DynamicMessage, FieldValue, MapKey, Value};
use crate::wire::WireType;
use crate::writer::BinaryWriter;

/// Encodes a [`DynamicMessage`] shaped by a [`MessageInfo`] into a
/// [`BinaryWriter`].
pub struct ReflectionBinaryWriter<'a> {
    info: &'a MessageInfo,
}

impl<'a> ReflectionBinaryWriter<'a> {
    pub fn new(info: &'a MessageInfo) -> Self {
        ReflectionBinaryWriter { info }
    }

    /// Writes `message` into `writer` in field-declaration order, then
    /// replays its unknown fields if `options.write_unknown_fields` is set.
    ///
    /// A oneof's selected member is emitted inline at the wire position of
    /// the *first* field declared for that oneof group, so a oneof sitting
    /// between two regular fields in the schema keeps its place in the
    /// output rather than being deferred to the end.
    pub fn write(
        &self,
        message: &DynamicMessage,
        writer: &mut BinaryWriter,
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        let mut emitted_oneofs: Vec<&str> = Vec::new();

        for field in &self.info.fields {
            if let Some(group) = field.oneof {
                if emitted_oneofs.contains(&group) {
                    continue;
                }
                emitted_oneofs.push(group);
                if let Some(selected) = message.oneof(group) {
                    if let (Some(kind), Some(value)) = (selected.kind, &selected.value) {
                        let field = self
                            .info
                            .fields
                            .iter()
                            .find(|f| f.oneof == Some(group) && f.local_name == kind)
                            .expect("oneof selection names a field declared on this message");
                        self.write_singular_value(writer, field, value, options)?;
                    }
                }
                continue;
            }
            if let Some(value) = message.field(field.local_name) {
                self.write_field(writer, field, value, options)?;
            }
        }

        if options.write_unknown_fields {
            message.unknown.write_to(writer)?;
        }
        Ok(())
    }

    fn write_field(
        &self,
        writer: &mut BinaryWriter,
        field: &FieldInfo,
        value: &FieldValue,
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        match value {
            FieldValue::Singular(Some(v)) => self.write_singular_value(writer, field, v, options)?,
            FieldValue::Singular(None) => {}
            FieldValue::Repeated(values) => self.write_repeated(writer, field, values, options)?,
            FieldValue::Map(entries) => self.write_map(writer, field, entries, options)?,
        }
        Ok(())
    }

    fn write_repeated(
        &self,
        writer: &mut BinaryWriter,
        field: &FieldInfo,
        values: &[Value],
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        if values.is_empty() {
            return Ok(());
        }
        let packable = matches!(&field.kind, FieldKind::Scalar(ty, _) if ty.is_packable())
            || matches!(&field.kind, FieldKind::Enum);

        if field.repeat == Repeat::Packed && packable {
            writer.tag(field.no, WireType::LengthDelimited);
            writer.fork();
            for v in values {
                self.write_scalar_or_enum(writer, &field.kind, v)?;
            }
            writer.join()?;
        } else {
            for v in values {
                self.write_singular_value(writer, field, v, options)?;
            }
        }
        Ok(())
    }

    fn write_singular_value(
        &self,
        writer: &mut BinaryWriter,
        field: &FieldInfo,
        value: &Value,
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        match &field.kind {
            FieldKind::Scalar(..) | FieldKind::Enum => {
                writer.tag(field.no, field_wire_type(&field.kind));
                self.write_scalar_or_enum(writer, &field.kind, value)?;
            }
            FieldKind::Message(message_ref) => {
                let nested = match value {
                    Value::Message(m) => m,
                    other => panic!("field {} expects a message value, got {other:?}", field.name),
                };
                let nested_info = message_ref.get();
                writer.tag(field.no, WireType::LengthDelimited);
                writer.fork();
                ReflectionBinaryWriter::new(nested_info).write(nested, writer, options)?;
                writer.join()?;
            }
            FieldKind::Map { .. } => unreachable!("map fields go through write_map"),
        }
        Ok(())
    }

    fn write_map(
        &self,
        writer: &mut BinaryWriter,
        field: &FieldInfo,
        entries: &std::collections::BTreeMap<MapKey, Value>,
        options: &WriteOptions,
    ) -> Result<(), WriteError> {
        let (key_type, value_kind) = match &field.kind {
            FieldKind::Map { key, value } => (*key, value),
            _ => unreachable!(),
        };
        for (key, value) in entries {
            writer.tag(field.no, WireType::LengthDelimited);
            writer.fork();
            writer.tag(1, key_type.wire_type());
            write_scalar_value(writer, key_type, &map_key_to_value(key))?;
            writer.tag(2, map_value_wire_type(value_kind));
            match value_kind {
                MapValueKind::Scalar(ty, _) => write_scalar_value(writer, *ty, value)?,
                MapValueKind::Enum => {
                    let discriminant = match value {
                        Value::Enum(v) => *v,
                        other => panic!("map value expects an enum, got {other:?}"),
                    };
                    writer.int32(discriminant as i64)?;
                }
                MapValueKind::Message(message_ref) => {
                    let nested = match value {
                        Value::Message(m) => m,
                        other => panic!("map value expects a message, got {other:?}"),
                    };
                    writer.fork();
                    ReflectionBinaryWriter::new(message_ref.get()).write(nested, writer, options)?;
                    writer.join()?;
                }
            }
            writer.join()?;
        }
        Ok(())
    }

    fn write_scalar_or_enum(
        &self,
        writer: &mut BinaryWriter,
        kind: &FieldKind,
        value: &Value,
    ) -> Result<(), WriteError> {
        match kind {
            FieldKind::Enum => {
                let discriminant = match value {
                    Value::Enum(v) => *v,
                    other => panic!("expected an enum value, got {other:?}"),
                };
                writer.int32(discriminant as i64)?;
                Ok(())
            }
            FieldKind::Scalar(ty, _) => write_scalar_value(writer, *ty, value),
            _ => unreachable!("write_scalar_or_enum called with non-scalar field kind"),
        }
    }
}

fn field_wire_type(kind: &FieldKind) -> WireType {
    match kind {
        FieldKind::Scalar(ty, _) => ty.wire_type(),
        FieldKind::Enum => WireType::Varint,
        FieldKind::Message(_) => WireType::LengthDelimited,
        FieldKind::Map { .. } => WireType::LengthDelimited,
    }
}

fn map_value_wire_type(kind: &MapValueKind) -> WireType {
    match kind {
        MapValueKind::Scalar(ty, _) => ty.wire_type(),
        MapValueKind::Enum => WireType::Varint,
        MapValueKind::Message(_) => WireType::LengthDelimited,
    }
}

fn map_key_to_value(key: &MapKey) -> Value {
    match key {
        MapKey::Bool(b) => Value::Bool(*b),
        MapKey::I32(v) => Value::I32(*v),
        MapKey::U32(v) => Value::U32(*v),
        MapKey::I64(v) => Value::Long(LongValue::Signed(*v)),
        MapKey::U64(v) => Value::Long(LongValue::Unsigned(*v)),
        MapKey::String(s) => Value::String(s.clone()),
    }
}

fn write_scalar_value(
    writer: &mut BinaryWriter,
    ty: ScalarType,
    value: &Value,
) -> Result<(), WriteError> {
    use ScalarType::*;
    match (ty, value) {
        (Double, Value::F64(v)) => {
            writer.double(*v);
        }
        (Float, Value::F32(v)) => {
            writer.float(*v as f64);
        }
        (Bool, Value::Bool(v)) => {
            writer.bool(*v);
        }
        (Int32, Value::I32(v)) => {
            writer.int32(*v as i64)?;
        }
        (Uint32, Value::U32(v)) => {
            writer.uint32(*v as u64)?;
        }
        (SInt32, Value::I32(v)) => {
            writer.sint32(*v as i64)?;
        }
        (Fixed32, Value::U32(v)) => {
            writer.fixed32(*v as u64)?;
        }
        (SFixed32, Value::I32(v)) => {
            writer.sfixed32(*v as i64)?;
        }
        (String, Value::String(v)) => {
            writer.string(v)?;
        }
        (Bytes, Value::Bytes(v)) => {
            writer.bytes(v)?;
        }
        (Int64, Value::Long(long)) => {
            writer.int64(long_value_to_long64(long));
        }
        (Uint64, Value::Long(long)) => {
            writer.uint64(long_value_to_long64(long));
        }
        (SInt64, Value::Long(long)) => {
            writer.sint64(long_value_to_long64(long));
        }
        (Fixed64, Value::Long(long)) => {
            writer.fixed64(long_value_to_long64(long));
        }
        (SFixed64, Value::Long(long)) => {
            writer.fixed64(long_value_to_long64(long));
        }
        (ty, value) => panic!("value {value:?} does not match declared scalar type {ty:?}"),
    }
    Ok(())
}

fn long_value_to_long64(value: &LongValue) -> Long64 {
    match value {
        LongValue::Signed(v) => Long64::from_i64(*v),
        LongValue::Unsigned(v) => Long64::from_u64(*v),
        LongValue::String(s) => s
            .parse::<i64>()
            .map(Long64::from_i64)
            .unwrap_or_else(|_| Long64::from_u64(s.parse::<u64>().unwrap_or(0))),
        LongValue::Number(n) => Long64::from_i64(*n as i64),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::descriptor::{FieldInfo, MessageInfo, MessageRef, Repeat};
    use crate::long64::LongType;
    use crate::options::ReadOptions;
    use crate::reader::BinaryReader;
    use crate::reflect_reader::ReflectionBinaryReader;
    use bytes::Bytes;

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
    fn s1_writes_int32_field_150() {
        let info = int32_message();
        let mut message = DynamicMessage::new(&info);
        *message.field_mut("value") = FieldValue::Singular(Some(Value::I32(150)));

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(&writer.finish()[..], &[0x08, 0x96, 0x01]);
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
    fn s3_packed_repeated_int32() {
        let info = packed_repeated_message();
        let mut message = DynamicMessage::new(&info);
        *message.field_mut("values") =
            FieldValue::Repeated(vec![Value::I32(1), Value::I32(2), Value::I32(3)]);

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(&writer.finish()[..], &[0x22, 0x03, 0x01, 0x02, 0x03]);
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
    fn s6_writes_string_int32_map_entry() {
        let info = map_message();
        let mut message = DynamicMessage::new(&info);
        if let FieldValue::Map(map) = message.field_mut("entries") {
            map.insert(MapKey::String("a".to_string()), Value::I32(1));
        }

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(
            &writer.finish()[..],
            &[0x3a, 0x05, 0x0a, 0x01, b'a', 0x10, 0x01]
        );
    }

    #[test]
    fn encode_decode_round_trips_through_reflection() {
        let info = packed_repeated_message();
        let mut message = DynamicMessage::new(&info);
        *message.field_mut("values") =
            FieldValue::Repeated(vec![Value::I32(-5), Value::I32(0), Value::I32(9000)]);

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        let bytes = writer.finish();

        let mut decoded = DynamicMessage::new(&info);
        let mut cursor = BinaryReader::new(&bytes[..]);
        ReflectionBinaryReader::new(&info)
            .read(&mut cursor, &mut decoded, &ReadOptions::default())
            .unwrap();

        assert_eq!(decoded.field("values"), message.field("values"));
    }

    #[test]
    fn unknown_fields_replay_after_known_fields_by_default() {
        let info = int32_message();
        let mut message = DynamicMessage::new(&info);
        *message.field_mut("value") = FieldValue::Singular(Some(Value::I32(1)));
        message
            .unknown
            .push(9, WireType::Varint, Bytes::from_static(&[0x2a]));

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        let bytes = writer.finish();

        let mut expected = vec![0x08, 0x01];
        expected.extend_from_slice(&[(9 << 3) as u8, 0x2a]);
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn write_unknown_fields_false_drops_them() {
        let info = int32_message();
        let mut message = DynamicMessage::new(&info);
        message
            .unknown
            .push(9, WireType::Varint, Bytes::from_static(&[0x2a]));

        let mut writer = BinaryWriter::new();
        let options = WriteOptions {
            write_unknown_fields: false,
        };
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &options)
            .unwrap();
        assert!(writer.finish().is_empty());
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
    fn oneof_writes_only_the_selected_member() {
        let info = oneof_message();
        let mut message = DynamicMessage::new(&info);
        message.oneof_mut("choice").kind = Some("b");
        message.oneof_mut("choice").value = Some(Box::new(Value::String("hi".to_string())));

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(&writer.finish()[..], &[0x12, 0x02, b'h', b'i']);
    }

    fn interleaved_oneof_message() -> MessageInfo {
        MessageInfo::new(
            "Interleaved",
            vec![
                FieldInfo {
                    no: 1,
                    name: "before",
                    local_name: "before",
                    kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: None,
                },
                FieldInfo {
                    no: 2,
                    name: "a",
                    local_name: "a",
                    kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: Some("choice"),
                },
                FieldInfo {
                    no: 3,
                    name: "b",
                    local_name: "b",
                    kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: Some("choice"),
                },
                FieldInfo {
                    no: 4,
                    name: "after",
                    local_name: "after",
                    kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                    repeat: Repeat::None,
                    oneof: None,
                },
            ],
        )
    }

    #[test]
    fn oneof_is_written_at_its_declared_position_not_deferred_to_the_end() {
        let info = interleaved_oneof_message();
        let mut message = DynamicMessage::new(&info);
        *message.field_mut("before") = FieldValue::Singular(Some(Value::I32(1)));
        message.oneof_mut("choice").kind = Some("a");
        message.oneof_mut("choice").value = Some(Box::new(Value::I32(2)));
        *message.field_mut("after") = FieldValue::Singular(Some(Value::I32(4)));

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&message, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(
            &writer.finish()[..],
            &[0x08, 0x01, 0x10, 0x02, 0x20, 0x04]
        );
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
                        vec![FieldInfo {
                            no: 1,
                            name: "a",
                            local_name: "a",
                            kind: FieldKind::Scalar(ScalarType::Int32, LongType::BigInt),
                            repeat: Repeat::None,
                            oneof: None,
                        }],
                    )
                })),
                repeat: Repeat::None,
                oneof: None,
            }],
        )
    }

    #[test]
    fn nested_message_fork_join_prepends_length() {
        let info = merge_message();
        let inner_info = match &info.fields[0].kind {
            FieldKind::Message(r) => r.get(),
            _ => unreachable!(),
        };
        let mut inner = DynamicMessage::new(inner_info);
        *inner.field_mut("a") = FieldValue::Singular(Some(Value::I32(1)));
        let mut outer = DynamicMessage::new(&info);
        *outer.field_mut("inner") = FieldValue::Singular(Some(Value::Message(inner)));

        let mut writer = BinaryWriter::new();
        ReflectionBinaryWriter::new(&info)
            .write(&outer, &mut writer, &WriteOptions::default())
            .unwrap();
        assert_eq!(&writer.finish()[..], &[0x0a, 0x02, 0x08, 0x01]);
    }
}
