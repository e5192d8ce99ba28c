//! The runtime message representation this codec decodes into and encodes
//! from: a `DynamicMessage` value tree built from a [`MessageInfo`], since
//! there is no code generator in scope to produce per-type Rust structs.

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::descriptor::{MessageInfo, Repeat};
use crate::long64::LongValue;

/// A single scalar/enum/message value, as stored inside a `DynamicMessage`.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    U32(u32),
    F32(f32),
    F64(f64),
    /// A 64-bit integer, already converted to its field's configured
    /// `LongType` surface.
    Long(LongValue),
    String(String),
    Bytes(Bytes),
    /// The raw wire value of an enum field (proto3 open enums keep unknown
    /// discriminants rather than rejecting them).
    Enum(i32),
    Message(DynamicMessage),
}

/// A map field's key, restricted (as proto3 requires) to integer, bool, or
/// string scalar kinds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// Stringified `"true"`/`"false"`, per §4.4's map-entry decode rule.
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    String(String),
}

impl MapKey {
    /// The zero value for a map key of the given scalar type, used when a
    /// decoded map entry is missing field 1.
    pub fn zero(key: crate::descriptor::ScalarType) -> MapKey {
        use crate::descriptor::ScalarType::*;
        match key {
            Bool => MapKey::Bool(false),
            Int32 | SInt32 | SFixed32 => MapKey::I32(0),
            Int64 | SInt64 | SFixed64 => MapKey::I64(0),
            Uint32 | Fixed32 => MapKey::U32(0),
            Uint64 | Fixed64 => MapKey::U64(0),
            String => MapKey::String(std::string::String::new()),
            other => panic!("scalar type {other:?} is not a valid map key"),
        }
    }
}

/// The value currently held by a `oneof` group: at most one member set at a
/// time, modeled as a discriminant plus payload rather than parallel
/// `Option<T>` fields (see SPEC_FULL.md Design Notes).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OneofValue {
    /// `local_name` of the currently selected member, if any.
    pub kind: Option<&'static str>,
    pub value: Option<Box<Value>>,
}

impl OneofValue {
    pub fn is_set(&self) -> bool {
        self.kind.is_some()
    }
}

/// The storage behind one non-oneof field slot.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Singular(Option<Value>),
    Repeated(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl FieldValue {
    fn empty_for(repeat: Repeat, is_map: bool) -> FieldValue {
        if is_map {
            FieldValue::Map(BTreeMap::new())
        } else {
            match repeat {
                Repeat::None => FieldValue::Singular(None),
                Repeat::Packed | Repeat::Unpacked => FieldValue::Repeated(Vec::new()),
            }
        }
    }
}

/// A decoded or in-construction protobuf message, shaped by a
/// [`MessageInfo`]. Repeated and map slots are always preinitialized at
/// construction (see SPEC_FULL.md REDESIGN FLAGS), so the reflective reader
/// never needs to allocate a container mid-decode.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicMessage {
    pub type_name: &'static str,
    fields: HashMap<&'static str, FieldValue>,
    oneofs: HashMap<&'static str, OneofValue>,
    pub unknown: crate::unknown::UnknownFieldStore,
}

impl DynamicMessage {
    /// Builds an empty message matching `info`'s shape: every non-oneof
    /// field gets its zero-valued slot, every oneof group starts unset.
    pub fn new(info: &MessageInfo) -> Self {
        let mut fields = HashMap::new();
        let mut oneofs = HashMap::new();
        for f in &info.fields {
            if let Some(group) = f.oneof {
                oneofs.entry(group).or_insert_with(OneofValue::default);
            } else {
                fields.insert(f.local_name, FieldValue::empty_for(f.repeat, f.is_map()));
            }
        }
        DynamicMessage {
            type_name: info.type_name,
            fields,
            oneofs,
            unknown: crate::unknown::UnknownFieldStore::new(),
        }
    }

    pub fn field(&self, local_name: &str) -> Option<&FieldValue> {
        self.fields.get(local_name)
    }

    pub fn field_mut(&mut self, local_name: &'static str) -> &mut FieldValue {
        self.fields
            .entry(local_name)
            .or_insert(FieldValue::Singular(None))
    }

    pub fn oneof(&self, group: &str) -> Option<&OneofValue> {
        self.oneofs.get(group)
    }

    pub fn oneof_mut(&mut self, group: &'static str) -> &mut OneofValue {
        self.oneofs.entry(group).or_insert_with(OneofValue::default)
    }

    /// Every non-oneof field slot, by local name.
    pub fn fields(&self) -> impl Iterator<Item = (&&'static str, &FieldValue)> {
        self.fields.iter()
    }

    pub fn oneofs(&self) -> impl Iterator<Item = (&&'static str, &OneofValue)> {
        self.oneofs.iter()
    }
}
