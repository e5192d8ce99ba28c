//! The reflection schema: the field-descriptor model the codec consumes to
//! drive decoding/encoding without per-message generated code.

use std::sync::OnceLock;

use crate::long64::LongType;
use crate::wire::WireType;

/// A proto3 scalar wire kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
}

impl ScalarType {
    /// The wire type this scalar kind is encoded as.
    pub const fn wire_type(self) -> WireType {
        use ScalarType::*;
        match self {
            Double | Fixed64 | SFixed64 => WireType::Bit64,
            Float | Fixed32 | SFixed32 => WireType::Bit32,
            Int64 | Uint64 | Int32 | Bool | Uint32 | SInt32 | SInt64 => WireType::Varint,
            String | Bytes => WireType::LengthDelimited,
        }
    }

    /// Whether this scalar kind is a 64-bit integer surfaced via
    /// [`LongType`].
    pub const fn is_64bit_integer(self) -> bool {
        matches!(
            self,
            ScalarType::Int64 | ScalarType::Uint64 | ScalarType::Fixed64 | ScalarType::SFixed64 | ScalarType::SInt64
        )
    }

    /// Whether a `repeated` field of this scalar kind may legally appear in
    /// packed form (everything except `string`/`bytes`).
    pub const fn is_packable(self) -> bool {
        !matches!(self, ScalarType::String | ScalarType::Bytes)
    }
}

/// How a repeated field is represented on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    /// Not a repeated field.
    None,
    /// Repeated scalar/enum values concatenated into one length-delimited
    /// region.
    Packed,
    /// Repeated values, each with its own tag.
    Unpacked,
}

/// What kind of value a `map` field's value side holds.
#[derive(Clone)]
pub enum MapValueKind {
    Scalar(ScalarType, LongType),
    Enum,
    Message(MessageRef),
}

/// The shape of a single field.
#[derive(Clone)]
pub enum FieldKind {
    Scalar(ScalarType, LongType),
    /// Enums are encoded exactly like `Int32` on the wire.
    Enum,
    Message(MessageRef),
    Map {
        key: ScalarType,
        value: MapValueKind,
    },
}

/// A single field's reflection metadata.
#[derive(Clone)]
pub struct FieldInfo {
    /// Field number; positive, unique within the owning message.
    pub no: u32,
    /// Wire-documentation name (the `.proto` field name).
    pub name: &'static str,
    /// In-memory attribute name (may differ in casing convention).
    pub local_name: &'static str,
    pub kind: FieldKind,
    pub repeat: Repeat,
    /// Oneof group name, if this field is a mutually-exclusive member.
    pub oneof: Option<&'static str>,
}

impl FieldInfo {
    pub fn is_map(&self) -> bool {
        matches!(self.kind, FieldKind::Map { .. })
    }

    pub fn is_message(&self) -> bool {
        matches!(self.kind, FieldKind::Message(_))
    }
}

/// A message's reflection metadata: its field table, indexed lazily by
/// field number on first decode.
pub struct MessageInfo {
    pub type_name: &'static str,
    pub fields: Vec<FieldInfo>,
    index: OnceLock<std::collections::HashMap<u32, usize>>,
}

impl MessageInfo {
    pub fn new(type_name: &'static str, fields: Vec<FieldInfo>) -> Self {
        MessageInfo {
            type_name,
            fields,
            index: OnceLock::new(),
        }
    }

    /// The `field_number -> FieldInfo` index, built lazily on first use.
    fn field_index(&self) -> &std::collections::HashMap<u32, usize> {
        self.index.get_or_init(|| {
            self.fields
                .iter()
                .enumerate()
                .map(|(i, f)| (f.no, i))
                .collect()
        })
    }

    /// Looks up a field by its wire field number.
    pub fn field(&self, no: u32) -> Option<&FieldInfo> {
        self.field_index().get(&no).map(|&i| &self.fields[i])
    }

    /// All distinct oneof group names this message declares, in first-seen
    /// order.
    pub fn oneof_groups(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for f in &self.fields {
            if let Some(g) = f.oneof {
                if !seen.contains(&g) {
                    seen.push(g);
                }
            }
        }
        seen
    }
}

/// A lazy, idempotent, thread-safe handle to a nested message's descriptor.
///
/// Cyclic schemas (a message that embeds itself, directly or through other
/// messages) need this indirection: `MessageInfo` can't hold its own
/// `MessageInfo` by value. The resolver closure runs at most once, the
/// first time [`get`](Self::get) is called from any thread; `OnceLock`
/// guarantees that race is resolved without double-built descriptors.
#[derive(Clone)]
pub struct MessageRef {
    resolve: std::sync::Arc<dyn Fn() -> MessageInfo + Send + Sync>,
    cell: std::sync::Arc<OnceLock<MessageInfo>>,
}

impl MessageRef {
    pub fn new(resolve: impl Fn() -> MessageInfo + Send + Sync + 'static) -> Self {
        MessageRef {
            resolve: std::sync::Arc::new(resolve),
            cell: std::sync::Arc::new(OnceLock::new()),
        }
    }

    /// Resolves (and memoizes) the nested message's descriptor.
    pub fn get(&self) -> &MessageInfo {
        self.cell.get_or_init(|| (self.resolve)())
    }
}
