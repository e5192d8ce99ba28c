//! Per-call options controlling unknown-field handling, passed to
//! [`ReflectionBinaryReader::read`](crate::reflect_reader::ReflectionBinaryReader::read)
//! and
//! [`ReflectionBinaryWriter::write`](crate::reflect_writer::ReflectionBinaryWriter::write).
//!
//! There is no environment-variable or file-based configuration surface for
//! this codec; these structs are the entirety of its "configuration".

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::value::DynamicMessage;
use crate::wire::WireType;

/// What to do with a wire tag that has no matching
/// [`FieldInfo`](crate::descriptor::FieldInfo).
#[derive(Clone)]
pub enum UnknownFieldPolicy {
    /// Fail the decode with [`ReadError::UnknownField`](crate::error::ReadError::UnknownField).
    Throw,
    /// Skip the value and discard it.
    Skip,
    /// Skip the value but record its raw bytes into the target's
    /// [`UnknownFieldStore`](crate::unknown::UnknownFieldStore) (the default).
    Record,
    /// Skip the value and invoke a caller-supplied callback with the raw
    /// bytes, instead of the default recorder.
    Callback(Arc<dyn Fn(&str, &mut DynamicMessage, u32, WireType, &Bytes) + Send + Sync>),
}

impl fmt::Debug for UnknownFieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownFieldPolicy::Throw => write!(f, "Throw"),
            UnknownFieldPolicy::Skip => write!(f, "Skip"),
            UnknownFieldPolicy::Record => write!(f, "Record"),
            UnknownFieldPolicy::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

impl Default for UnknownFieldPolicy {
    fn default() -> Self {
        UnknownFieldPolicy::Record
    }
}

/// Options controlling [`ReflectionBinaryReader::read`](crate::reflect_reader::ReflectionBinaryReader::read).
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    pub unknown_field_policy: UnknownFieldPolicy,
}

/// Options controlling [`ReflectionBinaryWriter::write`](crate::reflect_writer::ReflectionBinaryWriter::write).
#[derive(Clone, Debug)]
pub struct WriteOptions {
    /// Whether to replay a target's stored unknown fields after its known
    /// fields. Defaults to `true`.
    pub write_unknown_fields: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            write_unknown_fields: true,
        }
    }
}
