//! Errors raised while reading or writing the proto3 wire format.
//!
//! Every variant carries enough context (field number, wire type, byte
//! offset) to diagnose a malformed stream without a logger; see the crate's
//! design notes for why the codec itself never logs.

use core::fmt;

use crate::wire::WireType;

/// An error raised by [`BinaryWriter`](crate::writer::BinaryWriter) or by the
/// reflective encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteError {
    /// A numeric value was not representable in the target wire type: not an
    /// integer, not finite, or out of range.
    RangeError {
        /// Name of the operation that rejected the value (e.g. `"int32"`).
        op: &'static str,
    },
    /// A [`Long64`](crate::long64::Long64) could not be constructed from the
    /// given string, number, or native integer.
    InvalidLongValue {
        /// A short description of why the value was rejected.
        reason: &'static str,
    },
    /// `join()` was called with no matching `fork()` on the stack.
    EmptyForkStack,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::RangeError { op } => {
                write!(f, "value out of range for `{op}`")
            }
            WriteError::InvalidLongValue { reason } => {
                write!(f, "invalid 64-bit integer value: {reason}")
            }
            WriteError::EmptyForkStack => {
                write!(f, "join() called with no matching fork()")
            }
        }
    }
}

impl std::error::Error for WriteError {}

/// An error raised while decoding a proto3 wire stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReadError {
    /// A varint ran past 10 bytes, or the stream ended before it terminated.
    MalformedVarint,
    /// A primitive read past the end of the cursor's declared length.
    TruncatedInput {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes actually remaining.
        remaining: usize,
    },
    /// A tag with no matching [`FieldInfo`](crate::descriptor::FieldInfo) was
    /// encountered and the unknown-field policy is
    /// [`UnknownFieldPolicy::Throw`](crate::descriptor::UnknownFieldPolicy::Throw).
    UnknownField {
        /// `typeName` of the message being decoded.
        type_name: String,
        /// Field number of the unrecognized tag.
        field_no: u32,
        /// Wire type of the unrecognized tag.
        wire_type: WireType,
    },
    /// A map entry sub-message carried a field number other than 1 or 2.
    MalformedMapEntry {
        /// The offending field number.
        field_no: u32,
    },
    /// A `Long64` could not be constructed from a decoded value (only
    /// reachable via pathological input to LongType-aware scalar reads).
    InvalidLongValue {
        /// A short description of why the value was rejected.
        reason: &'static str,
    },
    /// The wire tag named a `WireType` value outside `0..=5`, or a group tag
    /// (`3`/`4`), which this codec does not support.
    InvalidWireType {
        /// The raw wire type tag bits.
        value: u32,
    },
    /// A `string` field's bytes were not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::MalformedVarint => write!(f, "malformed varint"),
            ReadError::TruncatedInput {
                requested,
                remaining,
            } => write!(
                f,
                "truncated input: requested {requested} bytes, {remaining} remaining"
            ),
            ReadError::UnknownField {
                type_name,
                field_no,
                wire_type,
            } => write!(
                f,
                "unknown field {field_no} ({wire_type:?}) on message {type_name}"
            ),
            ReadError::MalformedMapEntry { field_no } => {
                write!(f, "malformed map entry: unexpected field number {field_no}")
            }
            ReadError::InvalidLongValue { reason } => {
                write!(f, "invalid 64-bit integer value: {reason}")
            }
            ReadError::InvalidWireType { value } => {
                write!(f, "invalid or unsupported wire type: {value}")
            }
            ReadError::InvalidUtf8 => write!(f, "field bytes were not valid UTF-8"),
        }
    }
}

impl std::error::Error for ReadError {}
