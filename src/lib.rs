#![doc(html_root_url = "https://docs.rs/wire-reflect/0.1.0")]
#![doc = include_str!("../README.md")]

//! A reflection-driven proto3 wire codec: the binary reader and writer are
//! generic over a runtime field-descriptor table ([`MessageInfo`]) rather
//! than per-message generated code, so one pair of encode/decode routines
//! serves every message shape a caller can describe.
//!
//! The pieces:
//! - [`varint`] / [`wire`]: LEB128 and tag primitives shared by both directions.
//! - [`long64`]: a host-independent 64-bit integer and its caller-facing
//!   [`long64::LongType`] surfaces (string, float, native).
//! - [`writer`] / [`reader`]: the low-level, fork-capable byte emitter and
//!   typed cursor the reflective layer is built on.
//! - [`descriptor`]: the field/message descriptor model reflection runs against.
//! - [`value`]: the runtime [`value::DynamicMessage`] value tree decoded into
//!   and encoded from.
//! - [`unknown`]: lossless storage for tags with no matching field.
//! - [`options`]: the only configuration surface this codec has.
//! - [`reflect_reader`] / [`reflect_writer`]: the reflective encode/decode
//!   entry points tying everything above together.

pub mod descriptor;
pub mod error;
pub mod long64;
pub mod options;
pub mod reader;
pub mod reflect_reader;
pub mod reflect_writer;
pub mod unknown;
pub mod value;
pub mod varint;
pub mod wire;
pub mod writer;

pub use bytes;

pub use crate::descriptor::{
    FieldInfo, FieldKind, MapValueKind, MessageInfo, MessageRef, Repeat, ScalarType,
};
pub use crate::error::{ReadError, WriteError};
pub use crate::long64::{Long64, LongType, LongValue, Signedness};
pub use crate::options::{ReadOptions, UnknownFieldPolicy, WriteOptions};
pub use crate::reader::BinaryReader;
pub use crate::reflect_reader::ReflectionBinaryReader;
pub use crate::reflect_writer::ReflectionBinaryWriter;
pub use crate::unknown::{UnknownField, UnknownFieldStore};
pub use crate::value::{DynamicMessage, FieldValue, MapKey, OneofValue, Value};
pub use crate::wire::WireType;
