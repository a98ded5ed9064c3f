//! safepack
//!
//! Runtime support for fixed-layout binary records.
//!
//! - `Codec`: validated encode, in-place encode, decode and in-place decode
//!   for one compiled schema
//! - `Record` / `RecordExt`: bind a host struct to a schema
//! - JSON helpers for records and layouts
//! - Re-exports of the compiler and wire types

pub mod codec;
pub mod json;
pub mod record;

pub use codec::Codec;
pub use json::{layout_to_json, value_from_json, value_to_json};
pub use record::{Fields, FromValue, Record, RecordExt};

pub use safepack_compiler::{
    calcsize, compile_schema, compile_with, lookup, register, registered_names, validate,
    BufferError, CheckKind, CompiledField, CompiledLayout, FieldDescriptor, FieldInfo, FlatSlot,
    FormatError, HostType, PackError, Predicate, Result, Rule, SchemaCell, SchemaDefinition,
    SchemaDocument, SchemaError, SchemaRef, SizeError, ValidationError, WireKind,
};
pub use safepack_schema::{ByteOrder, Scalar, ScalarValue, Value};

pub mod error {
    pub use safepack_compiler::error::*;
}

pub mod schema {
    pub use safepack_schema::{ByteOrder, ByteReader, ByteWriter, Scalar, ScalarValue, Value};
}
