//! safepack-compiler
//!
//! This crate implements:
//!  1) The schema compiler (`compile_schema` → `Arc<CompiledLayout>`),
//!  2) The validation engine run before every encode,
//!  3) Format-token arithmetic (`calcsize`, `codes`),
//!  4) The process-wide layout registry and `SchemaCell`,
//!  5) JSON schema documents, and the error types (`PackError` and friends).

pub mod error;
pub mod types;
pub mod utils;
pub mod format;
pub mod layout;
pub mod compiler;
pub mod validator;
pub mod registry;
pub mod document;

pub use compiler::{compile_schema, compile_with};
pub use document::SchemaDocument;
pub use error::{BufferError, CheckKind, FormatError, PackError, Result, SchemaError, SizeError, ValidationError};
pub use format::calcsize;
pub use layout::{CompiledField, CompiledLayout, FieldInfo, FlatSlot};
pub use registry::{lookup, register, registered_names, SchemaCell};
pub use types::{FieldDescriptor, HostType, Predicate, Rule, SchemaDefinition, SchemaRef, WireKind};
pub use validator::validate;
