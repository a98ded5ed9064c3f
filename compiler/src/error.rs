use std::fmt;
use thiserror::Error;

/// Which part of a validator chain rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// The range/type check implied by the wire kind.
    Mandatory,
    /// A check declared on the field by the schema author.
    User,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Mandatory => f.write_str("mandatory"),
            CheckKind::User => f.write_str("user"),
        }
    }
}

fn field_location(field: &Option<String>) -> String {
    match field {
        Some(name) => format!(", field {}", crate::utils::quote(name)),
        None => String::new(),
    }
}

/// Raised while compiling a schema. No layout is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Schema error in {schema}{}: {reason}", field_location(.field))]
pub struct SchemaError {
    pub schema: String,
    pub field: Option<String>,
    pub reason: String,
}

impl SchemaError {
    pub fn new(schema: &str, reason: impl Into<String>) -> Self {
        SchemaError {
            schema: schema.to_owned(),
            field: None,
            reason: reason.into(),
        }
    }

    pub fn at_field(schema: &str, field: &str, reason: impl Into<String>) -> Self {
        SchemaError {
            schema: schema.to_owned(),
            field: Some(field.to_owned()),
            reason: reason.into(),
        }
    }
}

/// Raised when a record instance fails its validator chain, or when decoded
/// bytes cannot be converted back into the field's wire kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed for field '{field}' in {schema}: {check} check `{rule}` rejected value {value}")]
pub struct ValidationError {
    pub schema: String,
    /// Dotted path of the field, e.g. `header.status` or `readings[2]`.
    pub field: String,
    /// Debug rendering of the offending value.
    pub value: String,
    pub check: CheckKind,
    pub rule: String,
}

impl ValidationError {
    pub fn mandatory(schema: &str, field: &str, value: impl Into<String>, rule: impl Into<String>) -> Self {
        ValidationError {
            schema: schema.to_owned(),
            field: field.to_owned(),
            value: value.into(),
            check: CheckKind::Mandatory,
            rule: rule.into(),
        }
    }

    pub fn is_mandatory(&self) -> bool {
        self.check == CheckKind::Mandatory
    }
}

/// Raised by decode when fewer than `total_size` bytes are supplied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unpack buffer too small for {schema}. Expected {expected} bytes, got {actual}.")]
pub struct SizeError {
    pub schema: String,
    pub expected: usize,
    pub actual: usize,
}

/// Raised by the in-place variants when the caller's region cannot hold the
/// record at the requested offset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Buffer too small for {schema}: need {needed} bytes at offset {offset}, but the buffer holds {available}.")]
pub struct BufferError {
    pub schema: String,
    pub offset: usize,
    pub needed: usize,
    pub available: usize,
}

/// A format token that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid format token {}: {reason}", crate::utils::quote(.token))]
pub struct FormatError {
    pub token: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PackError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Size(#[from] SizeError),

    #[error(transparent)]
    Buffer(#[from] BufferError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    Input(String),
}

pub type Result<T, E = PackError> = std::result::Result<T, E>;
