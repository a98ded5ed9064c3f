use std::sync::Arc;

use safepack_compiler::{CompiledLayout, Result, SchemaCell, SchemaError, ValidationError};
use safepack_schema::Value;

use crate::codec::Codec;

/// A host struct bound to a schema.
///
/// ```
/// use safepack::{ByteOrder, FieldDescriptor, Fields, Record, RecordExt, SchemaCell, Value, ValidationError};
///
/// #[derive(Debug, PartialEq)]
/// struct Header {
///     version: u8,
///     length: u16,
///     status: i8,
/// }
///
/// static HEADER: SchemaCell = SchemaCell::new("RecordDocHeader", ByteOrder::Network, || {
///     vec![
///         FieldDescriptor::uint8("version"),
///         FieldDescriptor::uint16("length"),
///         FieldDescriptor::int8("status"),
///     ]
/// });
///
/// impl Record for Header {
///     fn cell() -> &'static SchemaCell {
///         &HEADER
///     }
///
///     fn to_value(&self) -> Value {
///         Value::object(HEADER.name(), [
///             ("version", Value::from(self.version)),
///             ("length", Value::from(self.length)),
///             ("status", Value::from(self.status)),
///         ])
///     }
///
///     fn from_value(value: &Value) -> Result<Self, ValidationError> {
///         let fields = Fields::new(HEADER.name(), value);
///         Ok(Header {
///             version: fields.get("version")?,
///             length: fields.get("length")?,
///             status: fields.get("status")?,
///         })
///     }
/// }
///
/// let header = Header { version: 1, length: 1024, status: -1 };
/// let bytes = header.pack().unwrap();
/// assert_eq!(bytes, [0x01, 0x04, 0x00, 0xFF]);
/// assert_eq!(Header::unpack(&bytes).unwrap(), header);
/// ```
pub trait Record: Sized {
    fn cell() -> &'static SchemaCell;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Result<Self, ValidationError>;
}

/// Schema-bound encode and decode for every [`Record`].
pub trait RecordExt: Record {
    fn layout() -> Result<Arc<CompiledLayout>, SchemaError> {
        Self::cell().get()
    }

    fn codec() -> Result<Codec> {
        Ok(Codec::new(Self::layout()?))
    }

    fn pack(&self) -> Result<Vec<u8>> {
        Self::codec()?.encode(&self.to_value())
    }

    fn pack_into(&self, buffer: &mut [u8], offset: usize) -> Result<()> {
        Self::codec()?.encode_into(&self.to_value(), buffer, offset)
    }

    fn unpack(data: &[u8]) -> Result<Self> {
        let value = Self::codec()?.decode(data)?;
        Ok(Self::from_value(&value)?)
    }

    fn unpack_from(data: &[u8], offset: usize) -> Result<Self> {
        let value = Self::codec()?.decode_from(data, offset)?;
        Ok(Self::from_value(&value)?)
    }
}

impl<T: Record> RecordExt for T {}

/// Conversion from a field value to a host type.
pub trait FromValue: Sized {
    /// What the conversion accepts, for error messages.
    fn expected() -> String;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn expected() -> String {
                    format!("value converts to {}", stringify!($ty))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match *value {
                        Value::Int(v) => <$ty>::try_from(v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

from_int!(u8, u16, u32, u64, i8, i16, i32, i64);

impl FromValue for bool {
    fn expected() -> String {
        "value converts to bool".to_owned()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for f32 {
    fn expected() -> String {
        "value converts to f32".to_owned()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Float(v) => Some(v as f32),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> String {
        "value converts to f64".to_owned()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match *value {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl FromValue for String {
    fn expected() -> String {
        "value converts to String".to_owned()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text.clone()),
            _ => None,
        }
    }
}

/// Fixed-length byte fields.
impl<const N: usize> FromValue for [u8; N] {
    fn expected() -> String {
        format!("value converts to [u8; {}]", N)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(bytes) => bytes.as_slice().try_into().ok(),
            _ => None,
        }
    }
}

/// Array fields.
impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> String {
        format!("value is an array where each {}", T::expected())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// Reads the fields of one record value, turning mismatches into mandatory
/// validation errors.
pub struct Fields<'a> {
    schema: &'a str,
    value: &'a Value,
}

impl<'a> Fields<'a> {
    pub fn new(schema: &'a str, value: &'a Value) -> Fields<'a> {
        Fields { schema, value }
    }

    fn field(&self, name: &str) -> Result<&'a Value, ValidationError> {
        self.value
            .get(name)
            .ok_or_else(|| ValidationError::mandatory(self.schema, name, "<missing>", "field is present"))
    }

    pub fn get<T: FromValue>(&self, name: &str) -> Result<T, ValidationError> {
        let value = self.field(name)?;
        T::from_value(value).ok_or_else(|| {
            ValidationError::mandatory(self.schema, name, format!("{:?}", value), T::expected())
        })
    }

    /// A nested record field.
    pub fn record<T: Record>(&self, name: &str) -> Result<T, ValidationError> {
        T::from_value(self.field(name)?).map_err(|mut err| {
            err.field = format!("{}.{}", name, err.field);
            err.schema = self.schema.to_owned();
            err
        })
    }

    /// An array of nested records.
    pub fn records<T: Record>(&self, name: &str) -> Result<Vec<T>, ValidationError> {
        let value = self.field(name)?;
        match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    T::from_value(item).map_err(|mut err| {
                        err.field = format!("{}[{}].{}", name, index, err.field);
                        err.schema = self.schema.to_owned();
                        err
                    })
                })
                .collect(),
            _ => Err(ValidationError::mandatory(
                self.schema,
                name,
                format!("{:?}", value),
                "value is an array of records",
            )),
        }
    }
}
