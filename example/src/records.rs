// example/src/records.rs

use safepack::{ByteOrder, FieldDescriptor, Fields, Record, Rule, SchemaCell, ValidationError, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub version: u8,
    pub length: u16,
    pub status: i8,
}

pub static HEADER: SchemaCell = SchemaCell::new("Header", ByteOrder::Network, || {
    vec![
        FieldDescriptor::uint8("version"),
        FieldDescriptor::uint16("length"),
        FieldDescriptor::int8("status").check(Rule::AtLeast(Value::Int(-1))),
    ]
});

impl Record for Header {
    fn cell() -> &'static SchemaCell {
        &HEADER
    }

    fn to_value(&self) -> Value {
        Value::object(
            HEADER.name(),
            [
                ("version", Value::from(self.version)),
                ("length", Value::from(self.length)),
                ("status", Value::from(self.status)),
            ],
        )
    }

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(HEADER.name(), value);
        Ok(Header {
            version: fields.get("version")?,
            length: fields.get("length")?,
            status: fields.get("status")?,
        })
    }
}

/// A header followed by a payload id and a short fixed-size body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolMessage {
    pub header: Header,
    pub payload_id: u32,
    pub body: [u8; 4],
}

pub static PROTOCOL_MESSAGE: SchemaCell = SchemaCell::new("ProtocolMessage", ByteOrder::Network, || {
    vec![
        FieldDescriptor::nested_cell("header", &HEADER),
        FieldDescriptor::uint32("payload_id").check(Rule::NotEqual(Value::Int(0))),
        FieldDescriptor::bytes("body", 4),
    ]
});

impl Record for ProtocolMessage {
    fn cell() -> &'static SchemaCell {
        &PROTOCOL_MESSAGE
    }

    fn to_value(&self) -> Value {
        Value::object(
            PROTOCOL_MESSAGE.name(),
            [
                ("header", self.header.to_value()),
                ("payload_id", Value::from(self.payload_id)),
                ("body", Value::from(self.body.to_vec())),
            ],
        )
    }

    fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let fields = Fields::new(PROTOCOL_MESSAGE.name(), value);
        Ok(ProtocolMessage {
            header: fields.record("header")?,
            payload_id: fields.get("payload_id")?,
            body: fields.get("body")?,
        })
    }
}
