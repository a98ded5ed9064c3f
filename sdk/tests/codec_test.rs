#![cfg(test)]

use std::sync::Arc;

use safepack::{
    compile_schema, ByteOrder, CheckKind, Codec, CompiledLayout, FieldDescriptor, PackError, Rule,
    SchemaDefinition, Value,
};

fn compile(definition: SchemaDefinition) -> Arc<CompiledLayout> {
    compile_schema(&definition).expect("compile_schema failed")
}

fn header_codec() -> Codec {
    Codec::new(compile(
        SchemaDefinition::new("CodecHeader", ByteOrder::Network)
            .field(FieldDescriptor::uint8("version"))
            .field(FieldDescriptor::uint16("length"))
            .field(FieldDescriptor::int8("status").check(Rule::AtLeast(Value::Int(-1)))),
    ))
}

fn header(version: i128, length: i128, status: i128) -> Value {
    Value::object(
        "CodecHeader",
        [
            ("version", Value::Int(version)),
            ("length", Value::Int(length)),
            ("status", Value::Int(status)),
        ],
    )
}

#[test]
fn test_header_wire_format() {
    let codec = header_codec();
    assert_eq!(codec.layout().format_token(), "!BHb");
    assert_eq!(codec.total_size(), 4);

    let bytes = codec.encode(&header(1, 1024, -1)).expect("encode failed");
    assert_eq!(bytes, [0x01, 0x04, 0x00, 0xFF]);
    assert_eq!(codec.decode(&bytes).expect("decode failed"), header(1, 1024, -1));
}

#[test]
fn test_short_buffer() {
    let codec = header_codec();
    match codec.decode(&[0x01, 0x04, 0x00]) {
        Err(PackError::Size(err)) => {
            assert_eq!(err.schema, "CodecHeader");
            assert_eq!(err.expected, 4);
            assert_eq!(err.actual, 3);
            assert!(err.to_string().contains("Expected 4 bytes, got 3"));
        }
        other => panic!("expected a size error, got {:?}", other),
    }
}

#[test]
fn test_longer_input_decodes_prefix() {
    let codec = header_codec();
    let value = codec
        .decode(&[0x02, 0x00, 0x10, 0x00, 0xAA, 0xBB])
        .expect("decode failed");
    assert_eq!(value, header(2, 16, 0));
}

#[test]
fn test_decode_skips_user_checks() {
    // status -5 fails the user check on encode but decodes fine
    let codec = header_codec();
    let value = codec.decode(&[0x01, 0x00, 0x00, 0xFB]).expect("decode failed");
    assert_eq!(value.get("status"), Some(&Value::Int(-5)));

    match codec.encode(&value) {
        Err(PackError::Validation(err)) => {
            assert_eq!(err.field, "status");
            assert_eq!(err.check, CheckKind::User);
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_mandatory_range_before_user() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecTiny", ByteOrder::Little)
            .field(FieldDescriptor::uint8("value").check_with("value is odd", |v| v.as_int() % 2 == 1)),
    ));
    let value = Value::object("CodecTiny", [("value", Value::Int(300))]);
    match codec.encode(&value) {
        Err(PackError::Validation(err)) => {
            assert!(err.is_mandatory());
            assert_eq!(err.value, "300");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_encode_into_matches_encode() {
    let codec = header_codec();
    let value = header(7, 515, 3);
    let expected = codec.encode(&value).expect("encode failed");

    for offset in 0..=4 {
        let mut buffer = vec![0xEE; 8];
        codec
            .encode_into(&value, &mut buffer, offset)
            .expect("encode_into failed");
        assert_eq!(&buffer[offset..offset + 4], expected.as_slice());
        assert!(buffer[..offset].iter().all(|&b| b == 0xEE));
        assert!(buffer[offset + 4..].iter().all(|&b| b == 0xEE));

        let decoded = codec.decode_from(&buffer, offset).expect("decode_from failed");
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_region_errors() {
    let codec = header_codec();
    let value = header(1, 2, 3);

    let mut buffer = vec![0xEE; 4];
    match codec.encode_into(&value, &mut buffer, 1) {
        Err(PackError::Buffer(err)) => {
            assert_eq!(err.offset, 1);
            assert_eq!(err.needed, 4);
            assert_eq!(err.available, 4);
        }
        other => panic!("expected a buffer error, got {:?}", other),
    }
    assert_eq!(buffer, [0xEE; 4]);

    assert!(matches!(
        codec.encode_into(&value, &mut buffer, usize::MAX),
        Err(PackError::Buffer(_))
    ));
    assert!(matches!(codec.decode_from(&buffer, 2), Err(PackError::Buffer(_))));
    assert!(matches!(codec.decode_from(&buffer, usize::MAX), Err(PackError::Buffer(_))));
}

#[test]
fn test_nested_and_array_fields() {
    let codec = header_codec();
    let nested = codec.layout().clone();
    let message = Codec::new(compile(
        SchemaDefinition::new("CodecSensorData", ByteOrder::Little)
            .field(FieldDescriptor::nested("header", &nested))
            .field(FieldDescriptor::uint64("timestamp"))
            .field(FieldDescriptor::array("readings", FieldDescriptor::uint32("item"), 4))
            .field(FieldDescriptor::array("history", FieldDescriptor::nested("item", &nested), 2)),
    ));
    assert_eq!(message.layout().format_token(), "<BHbQIIIIBHbBHb");
    assert_eq!(message.total_size(), 4 + 8 + 16 + 8);

    let value = Value::object(
        "CodecSensorData",
        [
            ("header", header(1, 1024, -1)),
            ("timestamp", Value::Int(1_700_000_000)),
            (
                "readings",
                Value::Array(vec![Value::Int(10), Value::Int(20), Value::Int(30), Value::Int(40)]),
            ),
            ("history", Value::Array(vec![header(2, 1, 0), header(3, 2, 1)])),
        ],
    );
    let bytes = message.encode(&value).expect("encode failed");
    // nested records follow the outer byte order
    assert_eq!(&bytes[..4], &[0x01, 0x00, 0x04, 0xFF]);
    assert_eq!(&bytes[12..16], &10u32.to_le_bytes());
    assert_eq!(message.decode(&bytes).expect("decode failed"), value);

    let mut bad = value.clone();
    bad.set("history", Value::Array(vec![header(2, 1, 0), header(3, 2, -7)]));
    match message.encode(&bad) {
        Err(PackError::Validation(err)) => assert_eq!(err.field, "history[1].status"),
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[test]
fn test_text_float_and_bytes_fields() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecUserRecord", ByteOrder::Big)
            .field(FieldDescriptor::uint32("user_id"))
            .field(FieldDescriptor::text("name", 8))
            .field(FieldDescriptor::float32("score"))
            .field(FieldDescriptor::float64("balance"))
            .field(FieldDescriptor::bytes("tag", 2))
            .field(FieldDescriptor::boolean("active")),
    ));
    assert_eq!(codec.layout().format_token(), ">I8sfd2s?");
    assert_eq!(codec.total_size(), 4 + 8 + 4 + 8 + 2 + 1);

    let value = Value::object(
        "CodecUserRecord",
        [
            ("user_id", Value::Int(42)),
            ("name", Value::from("Alice")),
            ("score", Value::Float(25.5)),
            ("balance", Value::Float(-1234.125)),
            ("tag", Value::Bytes(vec![0xCA, 0xFE])),
            ("active", Value::Bool(true)),
        ],
    );
    let bytes = codec.encode(&value).expect("encode failed");
    assert_eq!(&bytes[4..12], b"Alice\0\0\0");
    assert_eq!(codec.decode(&bytes).expect("decode failed"), value);

    let mut long_name = value.clone();
    long_name.set("name", Value::from("Bartholomew"));
    assert!(matches!(codec.encode(&long_name), Err(PackError::Validation(_))));

    let mut wrong_tag = value.clone();
    wrong_tag.set("tag", Value::Bytes(vec![0xCA]));
    assert!(matches!(codec.encode(&wrong_tag), Err(PackError::Validation(_))));

    let mut huge = value;
    huge.set("score", Value::Float(1.0e40));
    assert!(matches!(codec.encode(&huge), Err(PackError::Validation(_))));
}

#[test]
fn test_invalid_bytes_on_decode() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecFlags", ByteOrder::Little)
            .field(FieldDescriptor::boolean("flag"))
            .field(FieldDescriptor::text("label", 2)),
    ));

    match codec.decode(&[0x02, b'o', b'k']) {
        Err(PackError::Validation(err)) => {
            assert_eq!(err.field, "flag");
            assert!(err.is_mandatory());
        }
        other => panic!("expected a validation error, got {:?}", other),
    }

    match codec.decode(&[0x01, 0xFF, 0xFE]) {
        Err(PackError::Validation(err)) => assert_eq!(err.field, "label"),
        other => panic!("expected a validation error, got {:?}", other),
    }

    let value = codec.decode(&[0x00, b'o', 0x00]).expect("decode failed");
    assert_eq!(value.get("label"), Some(&Value::from("o")));
}

#[test]
fn test_text_stops_at_first_nul() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecLabel", ByteOrder::Little).field(FieldDescriptor::text("name", 4)),
    ));

    let value = codec.decode(b"o\0x\0").expect("decode failed");
    assert_eq!(value.get("name"), Some(&Value::from("o")));
    assert_eq!(codec.encode(&value).expect("encode failed"), b"o\0\0\0");

    let value = codec.decode(b"\0abc").expect("decode failed");
    assert_eq!(value.get("name"), Some(&Value::from("")));

    // invalid bytes after the NUL are never looked at
    let value = codec.decode(&[b'h', b'i', 0x00, 0xFF]).expect("decode failed");
    assert_eq!(value.get("name"), Some(&Value::from("hi")));
}

#[test]
fn test_float32_values_must_be_exact() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecGauge", ByteOrder::Little)
            .field(FieldDescriptor::float32("level")),
    ));
    let gauge = |level: f64| Value::object("CodecGauge", [("level", Value::Float(level))]);

    match codec.encode(&gauge(0.1)) {
        Err(PackError::Validation(err)) => {
            assert_eq!(err.field, "level");
            assert!(err.is_mandatory());
            assert_eq!(err.rule, "value is a float exactly representable as float32");
        }
        other => panic!("expected a validation error, got {:?}", other),
    }

    for level in [0.5, 0.1f32 as f64, -1.0e-3f32 as f64, f64::INFINITY] {
        let bytes = codec.encode(&gauge(level)).expect("encode failed");
        assert_eq!(codec.decode(&bytes).expect("decode failed"), gauge(level));
    }
}

#[test]
fn test_zero_sized_fields() {
    let codec = Codec::new(compile(
        SchemaDefinition::new("CodecSparse", ByteOrder::Big)
            .field(FieldDescriptor::bytes("nothing", 0))
            .field(FieldDescriptor::text("empty", 0))
            .field(FieldDescriptor::array("none", FieldDescriptor::uint16("item"), 0))
            .field(FieldDescriptor::uint8("only")),
    ));
    assert_eq!(codec.total_size(), 1);

    let value = Value::object(
        "CodecSparse",
        [
            ("nothing", Value::Bytes(vec![])),
            ("empty", Value::from("")),
            ("none", Value::Array(vec![])),
            ("only", Value::Int(9)),
        ],
    );
    let bytes = codec.encode(&value).expect("encode failed");
    assert_eq!(bytes, [9]);
    assert_eq!(codec.decode(&bytes).expect("decode failed"), value);
}

#[test]
fn test_size_matches_format_token() {
    let codec = header_codec();
    let layout = codec.layout();
    assert_eq!(
        safepack::calcsize(layout.format_token()).expect("calcsize failed"),
        layout.total_size()
    );
    assert_eq!(
        codec.encode(&header(0, 0, 0)).expect("encode failed").len(),
        layout.total_size()
    );
}
