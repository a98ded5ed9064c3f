use std::collections::HashMap;
use std::sync::Arc;

use safepack_compiler::{
    validate, BufferError, CompiledField, CompiledLayout, PackError, Result, Rule, SizeError,
    ValidationError, WireKind,
};
use safepack_schema::{ByteOrder, ByteReader, ByteWriter, Value};

/// Encodes and decodes records of one compiled schema.
///
/// ```
/// use safepack::{Codec, FieldDescriptor, SchemaDefinition, Value, ByteOrder};
///
/// let definition = SchemaDefinition::new("Header", ByteOrder::Network)
///     .field(FieldDescriptor::uint8("version"))
///     .field(FieldDescriptor::uint16("length"))
///     .field(FieldDescriptor::int8("status"));
/// let codec = Codec::new(safepack::compile_schema(&definition).unwrap());
///
/// let header = Value::object("Header", [
///     ("version", Value::from(1u8)),
///     ("length", Value::from(1024u16)),
///     ("status", Value::from(-1i8)),
/// ]);
/// let bytes = codec.encode(&header).unwrap();
/// assert_eq!(bytes, [0x01, 0x04, 0x00, 0xFF]);
/// assert_eq!(codec.decode(&bytes).unwrap(), header);
/// ```
#[derive(Debug, Clone)]
pub struct Codec {
    layout: Arc<CompiledLayout>,
}

impl Codec {
    pub fn new(layout: Arc<CompiledLayout>) -> Codec {
        Codec { layout }
    }

    pub fn layout(&self) -> &Arc<CompiledLayout> {
        &self.layout
    }

    pub fn total_size(&self) -> usize {
        self.layout.total_size()
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        validate(value, &self.layout)
    }

    /// Validates `value` and returns exactly `total_size` bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.validate(value)?;
        let mut data = vec![0; self.total_size()];
        self.write(value, &mut data, 0)?;
        Ok(data)
    }

    /// Validates `value` and writes it to `buffer[offset..offset + total_size]`.
    /// Nothing is written unless the whole record fits.
    pub fn encode_into(&self, value: &Value, buffer: &mut [u8], offset: usize) -> Result<()> {
        self.validate(value)?;
        self.check_region(buffer.len(), offset)?;
        self.write(value, buffer, offset)
    }

    /// Decodes the first `total_size` bytes of `data`. Longer input is fine.
    pub fn decode(&self, data: &[u8]) -> Result<Value> {
        if data.len() < self.total_size() {
            return Err(SizeError {
                schema: self.layout.name().to_owned(),
                expected: self.total_size(),
                actual: data.len(),
            }
            .into());
        }
        self.read(data, 0)
    }

    /// Decodes the record stored at `offset` without copying the buffer.
    pub fn decode_from(&self, data: &[u8], offset: usize) -> Result<Value> {
        self.check_region(data.len(), offset)?;
        self.read(data, offset)
    }

    fn check_region(&self, available: usize, offset: usize) -> Result<(), BufferError> {
        match offset.checked_add(self.total_size()) {
            Some(end) if end <= available => Ok(()),
            _ => Err(self.cx(offset).short(available)),
        }
    }

    fn cx(&self, offset: usize) -> Cx<'_> {
        Cx {
            schema: self.layout.name(),
            order: self.layout.order(),
            offset,
            size: self.total_size(),
        }
    }

    fn write(&self, value: &Value, buffer: &mut [u8], offset: usize) -> Result<()> {
        let mut bb = ByteWriter::at(buffer, offset);
        self.cx(offset).write_record(&mut bb, value, &self.layout, "")
    }

    fn read(&self, data: &[u8], offset: usize) -> Result<Value> {
        let mut bb = ByteReader::at(data, offset);
        self.cx(offset).read_record(&mut bb, &self.layout, "")
    }
}

/// Per-call state. Nested records are laid out with the outer byte order.
struct Cx<'a> {
    schema: &'a str,
    order: ByteOrder,
    /// Start of the record in the buffer.
    offset: usize,
    size: usize,
}

impl<'a> Cx<'a> {
    fn rejected(&self, path: &str, value: &Value, field: &CompiledField) -> PackError {
        ValidationError::mandatory(
            self.schema,
            path,
            format!("{:?}", value),
            Rule::mandatory_for(field.kind()).to_string(),
        )
        .into()
    }

    /// The record does not fit in a buffer of `available` bytes.
    fn short(&self, available: usize) -> BufferError {
        BufferError {
            schema: self.schema.to_owned(),
            offset: self.offset,
            needed: self.size,
            available,
        }
    }

    fn write_record(
        &self,
        bb: &mut ByteWriter,
        value: &Value,
        layout: &CompiledLayout,
        prefix: &str,
    ) -> Result<()> {
        for field in layout.fields() {
            let path = join(prefix, field.name());
            let item = value.get(field.name()).ok_or_else(|| {
                ValidationError::mandatory(self.schema, &path, "<missing>", "field is present")
            })?;
            self.write_field(bb, item, field, &path)?;
        }
        Ok(())
    }

    fn read_record(&self, bb: &mut ByteReader, layout: &CompiledLayout, prefix: &str) -> Result<Value> {
        let mut fields = HashMap::with_capacity(layout.fields().len());
        for field in layout.fields() {
            let item = self.read_field(bb, field, &join(prefix, field.name()))?;
            fields.insert(field.name().to_owned(), item);
        }
        Ok(Value::Object(layout.name().to_owned(), fields))
    }

    fn write_field(
        &self,
        bb: &mut ByteWriter,
        value: &Value,
        field: &CompiledField,
        path: &str,
    ) -> Result<()> {
        match field.kind() {
            WireKind::Scalar(scalar) => {
                let scalar_value = value
                    .to_scalar()
                    .ok_or_else(|| self.rejected(path, value, field))?;
                bb.write_scalar(*scalar, self.order, scalar_value)
                    .map_err(|_| self.rejected(path, value, field))
            }
            WireKind::Bytes(len) => bb
                .write_padded(value.as_bytes(), *len)
                .map_err(|_| self.rejected(path, value, field)),
            WireKind::Text(len) => bb
                .write_padded(value.as_text().as_bytes(), *len)
                .map_err(|_| self.rejected(path, value, field)),
            WireKind::Schema(_) => {
                let layout = field
                    .nested
                    .as_ref()
                    .ok_or_else(|| self.rejected(path, value, field))?;
                self.write_record(bb, value, layout, path)
            }
            WireKind::Array { .. } => {
                let element = field
                    .element
                    .as_ref()
                    .ok_or_else(|| self.rejected(path, value, field))?;
                for (index, item) in value.as_array().iter().enumerate() {
                    self.write_field(bb, item, element, &format!("{}[{}]", path, index))?;
                }
                Ok(())
            }
        }
    }

    fn read_field(&self, bb: &mut ByteReader, field: &CompiledField, path: &str) -> Result<Value> {
        match field.kind() {
            WireKind::Scalar(scalar) => {
                let available = bb.data().len();
                let raw = bb
                    .read_bytes(scalar.size())
                    .map_err(|_| self.short(available))?;
                safepack_schema::unpack_scalar(raw, *scalar, self.order)
                    .map(Value::from)
                    .map_err(|_| self.rejected(path, &Value::Bytes(raw.to_vec()), field))
            }
            WireKind::Bytes(len) => {
                let available = bb.data().len();
                let raw = bb.read_bytes(*len).map_err(|_| self.short(available))?;
                Ok(Value::Bytes(raw.to_vec()))
            }
            WireKind::Text(len) => {
                let available = bb.data().len();
                let raw = bb.read_bytes(*len).map_err(|_| self.short(available))?;
                // text ends at the first NUL; whatever follows it is padding
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                std::str::from_utf8(&raw[..end])
                    .map(|text| Value::Text(text.to_owned()))
                    .map_err(|_| self.rejected(path, &Value::Bytes(raw.to_vec()), field))
            }
            WireKind::Schema(_) => {
                let layout = field
                    .nested
                    .as_ref()
                    .ok_or_else(|| self.rejected(path, &Value::Bytes(Vec::new()), field))?;
                self.read_record(bb, layout, path)
            }
            WireKind::Array { count, .. } => {
                let element = field
                    .element
                    .as_ref()
                    .ok_or_else(|| self.rejected(path, &Value::Bytes(Vec::new()), field))?;
                let items = (0..*count)
                    .map(|index| self.read_field(bb, element, &format!("{}[{}]", path, index)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::Array(items))
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safepack_compiler::{compile_schema, FieldDescriptor, SchemaDefinition};

    fn codec() -> Codec {
        let definition = SchemaDefinition::new("CodecShort", ByteOrder::Big)
            .field(FieldDescriptor::uint16("id"))
            .field(FieldDescriptor::text("name", 4));
        Codec::new(compile_schema(&definition).unwrap())
    }

    #[test]
    fn short_reads_report_the_record_region() {
        let codec = codec();
        let data = [0xAA, 0x00, 0x07, b'a'];

        // a read that runs out mid record reports the same region as the
        // up-front check would have
        let err = match codec.read(&data, 1) {
            Err(PackError::Buffer(err)) => err,
            other => panic!("expected a buffer error, got {:?}", other),
        };
        assert_eq!(err, codec.check_region(data.len(), 1).unwrap_err());
        assert_eq!(err.offset, 1);
        assert_eq!(err.needed, 6);
        assert_eq!(err.available, 4);
    }
}
