//! JSON schema documents.
//!
//! ```json
//! { "schemas": [
//!     { "name": "Header", "order": "network", "fields": [
//!         { "name": "version", "type": "uint8" },
//!         { "name": "status", "type": "int8", "checks": [ { "min": -1 } ] } ] },
//!     { "name": "Packet", "order": "little", "fields": [
//!         { "name": "header", "type": "Header" },
//!         { "name": "samples", "type": "uint16", "count": 4 },
//!         { "name": "name", "type": "text", "length": 8 } ] } ] }
//! ```
//!
//! A `type` is a scalar name, `bytes`, `text`, or the name of a schema
//! defined earlier in the same document or already registered. With `count`
//! the field is an array and its checks apply to each element.

use std::collections::HashMap;
use std::sync::Arc;

use safepack_schema::{ByteOrder, Scalar, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::{
    compiler::compile_with,
    error::{Result, SchemaError},
    layout::CompiledLayout,
    registry,
    types::{FieldDescriptor, Rule, SchemaDefinition, WireKind},
    utils::quote,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    pub schemas: Vec<SchemaDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDoc {
    pub name: String,
    pub order: String,
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checks: Vec<CheckDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckDoc {
    Min(Json),
    Max(Json),
    Between([Json; 2]),
    OneOf(Vec<Json>),
    Equals(Json),
    NotEqual(Json),
}

/// Parses a byte order name or marker. Orders that depend on the host are
/// refused.
pub fn parse_order(schema: &str, text: &str) -> std::result::Result<ByteOrder, SchemaError> {
    match text {
        "little" | "<" => Ok(ByteOrder::Little),
        "big" | ">" => Ok(ByteOrder::Big),
        "network" | "!" => Ok(ByteOrder::Network),
        "native" | "standard" | "=" | "@" => Err(SchemaError::new(
            schema,
            format!(
                "byte order {} depends on the host; use little, big or network",
                quote(text)
            ),
        )),
        _ => Err(SchemaError::new(
            schema,
            format!("unknown byte order {}", quote(text)),
        )),
    }
}

impl SchemaDocument {
    pub fn parse(text: &str) -> Result<SchemaDocument> {
        Ok(serde_json::from_str(text)?)
    }

    /// Compiles every schema in document order. Later schemas may embed
    /// earlier ones by name.
    pub fn compile(&self) -> std::result::Result<Vec<Arc<CompiledLayout>>, SchemaError> {
        let mut local: HashMap<String, Arc<CompiledLayout>> = HashMap::new();
        let mut layouts = Vec::with_capacity(self.schemas.len());

        for schema in &self.schemas {
            let definition = schema.to_definition()?;
            let layout = compile_with(&definition, |name: &str| {
                local.get(name).cloned().or_else(|| registry::lookup(name))
            })?;
            if local.insert(layout.name().to_owned(), layout.clone()).is_some() {
                return Err(SchemaError::new(
                    layout.name(),
                    "the schema is defined twice in the document",
                ));
            }
            layouts.push(layout);
        }

        Ok(layouts)
    }
}

impl SchemaDoc {
    pub fn to_definition(&self) -> std::result::Result<SchemaDefinition, SchemaError> {
        let order = parse_order(&self.name, &self.order)?;
        let fields = self
            .fields
            .iter()
            .map(|field| field.to_descriptor(&self.name))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(SchemaDefinition::new(&self.name, order).fields(fields))
    }
}

impl FieldDoc {
    fn to_descriptor(&self, schema: &str) -> std::result::Result<FieldDescriptor, SchemaError> {
        let fail = |reason: String| SchemaError::at_field(schema, &self.name, reason);

        let kind = match (self.type_name.as_str(), self.length) {
            ("bytes", Some(len)) => WireKind::Bytes(len),
            ("text", Some(len)) => WireKind::Text(len),
            ("bytes", None) | ("text", None) => {
                return Err(fail(format!("{} fields need a length", self.type_name)))
            }
            (name, length) => {
                if length.is_some() {
                    return Err(fail(format!("{} fields take no length", quote(name))));
                }
                match Scalar::from_name(name) {
                    Some(scalar) => WireKind::Scalar(scalar),
                    None => return self.wrap(FieldDescriptor::nested_named(&self.name, name), schema),
                }
            }
        };

        self.wrap(FieldDescriptor::new(&self.name, kind), schema)
    }

    /// Attaches the checks and, with a count, turns the field into an array.
    fn wrap(
        &self,
        mut descriptor: FieldDescriptor,
        schema: &str,
    ) -> std::result::Result<FieldDescriptor, SchemaError> {
        for check in &self.checks {
            let rule = check
                .to_rule(&descriptor.kind)
                .map_err(|reason| SchemaError::at_field(schema, &self.name, reason))?;
            descriptor = descriptor.check(rule);
        }
        Ok(match self.count {
            Some(count) => FieldDescriptor::array(&self.name, descriptor, count),
            None => descriptor,
        })
    }
}

impl CheckDoc {
    fn to_rule(&self, kind: &WireKind) -> std::result::Result<Rule, String> {
        Ok(match self {
            CheckDoc::Min(bound) => Rule::AtLeast(operand(bound, kind)?),
            CheckDoc::Max(bound) => Rule::AtMost(operand(bound, kind)?),
            CheckDoc::Between([low, high]) => {
                Rule::Between(operand(low, kind)?, operand(high, kind)?)
            }
            CheckDoc::OneOf(options) => Rule::OneOf(
                options
                    .iter()
                    .map(|option| operand(option, kind))
                    .collect::<std::result::Result<_, _>>()?,
            ),
            CheckDoc::Equals(expected) => Rule::Equals(operand(expected, kind)?),
            CheckDoc::NotEqual(unexpected) => Rule::NotEqual(operand(unexpected, kind)?),
        })
    }
}

/// Converts a check operand. Byte fields take a string or an array of byte
/// values, float fields take any number as a float; everything else maps by
/// JSON type.
fn operand(json: &Json, kind: &WireKind) -> std::result::Result<Value, String> {
    if let WireKind::Bytes(_) = kind {
        return match json {
            Json::String(text) => Ok(Value::Bytes(text.as_bytes().to_vec())),
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|byte| u8::try_from(byte).ok())
                        .ok_or_else(|| format!("{} is not a byte value", item))
                })
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map(Value::Bytes),
            other => Err(format!("{} is not a bytes operand", other)),
        };
    }

    let float = matches!(kind, WireKind::Scalar(scalar) if scalar.is_float());
    match json {
        Json::Bool(value) => Ok(Value::Bool(*value)),
        Json::Number(number) if float => Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN))),
        Json::Number(number) => {
            if let Some(value) = number.as_i64() {
                Ok(Value::Int(value.into()))
            } else if let Some(value) = number.as_u64() {
                Ok(Value::Int(value.into()))
            } else {
                Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Json::String(text) => Ok(Value::Text(text.clone())),
        other => Err(format!("{} is not a check operand", other)),
    }
}
