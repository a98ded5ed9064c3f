//! Bridges between [`Value`] and `serde_json`.
//!
//! Bytes become arrays of byte values. Integers outside the `i64`/`u64` range
//! become strings. Record names are not written; reading JSON back needs the
//! layout to name records and to tell floats and bytes apart.

use std::collections::HashMap;

use safepack_compiler::validator::ROOT_PATH;
use safepack_compiler::{CompiledField, CompiledLayout, PackError, Result, WireKind};
use safepack_schema::{Scalar, Value};
use serde_json::{json, Map, Number, Value as Json};

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Bool(v) => Json::Bool(*v),
        Value::Int(v) => {
            if let Ok(v) = i64::try_from(*v) {
                Json::from(v)
            } else if let Ok(v) = u64::try_from(*v) {
                Json::from(v)
            } else {
                Json::String(v.to_string())
            }
        }
        Value::Float(v) => Number::from_f64(*v).map_or(Json::Null, Json::Number),
        Value::Bytes(bytes) => Json::Array(bytes.iter().map(|&b| Json::from(b)).collect()),
        Value::Text(text) => Json::String(text.clone()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(_, fields) => {
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let mut map = Map::new();
            for key in keys {
                map.insert(key.clone(), value_to_json(&fields[key]));
            }
            Json::Object(map)
        }
    }
}

/// Reads a record of `layout` from JSON. Shapes the layout cannot place are
/// carried over as they are and left for validation to reject.
pub fn value_from_json(json: &Json, layout: &CompiledLayout) -> Result<Value> {
    record_from_json(json, layout, "")
}

fn record_from_json(json: &Json, layout: &CompiledLayout, prefix: &str) -> Result<Value> {
    let object = match json {
        Json::Object(object) => object,
        other => return plain(other, prefix),
    };

    let mut value = Value::Object(layout.name().to_owned(), HashMap::new());
    for (key, item) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        let converted = match layout.field(key) {
            Some(field) => field_from_json(item, field, &path)?,
            None => plain(item, &path)?,
        };
        value.set(key, converted);
    }
    Ok(value)
}

fn field_from_json(json: &Json, field: &CompiledField, path: &str) -> Result<Value> {
    match (field.kind(), json) {
        (WireKind::Scalar(s), Json::Number(number)) if s.is_float() => {
            Ok(Value::Float(number.as_f64().unwrap_or(f64::NAN)))
        }
        (WireKind::Scalar(Scalar::F32 | Scalar::F64), Json::Null) => Ok(Value::Float(f64::NAN)),
        (WireKind::Bytes(_), Json::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| PackError::Input(format!("{}: {} is not a byte value", path, item)))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Value::Bytes),
        (WireKind::Bytes(_), Json::String(text)) => Ok(Value::Bytes(text.as_bytes().to_vec())),
        (WireKind::Schema(_), Json::Object(_)) => match &field.nested {
            Some(layout) => record_from_json(json, layout, path),
            None => plain(json, path),
        },
        (WireKind::Array { .. }, Json::Array(items)) => match &field.element {
            Some(element) => items
                .iter()
                .enumerate()
                .map(|(index, item)| field_from_json(item, element, &format!("{}[{}]", path, index)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            None => plain(json, path),
        },
        _ => plain(json, path),
    }
}

/// Conversion by JSON type alone.
fn plain(json: &Json, path: &str) -> Result<Value> {
    Ok(match json {
        Json::Bool(v) => Value::Bool(*v),
        Json::Number(number) => {
            if let Some(v) = number.as_i64() {
                Value::Int(v.into())
            } else if let Some(v) = number.as_u64() {
                Value::Int(v.into())
            } else {
                Value::Float(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(text) => Value::Text(text.clone()),
        Json::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| plain(item, &format!("{}[{}]", path, index)))
                .collect::<Result<Vec<_>>>()?,
        ),
        Json::Object(object) => {
            let mut value = Value::Object(String::new(), HashMap::new());
            for (key, item) in object {
                value.set(key, plain(item, &format!("{}.{}", path, key))?);
            }
            value
        }
        Json::Null => {
            let path = if path.is_empty() { ROOT_PATH } else { path };
            return Err(PackError::Input(format!("{}: null has no wire representation", path)));
        }
    })
}

/// The layout as JSON: name, byte order, format token, size, the top-level
/// fields and every flattened slot.
pub fn layout_to_json(layout: &CompiledLayout) -> Result<Json> {
    Ok(json!({
        "name": layout.name(),
        "order": layout.order().name(),
        "format": layout.format_token(),
        "size": layout.total_size(),
        "fields": serde_json::to_value(layout.field_infos())?,
        "flat": serde_json::to_value(layout.flat_fields())?,
    }))
}
