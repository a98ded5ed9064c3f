use std::collections::HashMap;
use std::sync::Arc;

use safepack_schema::ByteOrder;
use serde::Serialize;

use crate::types::{FieldDescriptor, Validator, WireKind};
use crate::error::CheckKind;

/// A top-level field of a compiled schema.
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub descriptor: FieldDescriptor,
    /// Byte offset relative to the start of the enclosing record (or of the
    /// enclosing array element).
    pub offset: usize,
    pub size: usize,
    /// Mandatory validator first, then user validators in declared order.
    pub validators: Vec<Validator>,
    /// The resolved layout of a nested-schema field.
    pub nested: Option<Arc<CompiledLayout>>,
    /// The compiled element of an array field, at offset 0.
    pub element: Option<Box<CompiledField>>,
}

impl CompiledField {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> &WireKind {
        &self.descriptor.kind
    }

    pub fn has_user_validator(&self) -> bool {
        self.validators.iter().any(|v| v.kind == CheckKind::User)
    }

    /// Same name, kind, host type and validator chain. Rules are compared by
    /// kind and description, so two custom predicates with the same
    /// description count as equal.
    fn same_shape(&self, other: &CompiledField) -> bool {
        let same_nested = match (&self.nested, &other.nested) {
            (Some(a), Some(b)) => a.same_shape(b),
            (None, None) => true,
            _ => false,
        };
        let same_element = match (&self.element, &other.element) {
            (Some(a), Some(b)) => a.same_shape(b),
            (None, None) => true,
            _ => false,
        };
        self.descriptor.name == other.descriptor.name
            && self.descriptor.host == other.descriptor.host
            && self.offset == other.offset
            && self.size == other.size
            && self.validators.len() == other.validators.len()
            && self
                .validators
                .iter()
                .zip(&other.validators)
                .all(|(a, b)| a.kind == b.kind && a.rule.to_string() == b.rule.to_string())
            && same_nested
            && same_element
    }

    pub fn info(&self) -> FieldInfo {
        FieldInfo {
            name: self.descriptor.name.clone(),
            wire_kind: self.descriptor.kind.describe(),
            byte_offset: self.offset,
            byte_length: self.size,
            has_user_validator: self.has_user_validator(),
        }
    }
}

/// One scalar or byte run of the flattened layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatSlot {
    /// e.g. `header.version` or `readings[2]`
    pub path: String,
    pub code: String,
    pub offset: usize,
    pub size: usize,
}

/// Read-only description of a top-level field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub wire_kind: String,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub has_user_validator: bool,
}

/// The immutable result of compiling a schema.
///
/// Built once per schema and shared behind an `Arc` by every encode, decode
/// and validation of that schema.
#[derive(Debug)]
pub struct CompiledLayout {
    pub(crate) name: String,
    pub(crate) order: ByteOrder,
    pub(crate) fields: Vec<CompiledField>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) flat: Vec<FlatSlot>,
    pub(crate) format_token: String,
    pub(crate) total_size: usize,
}

impl CompiledLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    /// Marker followed by every wire code in flattened order.
    pub fn format_token(&self) -> &str {
        &self.format_token
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn fields(&self) -> &[CompiledField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CompiledField> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    pub fn flat_fields(&self) -> &[FlatSlot] {
        &self.flat
    }

    pub fn field_info(&self, name: &str) -> Option<FieldInfo> {
        self.field(name).map(CompiledField::info)
    }

    pub fn field_infos(&self) -> Vec<FieldInfo> {
        self.fields.iter().map(CompiledField::info).collect()
    }

    /// Two layouts describe the same wire format, field structure, host
    /// types and validator chains.
    pub fn same_shape(&self, other: &CompiledLayout) -> bool {
        self.name == other.name
            && self.order == other.order
            && self.format_token == other.format_token
            && self.flat == other.flat
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(&other.fields).all(|(a, b)| a.same_shape(b))
    }
}
