use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{
    error::SchemaError,
    format::calcsize,
    layout::{CompiledField, CompiledLayout, FlatSlot},
    registry,
    types::{FieldDescriptor, Rule, SchemaDefinition, SchemaRef, Validator, WireKind},
    utils::{is_identifier, quote},
};

/// Largest layout a single buffer can hold.
const MAX_LAYOUT_SIZE: usize = isize::MAX as usize;

/// End of a `size`-byte run at `offset`, if it fits in a layout.
fn end_of(offset: usize, size: usize) -> Option<usize> {
    offset.checked_add(size).filter(|&end| end <= MAX_LAYOUT_SIZE)
}

fn overflows(schema: &str, label: &str) -> SchemaError {
    SchemaError::at_field(schema, label, "layout size overflows")
}

/// Compiles `definition` into a layout, resolving schemas referenced by name
/// through the global registry.
pub fn compile_schema(definition: &SchemaDefinition) -> Result<Arc<CompiledLayout>, SchemaError> {
    compile_with(definition, registry::lookup)
}

/// Compiles `definition`, resolving schemas referenced by name with `resolve`.
///
/// Fails if the definition is empty, a name is duplicated or not an
/// identifier, a host type does not fit its wire kind, a user check cannot
/// apply to its field, or a referenced schema is unknown.
pub fn compile_with<R>(
    definition: &SchemaDefinition,
    resolve: R,
) -> Result<Arc<CompiledLayout>, SchemaError>
where
    R: Fn(&str) -> Option<Arc<CompiledLayout>>,
{
    let schema = definition.name.as_str();

    if !is_identifier(schema) {
        return Err(SchemaError::new(
            schema,
            format!("the schema name {} is not an identifier", quote(schema)),
        ));
    }
    if definition.fields.is_empty() {
        return Err(SchemaError::new(schema, "a schema needs at least one field"));
    }

    let mut by_name: HashMap<String, usize> = HashMap::new();
    for (index, field) in definition.fields.iter().enumerate() {
        if !is_identifier(&field.name) {
            return Err(SchemaError::at_field(
                schema,
                &field.name,
                "the field name is not an identifier",
            ));
        }
        if by_name.insert(field.name.clone(), index).is_some() {
            return Err(SchemaError::at_field(
                schema,
                &field.name,
                format!("the field {} is defined twice", quote(&field.name)),
            ));
        }
    }

    let mut cx = Context {
        schema,
        resolve: &resolve,
        flat: Vec::new(),
        codes: String::new(),
    };

    let mut fields = Vec::with_capacity(definition.fields.len());
    let mut offset = 0;
    for descriptor in &definition.fields {
        let field = cx.compile_field(descriptor, &descriptor.name, offset, &descriptor.name)?;
        offset = end_of(offset, field.size).ok_or_else(|| overflows(schema, &descriptor.name))?;
        fields.push(field);
    }

    let format_token = format!("{}{}", definition.order.marker(), cx.codes);
    let total_size = offset;

    let described = calcsize(&format_token).map_err(|e| SchemaError::new(schema, e.to_string()))?;
    if described != total_size {
        return Err(SchemaError::new(
            schema,
            format!(
                "format token {} describes {} bytes but the fields take {}",
                quote(&format_token),
                described,
                total_size
            ),
        ));
    }

    debug!(
        schema,
        format = %format_token,
        size = total_size,
        fields = fields.len(),
        "compiled schema layout"
    );

    Ok(Arc::new(CompiledLayout {
        name: schema.to_owned(),
        order: definition.order,
        fields,
        by_name,
        flat: cx.flat,
        format_token,
        total_size,
    }))
}

struct Context<'a, R> {
    schema: &'a str,
    resolve: &'a R,
    flat: Vec<FlatSlot>,
    codes: String,
}

impl<'a, R> Context<'a, R>
where
    R: Fn(&str) -> Option<Arc<CompiledLayout>>,
{
    /// Compiles one descriptor placed at `offset`, appending its flattened
    /// slots under `path`. `label` names the field in errors.
    fn compile_field(
        &mut self,
        descriptor: &FieldDescriptor,
        label: &str,
        offset: usize,
        path: &str,
    ) -> Result<CompiledField, SchemaError> {
        if !descriptor.host.is_compatible_with(&descriptor.kind) {
            return Err(SchemaError::at_field(
                self.schema,
                label,
                format!(
                    "host type {} is incompatible with wire kind {}",
                    descriptor.host,
                    descriptor.kind.describe()
                ),
            ));
        }

        for rule in &descriptor.checks {
            if !rule.applies_to(&descriptor.kind) {
                return Err(SchemaError::at_field(
                    self.schema,
                    label,
                    format!(
                        "check `{}` cannot apply to wire kind {}",
                        rule,
                        descriptor.kind.describe()
                    ),
                ));
            }
        }

        let mut nested = None;
        let mut element = None;

        let size = match &descriptor.kind {
            WireKind::Scalar(scalar) => {
                self.push_slot(path, scalar.code().to_string(), offset, scalar.size());
                scalar.size()
            }
            WireKind::Bytes(len) | WireKind::Text(len) => {
                self.push_slot(path, format!("{}s", len), offset, *len);
                *len
            }
            WireKind::Schema(reference) => {
                let layout = self.resolve_schema(reference, label)?;
                end_of(offset, layout.total_size()).ok_or_else(|| overflows(self.schema, label))?;
                for slot in layout.flat_fields() {
                    self.flat.push(FlatSlot {
                        path: format!("{}.{}", path, slot.path),
                        code: slot.code.clone(),
                        offset: offset + slot.offset,
                        size: slot.size,
                    });
                }
                // the outer byte order marker applies to the spliced codes
                self.codes.push_str(&layout.format_token()[1..]);
                let size = layout.total_size();
                nested = Some(layout);
                size
            }
            WireKind::Array { element: item, count } => {
                let mut inner = Context {
                    schema: self.schema,
                    resolve: self.resolve,
                    flat: Vec::new(),
                    codes: String::new(),
                };
                let compiled = inner.compile_field(item, &format!("{}[]", label), 0, "")?;
                let size = compiled
                    .size
                    .checked_mul(*count)
                    .filter(|&size| end_of(offset, size).is_some())
                    .ok_or_else(|| overflows(self.schema, label))?;
                for index in 0..*count {
                    let base = offset + index * compiled.size;
                    for slot in &inner.flat {
                        self.flat.push(FlatSlot {
                            path: format!("{}[{}]{}", path, index, slot.path),
                            code: slot.code.clone(),
                            offset: base + slot.offset,
                            size: slot.size,
                        });
                    }
                    self.codes.push_str(&inner.codes);
                }
                element = Some(Box::new(compiled));
                size
            }
        };

        let mandatory = match &nested {
            Some(layout) => Rule::RecordOf(layout.name().to_owned()),
            None => Rule::mandatory_for(&descriptor.kind),
        };
        let mut validators = Vec::with_capacity(descriptor.checks.len() + 1);
        validators.push(Validator::mandatory(mandatory));
        validators.extend(descriptor.checks.iter().cloned().map(Validator::user));

        Ok(CompiledField {
            descriptor: descriptor.clone(),
            offset,
            size,
            validators,
            nested,
            element,
        })
    }

    fn push_slot(&mut self, path: &str, code: String, offset: usize, size: usize) {
        self.codes.push_str(&code);
        self.flat.push(FlatSlot {
            path: path.to_owned(),
            code,
            offset,
            size,
        });
    }

    fn resolve_schema(
        &self,
        reference: &SchemaRef,
        label: &str,
    ) -> Result<Arc<CompiledLayout>, SchemaError> {
        match reference {
            SchemaRef::Compiled(layout) => Ok(layout.clone()),
            SchemaRef::Cell(cell) if cell.is_compiling() => Err(SchemaError::at_field(
                self.schema,
                label,
                format!("the schema {} contains itself", quote(cell.name())),
            )),
            SchemaRef::Cell(cell) => cell.get().map_err(|err| {
                SchemaError::at_field(
                    self.schema,
                    label,
                    format!("the schema {} failed to compile: {}", quote(cell.name()), err),
                )
            }),
            SchemaRef::Named(name) => (self.resolve)(name).ok_or_else(|| {
                SchemaError::at_field(
                    self.schema,
                    label,
                    format!("the schema {} has not been compiled", quote(name)),
                )
            }),
        }
    }
}
