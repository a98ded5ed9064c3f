use safepack_schema::Value;

use crate::{
    error::{CheckKind, ValidationError},
    layout::{CompiledField, CompiledLayout},
    types::{Rule, Validator},
};

/// How the top-level record is named in error paths.
pub const ROOT_PATH: &str = "$root";

/// Runs every validator of `layout` against `value`.
///
/// Fields are visited in layout order. For each field the mandatory check
/// runs first, then nested records and array elements are checked, then the
/// user checks in declared order. The first failure is returned.
pub fn validate(value: &Value, layout: &CompiledLayout) -> Result<(), ValidationError> {
    let walker = Walker {
        schema: layout.name(),
    };
    let root = Rule::RecordOf(layout.name().to_owned());
    if !root.check(value) {
        return Err(walker.fail(ROOT_PATH, value, CheckKind::Mandatory, &root));
    }
    walker.record(value, layout, "")
}

struct Walker<'a> {
    schema: &'a str,
}

impl<'a> Walker<'a> {
    fn record(&self, value: &Value, layout: &CompiledLayout, prefix: &str) -> Result<(), ValidationError> {
        for field in layout.fields() {
            let path = join(prefix, field.name());
            match value.get(field.name()) {
                Some(item) => self.field(item, field, &path)?,
                None => {
                    return Err(ValidationError {
                        schema: self.schema.to_owned(),
                        field: path,
                        value: "<missing>".to_owned(),
                        check: CheckKind::Mandatory,
                        rule: "field is present".to_owned(),
                    })
                }
            }
        }

        if let Value::Object(_, members) = value {
            let mut undeclared: Vec<&String> = members
                .keys()
                .filter(|name| layout.field(name).is_none())
                .collect();
            undeclared.sort();
            if let Some(name) = undeclared.first() {
                return Err(ValidationError {
                    schema: self.schema.to_owned(),
                    field: join(prefix, name),
                    value: format!("{:?}", members[*name]),
                    check: CheckKind::Mandatory,
                    rule: format!("field is declared in {}", layout.name()),
                });
            }
        }

        Ok(())
    }

    fn field(&self, value: &Value, field: &CompiledField, path: &str) -> Result<(), ValidationError> {
        let (mandatory, user) = field.validators.split_at(1.min(field.validators.len()));
        self.run(value, mandatory, path)?;

        if let Some(layout) = &field.nested {
            self.record(value, layout, path)?;
        }
        if let Some(element) = &field.element {
            for (index, item) in value.as_array().iter().enumerate() {
                self.field(item, element, &format!("{}[{}]", path, index))?;
            }
        }

        self.run(value, user, path)
    }

    fn run(&self, value: &Value, validators: &[Validator], path: &str) -> Result<(), ValidationError> {
        match validators.iter().find(|v| !v.rule.check(value)) {
            Some(v) => Err(self.fail(path, value, v.kind, &v.rule)),
            None => Ok(()),
        }
    }

    fn fail(&self, path: &str, value: &Value, check: CheckKind, rule: &Rule) -> ValidationError {
        ValidationError {
            schema: self.schema.to_owned(),
            field: path.to_owned(),
            value: format!("{:?}", value),
            check,
            rule: rule.to_string(),
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
    use crate::compiler::compile_with;
    use crate::types::{FieldDescriptor, SchemaDefinition};
    use safepack_schema::ByteOrder;
    use std::sync::Arc;

    fn compile(definition: SchemaDefinition) -> Arc<CompiledLayout> {
        compile_with(&definition, |_: &str| None).unwrap()
    }

    fn header() -> Arc<CompiledLayout> {
        compile(
            SchemaDefinition::new("Header", ByteOrder::Network)
                .field(FieldDescriptor::uint8("version"))
                .field(FieldDescriptor::uint16("length"))
                .field(FieldDescriptor::int8("status").check(Rule::AtLeast(Value::Int(-1)))),
        )
    }

    fn header_value(version: i128, length: i128, status: i128) -> Value {
        Value::object(
            "Header",
            [
                ("version", Value::Int(version)),
                ("length", Value::Int(length)),
                ("status", Value::Int(status)),
            ],
        )
    }

    #[test]
    fn accepts_valid_record() {
        assert_eq!(validate(&header_value(1, 1024, -1), &header()), Ok(()));
    }

    #[test]
    fn mandatory_range_runs_before_user_checks() {
        let layout = compile(
            SchemaDefinition::new("Tiny", ByteOrder::Little).field(
                FieldDescriptor::uint8("value").check_with("never", |_| false),
            ),
        );
        let value = Value::object("Tiny", [("value", Value::Int(300))]);
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.field, "value");
        assert_eq!(err.check, CheckKind::Mandatory);
        assert_eq!(err.rule, "0 <= value <= 255 (uint8)");
        assert_eq!(err.value, "300");

        let value = Value::object("Tiny", [("value", Value::Int(3))]);
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.check, CheckKind::User);
        assert_eq!(err.rule, "never");
    }

    #[test]
    fn user_check_failure() {
        let err = validate(&header_value(1, 1024, -5), &header()).unwrap_err();
        assert_eq!(err.schema, "Header");
        assert_eq!(err.field, "status");
        assert_eq!(err.check, CheckKind::User);
        assert_eq!(err.value, "-5");
    }

    #[test]
    fn first_failure_in_layout_order_wins() {
        let err = validate(&header_value(256, 70000, -5), &header()).unwrap_err();
        assert_eq!(err.field, "version");
    }

    #[test]
    fn nested_paths() {
        let header = header();
        let layout = compile(
            SchemaDefinition::new("Message", ByteOrder::Little)
                .field(FieldDescriptor::nested("header", &header))
                .field(FieldDescriptor::uint32("payload_id")),
        );
        let value = Value::object(
            "Message",
            [
                ("header", header_value(1, 2, -9)),
                ("payload_id", Value::Int(7)),
            ],
        );
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.schema, "Message");
        assert_eq!(err.field, "header.status");
        assert_eq!(err.check, CheckKind::User);

        let wrong = Value::object("Message", [("header", Value::Int(1)), ("payload_id", Value::Int(7))]);
        let err = validate(&wrong, &layout).unwrap_err();
        assert_eq!(err.field, "header");
        assert_eq!(err.rule, "value is a Header record");
    }

    #[test]
    fn array_element_paths() {
        let layout = compile(
            SchemaDefinition::new("SensorData", ByteOrder::Big).field(FieldDescriptor::array(
                "readings",
                FieldDescriptor::uint32("item").check(Rule::AtMost(Value::Int(1000))),
                3,
            )),
        );
        let value = Value::object(
            "SensorData",
            [("readings", Value::Array(vec![Value::Int(1), Value::Int(2000), Value::Int(-1)]))],
        );
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.field, "readings[1]");
        assert_eq!(err.check, CheckKind::User);

        let short = Value::object("SensorData", [("readings", Value::Array(vec![Value::Int(1)]))]);
        let err = validate(&short, &layout).unwrap_err();
        assert_eq!(err.field, "readings");
        assert_eq!(err.rule, "value is an array of 3 elements");
    }

    #[test]
    fn missing_undeclared_and_misnamed() {
        let layout = header();

        let mut value = header_value(1, 2, 3);
        value.remove("length");
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.field, "length");
        assert!(err.is_mandatory());

        let mut value = header_value(1, 2, 3);
        value.set("zeta", Value::Int(0));
        value.set("extra", Value::Int(0));
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.field, "extra");
        assert_eq!(err.rule, "field is declared in Header");

        let value = Value::object("Other", [("version", Value::Int(1))]);
        let err = validate(&value, &layout).unwrap_err();
        assert_eq!(err.field, ROOT_PATH);
        assert!(err.is_mandatory());
    }
}
