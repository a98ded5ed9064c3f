use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use safepack_schema::{ByteOrder, Scalar, Value};

use crate::error::CheckKind;
use crate::layout::CompiledLayout;
use crate::registry::SchemaCell;

/// A reference from one schema to another one embedded in it.
#[derive(Clone)]
pub enum SchemaRef {
    /// A layout the caller already holds.
    Compiled(Arc<CompiledLayout>),
    /// A schema looked up by name when the outer schema is compiled.
    Named(String),
    /// A cell compiled on demand when the outer schema is compiled.
    Cell(&'static SchemaCell),
}

impl SchemaRef {
    pub fn name(&self) -> &str {
        match self {
            SchemaRef::Compiled(layout) => layout.name(),
            SchemaRef::Named(name) => name,
            SchemaRef::Cell(cell) => cell.name(),
        }
    }
}

impl fmt::Debug for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRef::Compiled(layout) => write!(f, "Compiled({})", layout.name()),
            SchemaRef::Named(name) => write!(f, "Named({})", name),
            SchemaRef::Cell(cell) => write!(f, "Cell({})", cell.name()),
        }
    }
}

/// The binary representation of one field.
#[derive(Debug, Clone)]
pub enum WireKind {
    Scalar(Scalar),
    /// Fixed-length raw bytes.
    Bytes(usize),
    /// Fixed-length UTF-8 text, NUL padded on the wire.
    Text(usize),
    Schema(SchemaRef),
    Array {
        element: Box<FieldDescriptor>,
        count: usize,
    },
}

impl WireKind {
    /// Human readable name, e.g. `uint32[4]` or `text[16]`.
    pub fn describe(&self) -> String {
        match self {
            WireKind::Scalar(scalar) => scalar.name().to_owned(),
            WireKind::Bytes(len) => format!("bytes[{}]", len),
            WireKind::Text(len) => format!("text[{}]", len),
            WireKind::Schema(schema) => schema.name().to_owned(),
            WireKind::Array { element, count } => {
                format!("{}[{}]", element.kind.describe(), count)
            }
        }
    }
}

/// The host-side type a field is declared with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Bool,
    Integer,
    Float,
    Bytes,
    Text,
    Record,
    List(Box<HostType>),
}

impl HostType {
    /// The host type a wire kind maps to when none is declared.
    pub fn natural(kind: &WireKind) -> HostType {
        match kind {
            WireKind::Scalar(Scalar::Bool) => HostType::Bool,
            WireKind::Scalar(s) if s.is_float() => HostType::Float,
            WireKind::Scalar(_) => HostType::Integer,
            WireKind::Bytes(_) => HostType::Bytes,
            WireKind::Text(_) => HostType::Text,
            WireKind::Schema(_) => HostType::Record,
            WireKind::Array { element, .. } => HostType::List(Box::new(element.host.clone())),
        }
    }

    pub fn is_compatible_with(&self, kind: &WireKind) -> bool {
        match (kind, self) {
            (WireKind::Scalar(Scalar::Bool), HostType::Bool) => true,
            (WireKind::Scalar(s), HostType::Float) => s.is_float(),
            (WireKind::Scalar(s), HostType::Integer) => s.is_integer(),
            (WireKind::Bytes(_), HostType::Bytes) => true,
            (WireKind::Text(_), HostType::Text) => true,
            (WireKind::Schema(_), HostType::Record) => true,
            (WireKind::Array { element, .. }, HostType::List(inner)) => {
                **inner == element.host && inner.is_compatible_with(&element.kind)
            }
            _ => false,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Bool => f.write_str("bool"),
            HostType::Integer => f.write_str("integer"),
            HostType::Float => f.write_str("float"),
            HostType::Bytes => f.write_str("bytes"),
            HostType::Text => f.write_str("text"),
            HostType::Record => f.write_str("record"),
            HostType::List(inner) => write!(f, "list of {}", inner),
        }
    }
}

/// A named user predicate. The description is what error messages show.
#[derive(Clone)]
pub struct Predicate {
    description: String,
    check: Arc<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl Predicate {
    pub fn new<F>(description: &str, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Predicate {
            description: description.to_owned(),
            check: Arc::new(check),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn test(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Predicate({:?})", self.description)
    }
}

/// One check in a validator chain.
///
/// The first group is derived from the wire kind by the compiler; the second
/// group is what schema authors attach to fields.
#[derive(Debug, Clone)]
pub enum Rule {
    IntRange { scalar: Scalar, min: i128, max: i128 },
    IsBool,
    FloatFits(Scalar),
    ByteLength(usize),
    TextFits(usize),
    RecordOf(String),
    ArrayOf(usize),

    AtLeast(Value),
    AtMost(Value),
    Between(Value, Value),
    OneOf(Vec<Value>),
    Equals(Value),
    NotEqual(Value),
    Custom(Predicate),
}

/// Numeric ordering across the `Int` and `Float` variants.
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        _ => None,
    }
}

/// Equality that treats `Int(1)` and `Float(1.0)` as the same number.
fn same_value(a: &Value, b: &Value) -> bool {
    match compare_numbers(a, b) {
        Some(ordering) => ordering == Ordering::Equal,
        None => a == b,
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

impl Rule {
    /// The mandatory rule for a wire kind. `Schema` kinds are named after the
    /// layout they resolve to.
    pub fn mandatory_for(kind: &WireKind) -> Rule {
        match kind {
            WireKind::Scalar(Scalar::Bool) => Rule::IsBool,
            WireKind::Scalar(s @ (Scalar::F32 | Scalar::F64)) => Rule::FloatFits(*s),
            WireKind::Scalar(Scalar::U8) => Rule::int_range(Scalar::U8, 0, u8::MAX as i128),
            WireKind::Scalar(Scalar::U16) => Rule::int_range(Scalar::U16, 0, u16::MAX as i128),
            WireKind::Scalar(Scalar::U32) => Rule::int_range(Scalar::U32, 0, u32::MAX as i128),
            WireKind::Scalar(Scalar::U64) => Rule::int_range(Scalar::U64, 0, u64::MAX as i128),
            WireKind::Scalar(Scalar::I8) => {
                Rule::int_range(Scalar::I8, i8::MIN as i128, i8::MAX as i128)
            }
            WireKind::Scalar(Scalar::I16) => {
                Rule::int_range(Scalar::I16, i16::MIN as i128, i16::MAX as i128)
            }
            WireKind::Scalar(Scalar::I32) => {
                Rule::int_range(Scalar::I32, i32::MIN as i128, i32::MAX as i128)
            }
            WireKind::Scalar(Scalar::I64) => {
                Rule::int_range(Scalar::I64, i64::MIN as i128, i64::MAX as i128)
            }
            WireKind::Bytes(len) => Rule::ByteLength(*len),
            WireKind::Text(len) => Rule::TextFits(*len),
            WireKind::Schema(schema) => Rule::RecordOf(schema.name().to_owned()),
            WireKind::Array { count, .. } => Rule::ArrayOf(*count),
        }
    }

    fn int_range(scalar: Scalar, min: i128, max: i128) -> Rule {
        Rule::IntRange { scalar, min, max }
    }

    pub fn check(&self, value: &Value) -> bool {
        match self {
            Rule::IntRange { min, max, .. } => {
                matches!(value, Value::Int(v) if min <= v && v <= max)
            }
            Rule::IsBool => matches!(value, Value::Bool(_)),
            Rule::FloatFits(Scalar::F32) => match value {
                // decode must give back the same value, so no rounding
                Value::Float(v) => v.is_nan() || (*v as f32) as f64 == *v,
                _ => false,
            },
            Rule::FloatFits(_) => matches!(value, Value::Float(_)),
            Rule::ByteLength(len) => matches!(value, Value::Bytes(b) if b.len() == *len),
            Rule::TextFits(len) => {
                matches!(value, Value::Text(s) if s.len() <= *len && !s.contains('\0'))
            }
            Rule::RecordOf(name) => value.object_name() == Some(name.as_str()),
            Rule::ArrayOf(count) => matches!(value, Value::Array(v) if v.len() == *count),

            Rule::AtLeast(bound) => matches!(
                compare_numbers(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Rule::AtMost(bound) => matches!(
                compare_numbers(value, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Rule::Between(low, high) => {
                Rule::AtLeast(low.clone()).check(value) && Rule::AtMost(high.clone()).check(value)
            }
            Rule::OneOf(options) => options.iter().any(|option| same_value(value, option)),
            Rule::Equals(expected) => same_value(value, expected),
            Rule::NotEqual(unexpected) => !same_value(value, unexpected),
            Rule::Custom(predicate) => predicate.test(value),
        }
    }

    /// Whether a user rule can say anything about values of `kind`.
    pub fn applies_to(&self, kind: &WireKind) -> bool {
        let numeric = matches!(kind, WireKind::Scalar(s) if s.is_integer() || s.is_float());
        match self {
            Rule::AtLeast(bound) | Rule::AtMost(bound) => numeric && is_number(bound),
            Rule::Between(low, high) => numeric && is_number(low) && is_number(high),
            _ => true,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::IntRange { scalar, min, max } => {
                write!(f, "{} <= value <= {} ({})", min, max, scalar)
            }
            Rule::IsBool => f.write_str("value is a bool"),
            Rule::FloatFits(scalar) => write!(f, "value is a float exactly representable as {}", scalar),
            Rule::ByteLength(len) => write!(f, "value is exactly {} bytes", len),
            Rule::TextFits(len) => {
                write!(f, "value is text of at most {} UTF-8 bytes without NUL", len)
            }
            Rule::RecordOf(name) => write!(f, "value is a {} record", name),
            Rule::ArrayOf(count) => write!(f, "value is an array of {} elements", count),
            Rule::AtLeast(bound) => write!(f, "value >= {:?}", bound),
            Rule::AtMost(bound) => write!(f, "value <= {:?}", bound),
            Rule::Between(low, high) => write!(f, "{:?} <= value <= {:?}", low, high),
            Rule::OneOf(options) => write!(f, "value in {:?}", options),
            Rule::Equals(expected) => write!(f, "value == {:?}", expected),
            Rule::NotEqual(unexpected) => write!(f, "value != {:?}", unexpected),
            Rule::Custom(predicate) => f.write_str(predicate.description()),
        }
    }
}

/// A rule together with where it came from.
#[derive(Debug, Clone)]
pub struct Validator {
    pub kind: CheckKind,
    pub rule: Rule,
}

impl Validator {
    pub fn mandatory(rule: Rule) -> Self {
        Validator { kind: CheckKind::Mandatory, rule }
    }

    pub fn user(rule: Rule) -> Self {
        Validator { kind: CheckKind::User, rule }
    }
}

/// One field of a schema as declared by its author.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: WireKind,
    pub host: HostType,
    pub checks: Vec<Rule>,
}

impl FieldDescriptor {
    /// A field with the natural host type of `kind` and no user checks.
    pub fn new(name: &str, kind: WireKind) -> Self {
        let host = HostType::natural(&kind);
        FieldDescriptor {
            name: name.to_owned(),
            kind,
            host,
            checks: Vec::new(),
        }
    }

    pub fn scalar(name: &str, scalar: Scalar) -> Self {
        FieldDescriptor::new(name, WireKind::Scalar(scalar))
    }

    pub fn uint8(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::U8)
    }

    pub fn uint16(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::U16)
    }

    pub fn uint32(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::U32)
    }

    pub fn uint64(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::U64)
    }

    pub fn int8(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::I8)
    }

    pub fn int16(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::I16)
    }

    pub fn int32(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::I32)
    }

    pub fn int64(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::I64)
    }

    pub fn boolean(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::Bool)
    }

    pub fn float32(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::F32)
    }

    pub fn float64(name: &str) -> Self {
        FieldDescriptor::scalar(name, Scalar::F64)
    }

    pub fn bytes(name: &str, len: usize) -> Self {
        FieldDescriptor::new(name, WireKind::Bytes(len))
    }

    pub fn text(name: &str, len: usize) -> Self {
        FieldDescriptor::new(name, WireKind::Text(len))
    }

    /// Embeds an already compiled schema.
    pub fn nested(name: &str, layout: &Arc<CompiledLayout>) -> Self {
        FieldDescriptor::new(name, WireKind::Schema(SchemaRef::Compiled(layout.clone())))
    }

    /// Embeds a schema that is resolved by name at compile time.
    pub fn nested_named(name: &str, schema: &str) -> Self {
        FieldDescriptor::new(name, WireKind::Schema(SchemaRef::Named(schema.to_owned())))
    }

    /// Embeds the schema of `cell`, compiling it first if needed.
    pub fn nested_cell(name: &str, cell: &'static SchemaCell) -> Self {
        FieldDescriptor::new(name, WireKind::Schema(SchemaRef::Cell(cell)))
    }

    /// `count` elements described by `element`. The element's name is not
    /// used; its kind, host type and checks are.
    pub fn array(name: &str, element: FieldDescriptor, count: usize) -> Self {
        FieldDescriptor::new(
            name,
            WireKind::Array {
                element: Box::new(element),
                count,
            },
        )
    }

    /// An unnamed descriptor for use as an array element.
    pub fn element(kind: WireKind) -> Self {
        FieldDescriptor::new("item", kind)
    }

    pub fn with_host(mut self, host: HostType) -> Self {
        self.host = host;
        self
    }

    /// Appends a user check. Checks run in the order they are added.
    pub fn check(mut self, rule: Rule) -> Self {
        self.checks.push(rule);
        self
    }

    pub fn check_with<F>(self, description: &str, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.check(Rule::Custom(Predicate::new(description, check)))
    }
}

/// The input of the schema compiler: a name, a byte order and the ordered
/// field descriptors.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    pub name: String,
    pub order: ByteOrder,
    pub fields: Vec<FieldDescriptor>,
}

impl SchemaDefinition {
    pub fn new(name: &str, order: ByteOrder) -> Self {
        SchemaDefinition {
            name: name.to_owned(),
            order,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields<I: IntoIterator<Item = FieldDescriptor>>(mut self, fields: I) -> Self {
        self.fields.extend(fields);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_hosts_are_compatible() {
        let kinds = [
            WireKind::Scalar(Scalar::Bool),
            WireKind::Scalar(Scalar::I32),
            WireKind::Scalar(Scalar::F64),
            WireKind::Bytes(4),
            WireKind::Text(0),
            WireKind::Array {
                element: Box::new(FieldDescriptor::uint32("item")),
                count: 4,
            },
        ];
        for kind in &kinds {
            assert!(HostType::natural(kind).is_compatible_with(kind), "{}", kind.describe());
        }
    }

    #[test]
    fn mismatched_hosts_are_rejected() {
        let bool_kind = WireKind::Scalar(Scalar::Bool);
        assert!(!HostType::Integer.is_compatible_with(&bool_kind));
        assert!(!HostType::Bool.is_compatible_with(&WireKind::Scalar(Scalar::U8)));
        assert!(!HostType::Integer.is_compatible_with(&WireKind::Scalar(Scalar::F32)));
        assert!(!HostType::Text.is_compatible_with(&WireKind::Bytes(3)));
        let array = WireKind::Array {
            element: Box::new(FieldDescriptor::boolean("item")),
            count: 2,
        };
        assert!(!HostType::List(Box::new(HostType::Integer)).is_compatible_with(&array));
    }

    #[test]
    fn mandatory_rules() {
        let rule = Rule::mandatory_for(&WireKind::Scalar(Scalar::U8));
        assert!(rule.check(&Value::Int(255)));
        assert!(!rule.check(&Value::Int(300)));
        assert!(!rule.check(&Value::Int(-1)));
        assert!(!rule.check(&Value::Bool(true)));
        assert_eq!(rule.to_string(), "0 <= value <= 255 (uint8)");

        let rule = Rule::mandatory_for(&WireKind::Scalar(Scalar::Bool));
        assert!(rule.check(&Value::Bool(false)));
        assert!(!rule.check(&Value::Int(1)));

        let rule = Rule::mandatory_for(&WireKind::Scalar(Scalar::F32));
        assert!(rule.check(&Value::Float(25.5)));
        assert!(rule.check(&Value::Float(f64::NAN)));
        assert!(!rule.check(&Value::Float(1.0e300)));
        assert!(rule.check(&Value::Float(f64::NEG_INFINITY)));
        assert!(!rule.check(&Value::Text("25.5".into())));
        assert!(!rule.check(&Value::Float(0.1)));
        assert!(rule.check(&Value::Float(0.1f32 as f64)));
        assert_eq!(rule.to_string(), "value is a float exactly representable as float32");
        assert!(Rule::mandatory_for(&WireKind::Scalar(Scalar::F64)).check(&Value::Float(0.1)));

        let rule = Rule::mandatory_for(&WireKind::Scalar(Scalar::I64));
        assert!(rule.check(&Value::Int(i64::MIN as i128)));
        assert!(!rule.check(&Value::Int(i64::MAX as i128 + 1)));
        assert_eq!(
            Rule::mandatory_for(&WireKind::Scalar(Scalar::U64)).to_string(),
            format!("0 <= value <= {} (uint64)", u64::MAX)
        );

        let rule = Rule::mandatory_for(&WireKind::Text(5));
        assert!(rule.check(&Value::from("Alice")));
        assert!(!rule.check(&Value::from("Alice!")));
        assert!(!rule.check(&Value::from("a\0b")));

        let rule = Rule::mandatory_for(&WireKind::Bytes(0));
        assert!(rule.check(&Value::Bytes(vec![])));
        assert!(!rule.check(&Value::Bytes(vec![0])));
    }

    #[test]
    fn user_rules() {
        assert!(Rule::AtLeast(Value::Int(-1)).check(&Value::Int(-1)));
        assert!(!Rule::AtLeast(Value::Int(-1)).check(&Value::Int(-5)));
        assert!(Rule::Between(Value::Int(0xEF00), Value::Int(0xFFFF)).check(&Value::Int(0xF001)));
        assert!(!Rule::Between(Value::Int(0xEF00), Value::Int(0xFFFF)).check(&Value::Int(1)));
        assert!(Rule::AtMost(Value::Float(1.5)).check(&Value::Int(1)));
        assert!(Rule::Equals(Value::Bytes(vec![0])).check(&Value::Bytes(vec![0])));
        assert!(Rule::OneOf(vec![Value::Int(1), Value::Int(2)]).check(&Value::Int(2)));
        assert!(!Rule::NotEqual(Value::Int(0)).check(&Value::Int(0)));
        assert!(Rule::Equals(Value::Int(1)).check(&Value::Float(1.0)));
        assert!(!Rule::NotEqual(Value::Int(0)).check(&Value::Float(0.0)));
        assert!(Rule::OneOf(vec![Value::Int(1), Value::Int(2)]).check(&Value::Float(2.0)));
        assert!(!Rule::Equals(Value::Int(1)).check(&Value::from("1")));

        let even = Predicate::new("value is even", |v| v.as_int() % 2 == 0);
        assert!(Rule::Custom(even.clone()).check(&Value::Int(4)));
        assert_eq!(Rule::Custom(even).to_string(), "value is even");
    }

    #[test]
    fn numeric_rules_only_apply_to_numbers() {
        let at_least = Rule::AtLeast(Value::Int(0));
        assert!(at_least.applies_to(&WireKind::Scalar(Scalar::I16)));
        assert!(at_least.applies_to(&WireKind::Scalar(Scalar::F64)));
        assert!(!at_least.applies_to(&WireKind::Bytes(2)));
        assert!(!at_least.applies_to(&WireKind::Scalar(Scalar::Bool)));
        assert!(!Rule::AtMost(Value::from("x")).applies_to(&WireKind::Scalar(Scalar::U8)));
        assert!(Rule::Equals(Value::Bytes(vec![0])).applies_to(&WireKind::Bytes(1)));
    }

    #[test]
    fn describe_kinds() {
        let readings = FieldDescriptor::array("readings", FieldDescriptor::uint32("item"), 4);
        assert_eq!(readings.kind.describe(), "uint32[4]");
        assert_eq!(readings.host, HostType::List(Box::new(HostType::Integer)));
        assert_eq!(FieldDescriptor::text("name", 16).kind.describe(), "text[16]");
        assert_eq!(FieldDescriptor::nested_named("header", "Header").kind.describe(), "Header");
    }
}
