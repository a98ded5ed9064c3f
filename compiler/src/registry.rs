//! The process-wide table of compiled layouts.
//!
//! Schemas that embed other schemas by name are resolved against this table
//! when they are compiled. [`SchemaCell`] is the usual way in: a `static`
//! that compiles its schema the first time it is used and installs the result
//! here.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use lazy_static::lazy_static;
use safepack_schema::ByteOrder;
use tracing::{debug, trace};

use crate::{
    compiler::compile_schema,
    error::SchemaError,
    layout::CompiledLayout,
    types::{FieldDescriptor, SchemaDefinition},
};

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, Arc<CompiledLayout>>> = RwLock::new(HashMap::new());
}

thread_local! {
    /// Cells this thread is compiling right now, innermost last.
    static COMPILING: RefCell<Vec<&'static str>> = const { RefCell::new(Vec::new()) };
}

/// Installs `layout` under its name.
///
/// Registering a layout of the same shape again is a no-op and returns the
/// layout already installed. A different layout under a taken name fails.
pub fn register(layout: Arc<CompiledLayout>) -> Result<Arc<CompiledLayout>, SchemaError> {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());

    if let Some(existing) = registry.get(layout.name()) {
        if existing.same_shape(&layout) {
            trace!(schema = layout.name(), "schema already registered");
            return Ok(existing.clone());
        }
        return Err(SchemaError::new(
            layout.name(),
            format!(
                "a different schema is already registered under this name (registered {}, new {})",
                existing.format_token(),
                layout.format_token()
            ),
        ));
    }

    debug!(
        schema = layout.name(),
        format = layout.format_token(),
        "registered schema"
    );
    registry.insert(layout.name().to_owned(), layout.clone());
    Ok(layout)
}

pub fn lookup(name: &str) -> Option<Arc<CompiledLayout>> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.get(name).cloned()
}

/// Names of every registered schema, sorted.
pub fn registered_names() -> Vec<String> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    let mut names: Vec<String> = registry.keys().cloned().collect();
    names.sort();
    names
}

/// A schema compiled on first use.
///
/// ```
/// use safepack_compiler::{FieldDescriptor, SchemaCell};
/// use safepack_schema::ByteOrder;
///
/// static HEADER: SchemaCell = SchemaCell::new("DocHeader", ByteOrder::Network, || {
///     vec![
///         FieldDescriptor::uint8("version"),
///         FieldDescriptor::uint16("length"),
///         FieldDescriptor::int8("status"),
///     ]
/// });
///
/// let layout = HEADER.get().unwrap();
/// assert_eq!(layout.format_token(), "!BHb");
/// ```
pub struct SchemaCell {
    name: &'static str,
    order: ByteOrder,
    define: fn() -> Vec<FieldDescriptor>,
    compiled: OnceLock<Result<Arc<CompiledLayout>, SchemaError>>,
}

impl SchemaCell {
    pub const fn new(
        name: &'static str,
        order: ByteOrder,
        define: fn() -> Vec<FieldDescriptor>,
    ) -> SchemaCell {
        SchemaCell {
            name,
            order,
            define,
            compiled: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The compiled layout. Concurrent first calls wait for a single
    /// compilation; a failure is kept and returned on every call.
    ///
    /// Cells embedded with [`FieldDescriptor::nested_cell`] are compiled
    /// first, so cells can be used in any order.
    pub fn get(&self) -> Result<Arc<CompiledLayout>, SchemaError> {
        self.compiled
            .get_or_init(|| {
                COMPILING.with(|names| names.borrow_mut().push(self.name));
                let definition = SchemaDefinition::new(self.name, self.order).fields((self.define)());
                let compiled = compile_schema(&definition).and_then(register);
                COMPILING.with(|names| names.borrow_mut().pop());
                compiled
            })
            .clone()
    }

    /// Whether this thread is inside this cell's first compilation.
    pub(crate) fn is_compiling(&self) -> bool {
        COMPILING.with(|names| names.borrow().contains(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rule;
    use safepack_schema::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    static DEFINE_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counted_fields() -> Vec<FieldDescriptor> {
        DEFINE_CALLS.fetch_add(1, Ordering::SeqCst);
        vec![FieldDescriptor::boolean("flag"), FieldDescriptor::uint32("id")]
    }

    static COUNTED: SchemaCell = SchemaCell::new("RegistryCounted", ByteOrder::Little, counted_fields);

    #[test]
    fn cell_compiles_once_across_threads() {
        let layouts: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| COUNTED.get().unwrap()))
            .collect::<Vec<_>>()
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(DEFINE_CALLS.load(Ordering::SeqCst), 1);
        for layout in &layouts {
            assert!(Arc::ptr_eq(layout, &layouts[0]));
        }
        assert_eq!(layouts[0].format_token(), "<?I");
        assert!(Arc::ptr_eq(&lookup("RegistryCounted").unwrap(), &layouts[0]));
        assert!(registered_names().contains(&"RegistryCounted".to_owned()));
    }

    static BROKEN: SchemaCell = SchemaCell::new("RegistryBroken", ByteOrder::Big, Vec::new);

    #[test]
    fn cell_keeps_compile_failure() {
        let first = BROKEN.get().unwrap_err();
        let second = BROKEN.get().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first.schema, "RegistryBroken");
        assert!(lookup("RegistryBroken").is_none());
    }

    static ENVELOPE: SchemaCell = SchemaCell::new("RegistryEnvelope", ByteOrder::Big, || {
        vec![
            FieldDescriptor::nested_cell("header", &ENVELOPE_HEADER),
            FieldDescriptor::uint32("payload_id"),
        ]
    });

    static ENVELOPE_HEADER: SchemaCell = SchemaCell::new("RegistryEnvelopeHeader", ByteOrder::Big, || {
        vec![FieldDescriptor::uint8("version"), FieldDescriptor::uint16("length")]
    });

    #[test]
    fn outer_cell_compiles_its_dependency_first() {
        assert!(lookup("RegistryEnvelopeHeader").is_none());
        let envelope = ENVELOPE.get().unwrap();
        assert_eq!(envelope.format_token(), ">BHI");
        assert_eq!(envelope.total_size(), 7);

        let header = lookup("RegistryEnvelopeHeader").unwrap();
        assert!(Arc::ptr_eq(&header, &ENVELOPE_HEADER.get().unwrap()));
        assert!(Arc::ptr_eq(envelope.field("header").unwrap().nested.as_ref().unwrap(), &header));
    }

    static BROKEN_OUTER: SchemaCell = SchemaCell::new("RegistryBrokenOuter", ByteOrder::Big, || {
        vec![FieldDescriptor::nested_cell("inner", &BROKEN), FieldDescriptor::uint8("x")]
    });

    #[test]
    fn dependency_failures_reach_the_outer_cell() {
        let err = BROKEN_OUTER.get().unwrap_err();
        assert_eq!(err.schema, "RegistryBrokenOuter");
        assert_eq!(err.field.as_deref(), Some("inner"));
        assert!(err.reason.contains("\"RegistryBroken\""));
        assert!(err.reason.contains("at least one field"));
    }

    static LOOPED: SchemaCell = SchemaCell::new("RegistryLooped", ByteOrder::Big, || {
        vec![FieldDescriptor::uint8("x"), FieldDescriptor::nested_cell("again", &LOOPED)]
    });

    #[test]
    fn self_embedding_cell_fails() {
        let err = LOOPED.get().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("again"));
        assert!(err.reason.contains("contains itself"));
    }

    fn define(name: &str, fields: Vec<FieldDescriptor>) -> Arc<CompiledLayout> {
        let definition = SchemaDefinition::new(name, ByteOrder::Big).fields(fields);
        compile_schema(&definition).unwrap()
    }

    #[test]
    fn reregistering_same_shape_is_a_noop() {
        let first = register(define("RegistrySame", vec![FieldDescriptor::uint8("a")])).unwrap();
        let again = register(define("RegistrySame", vec![FieldDescriptor::uint8("a")])).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let err = register(define("RegistrySame", vec![FieldDescriptor::uint16("a")])).unwrap_err();
        assert_eq!(err.schema, "RegistrySame");
        assert!(Arc::ptr_eq(&lookup("RegistrySame").unwrap(), &first));
    }

    #[test]
    fn same_wire_format_with_other_checks_conflicts() {
        let first = register(define("RegistryChecked", vec![FieldDescriptor::uint8("a")])).unwrap();
        let checked = define(
            "RegistryChecked",
            vec![FieldDescriptor::uint8("a").check(Rule::AtMost(Value::Int(5)))],
        );
        assert_eq!(checked.format_token(), first.format_token());
        let err = register(checked).unwrap_err();
        assert_eq!(err.schema, "RegistryChecked");
        assert!(Arc::ptr_eq(&lookup("RegistryChecked").unwrap(), &first));
    }

    #[test]
    fn named_references_resolve_through_registry() {
        register(define("RegistryInner", vec![FieldDescriptor::uint16("x")])).unwrap();
        let outer = define(
            "RegistryOuter",
            vec![
                FieldDescriptor::nested_named("inner", "RegistryInner"),
                FieldDescriptor::uint8("y"),
            ],
        );
        assert_eq!(outer.format_token(), ">HB");
        assert_eq!(outer.flat_fields()[0].path, "inner.x");
    }
}
