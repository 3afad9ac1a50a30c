//! Type registry: maps type names to primitive constructors and composite kinds.
//!
//! A registry is a plain value handed to whatever builds schemas. Registering
//! types returns a new registry; there is no process-wide state.

use crate::schema::{Schema, SchemaError, SchemaRef};
use crate::types::{
    ArrayType, AttributeType, BooleanType, FloatType, IntegerType, ObjectType, StringType, TypedValue,
    ValueType,
};
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Builds a primitive type from declaration options.
pub type PrimitiveCtor = Arc<dyn Fn(&TypeOptions) -> Result<Arc<dyn TypedValue>, SchemaError> + Send + Sync>;

/// Options attached to an attribute declaration.
#[derive(Debug, Clone, Default)]
pub struct TypeOptions {
    /// Nested schema for `object` / `array`.
    pub value_class: Option<SchemaRef>,
    /// Primitive item type name for `array`.
    pub value_type: Option<String>,
    /// Free-form options forwarded to primitive constructors.
    pub options: IndexMap<String, Value>,
}

impl TypeOptions {
    pub fn schema(schema: &Arc<Schema>) -> Self {
        TypeOptions::schema_ref(schema)
    }

    /// Nested schema that may be resolved later (recursive schemas).
    pub fn schema_ref(schema: impl Into<SchemaRef>) -> Self {
        TypeOptions {
            value_class: Some(schema.into()),
            ..TypeOptions::default()
        }
    }

    pub fn item_type(name: &str) -> Self {
        TypeOptions {
            value_type: Some(name.to_string()),
            ..TypeOptions::default()
        }
    }

    fn has_type_argument(&self) -> bool {
        self.value_class.is_some() || self.value_type.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Primitive,
    Object,
    Array,
}

#[derive(Clone)]
enum TypeEntry {
    Primitive(PrimitiveCtor),
    Object,
    Array,
}

impl TypeEntry {
    fn kind(&self) -> TypeKind {
        match self {
            TypeEntry::Primitive(_) => TypeKind::Primitive,
            TypeEntry::Object => TypeKind::Object,
            TypeEntry::Array => TypeKind::Array,
        }
    }
}

#[derive(Clone, Default)]
pub struct TypeRegistry {
    entries: IndexMap<String, TypeEntry>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (k, v.kind())))
            .finish()
    }
}

fn fixed<T: TypedValue + Default + 'static>() -> PrimitiveCtor {
    Arc::new(|_: &TypeOptions| Ok(Arc::new(T::default()) as Arc<dyn TypedValue>))
}

impl TypeRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// The built-in primitives without composite types.
    pub fn with_primitives() -> Self {
        let mut r = TypeRegistry::new();
        r.entries.insert("string".to_string(), TypeEntry::Primitive(fixed::<StringType>()));
        r.entries.insert("integer".to_string(), TypeEntry::Primitive(fixed::<IntegerType>()));
        r.entries.insert("float".to_string(), TypeEntry::Primitive(fixed::<FloatType>()));
        r.entries.insert("boolean".to_string(), TypeEntry::Primitive(fixed::<BooleanType>()));
        r.entries.insert("value".to_string(), TypeEntry::Primitive(fixed::<ValueType>()));
        r
    }

    /// Built-in primitives plus `object` and `array`.
    pub fn standard() -> Self {
        TypeRegistry::with_primitives().register_composites_as("object", "array")
    }

    /// Register (or replace) a primitive type constructor.
    pub fn register<F>(mut self, name: &str, ctor: F) -> Self
    where
        F: Fn(&TypeOptions) -> Result<Arc<dyn TypedValue>, SchemaError> + Send + Sync + 'static,
    {
        self.entries.insert(name.to_string(), TypeEntry::Primitive(Arc::new(ctor)));
        self
    }

    /// Register the composite types under caller-chosen names. Idempotent.
    pub fn register_composites_as(mut self, object_name: &str, array_name: &str) -> Self {
        self.entries.insert(object_name.to_string(), TypeEntry::Object);
        self.entries.insert(array_name.to_string(), TypeEntry::Array);
        self
    }

    pub fn kind(&self, name: &str) -> Option<TypeKind> {
        self.entries.get(name).map(TypeEntry::kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a declared type name into an attribute type.
    pub fn lookup(&self, name: &str, options: &TypeOptions) -> Result<AttributeType, SchemaError> {
        match self.entries.get(name) {
            Some(TypeEntry::Primitive(ctor)) => {
                if options.has_type_argument() {
                    return Err(SchemaError::InvalidConfiguration(format!(
                        "{} takes no schema or item type",
                        name
                    )));
                }
                Ok(AttributeType::Primitive(ctor(options)?))
            }
            Some(TypeEntry::Object) => Ok(AttributeType::Object(ObjectType::from_options(options)?)),
            Some(TypeEntry::Array) => Ok(AttributeType::Array(ArrayType::from_options(options, self)?)),
            None => Err(SchemaError::UnknownType(name.to_string())),
        }
    }

    /// Resolve a primitive type name (used for array items).
    pub fn primitive(&self, name: &str, options: &TypeOptions) -> Result<Arc<dyn TypedValue>, SchemaError> {
        match self.entries.get(name) {
            Some(TypeEntry::Primitive(ctor)) => ctor(options),
            Some(_) => Err(SchemaError::InvalidConfiguration(format!(
                "{} is not a primitive type",
                name
            ))),
            None => Err(SchemaError::UnknownType(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_kinds() {
        let r = TypeRegistry::standard();
        assert_eq!(r.kind("string"), Some(TypeKind::Primitive));
        assert_eq!(r.kind("object"), Some(TypeKind::Object));
        assert_eq!(r.kind("array"), Some(TypeKind::Array));
        assert_eq!(r.kind("date"), None);
    }

    #[test]
    fn aliases_add_names() {
        let r = TypeRegistry::standard().register_composites_as("nested", "list");
        assert_eq!(r.kind("nested"), Some(TypeKind::Object));
        assert_eq!(r.kind("list"), Some(TypeKind::Array));
        assert_eq!(r.kind("object"), Some(TypeKind::Object));
    }

    #[test]
    fn lookup_errors() {
        let r = TypeRegistry::standard();
        assert!(matches!(
            r.lookup("date", &TypeOptions::default()),
            Err(SchemaError::UnknownType(ref n)) if n == "date"
        ));
        assert!(matches!(
            r.lookup("string", &TypeOptions::item_type("integer")),
            Err(SchemaError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            r.lookup("object", &TypeOptions::default()),
            Err(SchemaError::InvalidSchema(_))
        ));
        assert!(matches!(
            r.primitive("array", &TypeOptions::default()),
            Err(SchemaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn custom_primitive() {
        let r = TypeRegistry::new().register("text", |_| Ok(Arc::new(StringType) as Arc<dyn TypedValue>));
        let t = r.lookup("text", &TypeOptions::default()).unwrap();
        assert_eq!(t.type_tag(), "string");
        assert!(!t.is_structured());
    }
}
