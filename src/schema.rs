//! Schema definitions: ordered, immutable attribute declarations.

use crate::errors::Errors;
use crate::params::Params;
use crate::registry::{TypeOptions, TypeRegistry};
use crate::rules::Rule;
use crate::types::AttributeType;
use crate::value::{Key, Value};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Definition-time failures. These indicate programming errors, not bad input.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Duplicate attribute '{attribute}' in {schema}")]
    DuplicateAttribute { schema: String, attribute: String },
    #[error("Duplicate schema: {0}")]
    DuplicateSchema(String),
    #[error("Unknown attribute '{attribute}' in {schema}")]
    UnknownAttribute { schema: String, attribute: String },
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// Prefix the message with a location such as `User.address`.
    pub fn within(self, location: &str) -> Self {
        match self {
            SchemaError::InvalidConfiguration(m) => SchemaError::InvalidConfiguration(format!("{}: {}", location, m)),
            SchemaError::InvalidSchema(m) => SchemaError::InvalidSchema(format!("{}: {}", location, m)),
            SchemaError::InvalidRule(m) => SchemaError::InvalidRule(format!("{}: {}", location, m)),
            other => other,
        }
    }
}

/// Schema-level validator run after the attribute rules.
pub type Validator = Arc<dyn Fn(&Params, Option<&str>, &mut Errors) + Send + Sync>;

/// A schema declared before it is built, so that schemas can refer to
/// themselves or to each other. Clones share the same cell.
#[derive(Clone)]
pub struct SchemaSlot {
    name: Arc<str>,
    cell: Arc<OnceLock<Arc<Schema>>>,
}

impl SchemaSlot {
    pub fn new(name: &str) -> Self {
        SchemaSlot {
            name: Arc::from(name),
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Option<&Arc<Schema>> {
        self.cell.get()
    }

    /// Fill the slot once with the schema it was declared for.
    pub fn fill(&self, schema: &Arc<Schema>) -> Result<(), SchemaError> {
        if schema.name() != self.name() {
            return Err(SchemaError::InvalidSchema(format!(
                "slot for '{}' cannot hold schema '{}'",
                self.name,
                schema.name()
            )));
        }
        self.cell
            .set(Arc::clone(schema))
            .map_err(|_| SchemaError::InvalidSchema(format!("schema '{}' is already filled", self.name)))
    }
}

impl fmt::Debug for SchemaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaSlot")
            .field("name", &self.name)
            .field("filled", &self.cell.get().is_some())
            .finish()
    }
}

impl PartialEq for SchemaSlot {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

impl Eq for SchemaSlot {}

/// Reference from a composite type to its nested schema.
#[derive(Debug, Clone)]
pub enum SchemaRef {
    Resolved(Arc<Schema>),
    /// Filled in after the referring schema is built.
    Deferred(SchemaSlot),
}

impl SchemaRef {
    pub fn name(&self) -> &str {
        match self {
            SchemaRef::Resolved(s) => s.name(),
            SchemaRef::Deferred(slot) => slot.name(),
        }
    }

    /// The schema, once available.
    pub fn get(&self) -> Option<&Arc<Schema>> {
        match self {
            SchemaRef::Resolved(s) => Some(s),
            SchemaRef::Deferred(slot) => slot.get(),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, SchemaRef::Deferred(_))
    }
}

impl From<Arc<Schema>> for SchemaRef {
    fn from(schema: Arc<Schema>) -> Self {
        SchemaRef::Resolved(schema)
    }
}

impl From<&Arc<Schema>> for SchemaRef {
    fn from(schema: &Arc<Schema>) -> Self {
        SchemaRef::Resolved(Arc::clone(schema))
    }
}

impl From<SchemaSlot> for SchemaRef {
    fn from(slot: SchemaSlot) -> Self {
        SchemaRef::Deferred(slot)
    }
}

/// One entry of an allow-list: a bare name or a name with nested fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permitted {
    Field(String),
    Nested(String, Vec<Permitted>),
    /// Nested fields of a recursive reference, expanded only when input
    /// reaches them.
    Deferred(String, SchemaSlot),
}

impl Permitted {
    pub fn name(&self) -> &str {
        match self {
            Permitted::Field(n) | Permitted::Nested(n, _) | Permitted::Deferred(n, _) => n,
        }
    }

    /// Nested fields one level down; `None` for a bare name.
    pub fn fields(&self) -> Option<Vec<Permitted>> {
        match self {
            Permitted::Field(_) => None,
            Permitted::Nested(_, fields) => Some(fields.clone()),
            Permitted::Deferred(_, slot) => Some(slot.get().map(|s| s.permitted_fields()).unwrap_or_default()),
        }
    }

    /// `"name"` or `{"name": [...]}`. A recursive reference renders as
    /// `{"name": "SchemaName"}`.
    pub fn to_value(&self) -> Value {
        let nested = match self {
            Permitted::Field(n) => return Value::String(n.clone()),
            Permitted::Nested(_, fields) => Value::List(fields.iter().map(Permitted::to_value).collect()),
            Permitted::Deferred(_, slot) => Value::String(slot.name().to_string()),
        };
        let mut m = IndexMap::new();
        m.insert(Key::String(self.name().to_string()), nested);
        Value::Map(m)
    }
}

impl Serialize for Permitted {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    ty: AttributeType,
    rules: Vec<Rule>,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &AttributeType {
        &self.ty
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_structured(&self) -> bool {
        self.ty.is_structured()
    }
}

pub struct Schema {
    name: String,
    attributes: IndexMap<String, Attribute>,
    validators: Vec<Validator>,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Schema {
    pub fn builder<'r>(name: &str, registry: &'r TypeRegistry) -> SchemaBuilder<'r> {
        SchemaBuilder::new(name, registry)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Allow-list for untrusted input: bare names for primitives, nested
    /// field lists for object and array attributes.
    pub fn permitted_fields(&self) -> Vec<Permitted> {
        self.attributes.values().map(|a| a.ty.permitted(&a.name)).collect()
    }

    /// Attributes holding nested entities.
    pub fn structured_attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|a| a.is_structured())
            .map(|a| a.name.as_str())
    }
}

/// Builds a [`Schema`] against a type registry. The first error is kept and
/// returned from [`SchemaBuilder::build`].
pub struct SchemaBuilder<'r> {
    name: String,
    registry: &'r TypeRegistry,
    attributes: IndexMap<String, Attribute>,
    rules: Vec<(String, Rule)>,
    validators: Vec<Validator>,
    own: Option<SchemaSlot>,
    error: Option<SchemaError>,
}

impl<'r> SchemaBuilder<'r> {
    pub fn new(name: &str, registry: &'r TypeRegistry) -> Self {
        SchemaBuilder {
            name: name.to_string(),
            registry,
            attributes: IndexMap::new(),
            rules: Vec::new(),
            validators: Vec::new(),
            own: None,
            error: None,
        }
    }

    fn fail(&mut self, e: SchemaError) {
        if self.error.is_none() {
            self.error = Some(e);
        }
    }

    /// Declare an attribute of a registered type.
    pub fn attribute(mut self, name: &str, type_name: &str, options: TypeOptions) -> Self {
        match self.registry.lookup(type_name, &options) {
            Ok(ty) => self.declare(name, ty),
            Err(e) => {
                let location = format!("{}.{}", self.name, name);
                self.fail(e.within(&location));
                self
            }
        }
    }

    /// Declare an attribute with an already-built type.
    pub fn attribute_type(self, name: &str, ty: AttributeType) -> Self {
        self.declare(name, ty)
    }

    fn declare(mut self, name: &str, ty: AttributeType) -> Self {
        if self.attributes.contains_key(name) {
            let e = SchemaError::DuplicateAttribute {
                schema: self.name.clone(),
                attribute: name.to_string(),
            };
            self.fail(e);
            return self;
        }
        self.attributes.insert(
            name.to_string(),
            Attribute {
                name: name.to_string(),
                ty,
                rules: Vec::new(),
            },
        );
        self
    }

    pub fn string(self, name: &str) -> Self {
        self.attribute(name, "string", TypeOptions::default())
    }

    pub fn integer(self, name: &str) -> Self {
        self.attribute(name, "integer", TypeOptions::default())
    }

    pub fn object(self, name: &str, schema: &Arc<Schema>) -> Self {
        self.attribute(name, "object", TypeOptions::schema(schema))
    }

    pub fn array_of(self, name: &str, schema: &Arc<Schema>) -> Self {
        self.attribute(name, "array", TypeOptions::schema(schema))
    }

    /// Object attribute whose schema may not be built yet.
    pub fn object_ref(self, name: &str, schema: impl Into<SchemaRef>) -> Self {
        self.attribute(name, "object", TypeOptions::schema_ref(schema))
    }

    /// Array attribute whose item schema may not be built yet.
    pub fn array_of_ref(self, name: &str, schema: impl Into<SchemaRef>) -> Self {
        self.attribute(name, "array", TypeOptions::schema_ref(schema))
    }

    /// Object attribute holding an entity of the schema being built.
    pub fn object_of_self(mut self, name: &str) -> Self {
        let slot = self.own_slot();
        self.object_ref(name, slot)
    }

    /// Array attribute holding entities of the schema being built.
    pub fn array_of_self(mut self, name: &str) -> Self {
        let slot = self.own_slot();
        self.array_of_ref(name, slot)
    }

    fn own_slot(&mut self) -> SchemaSlot {
        let name = &self.name;
        self.own.get_or_insert_with(|| SchemaSlot::new(name)).clone()
    }

    pub fn array_of_type(self, name: &str, item_type: &str) -> Self {
        self.attribute(name, "array", TypeOptions::item_type(item_type))
    }

    /// Attach a rule to a declared attribute.
    pub fn validates(mut self, name: &str, rule: Rule) -> Self {
        self.rules.push((name.to_string(), rule));
        self
    }

    /// Attach a rule that may have failed to build (e.g. a bad pattern).
    pub fn try_validates(mut self, name: &str, rule: Result<Rule, SchemaError>) -> Self {
        match rule {
            Ok(r) => self.validates(name, r),
            Err(e) => {
                let location = format!("{}.{}", self.name, name);
                self.fail(e.within(&location));
                self
            }
        }
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Params, Option<&str>, &mut Errors) + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn build(mut self) -> Result<Arc<Schema>, SchemaError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        for (name, rule) in self.rules {
            match self.attributes.get_mut(&name) {
                Some(a) => a.rules.push(rule),
                None => {
                    return Err(SchemaError::UnknownAttribute {
                        schema: self.name,
                        attribute: name,
                    })
                }
            }
        }
        tracing::debug!(schema = %self.name, attributes = self.attributes.len(), "schema built");
        let schema = Arc::new(Schema {
            name: self.name,
            attributes: self.attributes,
            validators: self.validators,
        });
        if let Some(slot) = self.own {
            slot.fill(&schema)?;
        }
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeRegistry {
        TypeRegistry::standard()
    }

    #[test]
    fn permitted_fields_nest() {
        let r = registry();
        let hobby = Schema::builder("Hobby", &r).string("name").integer("level").build().unwrap();
        let user = Schema::builder("User", &r)
            .string("name")
            .array_of("hobbies", &hobby)
            .array_of_type("tags", "string")
            .build()
            .unwrap();
        assert_eq!(
            user.permitted_fields(),
            vec![
                Permitted::Field("name".to_string()),
                Permitted::Nested(
                    "hobbies".to_string(),
                    vec![Permitted::Field("name".to_string()), Permitted::Field("level".to_string())]
                ),
                Permitted::Nested("tags".to_string(), vec![]),
            ]
        );
        assert_eq!(user.structured_attribute_names().collect::<Vec<_>>(), vec!["hobbies"]);
    }

    #[test]
    fn duplicate_attribute_fails() {
        let r = registry();
        let err = Schema::builder("User", &r).string("name").integer("name").build().unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAttribute { ref attribute, .. } if attribute == "name"));
    }

    #[test]
    fn rule_on_unknown_attribute_fails() {
        let r = registry();
        let err = Schema::builder("User", &r)
            .string("name")
            .validates("email", Rule::presence())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownAttribute { .. }));
    }

    #[test]
    fn self_reference_through_builder() {
        let r = registry();
        let node = Schema::builder("Node", &r)
            .string("label")
            .array_of_self("children")
            .object_of_self("parent")
            .build()
            .unwrap();
        let children = node.attribute("children").unwrap();
        let AttributeType::Array(array) = children.ty() else {
            panic!("expected array");
        };
        let crate::types::ItemType::Schema(item) = array.item() else {
            panic!("expected schema item");
        };
        assert!(item.schema().is_some_and(|s| Arc::ptr_eq(s, &node)));
        assert_eq!(node.structured_attribute_names().collect::<Vec<_>>(), vec!["children", "parent"]);

        let fields: Vec<_> = node.permitted_fields().iter().map(|p| p.to_value().to_json()).collect();
        assert_eq!(
            fields,
            vec![
                serde_json::json!("label"),
                serde_json::json!({"children": "Node"}),
                serde_json::json!({"parent": "Node"})
            ]
        );
    }

    #[test]
    fn slots_fill_once_with_matching_schema() {
        let r = registry();
        let slot = SchemaSlot::new("B");
        let a = Schema::builder("A", &r).object_ref("b", slot.clone()).build().unwrap();
        assert!(matches!(slot.fill(&a), Err(SchemaError::InvalidSchema(_))));

        let b = Schema::builder("B", &r).object("a", &a).build().unwrap();
        slot.fill(&b).unwrap();
        assert!(matches!(slot.fill(&b), Err(SchemaError::InvalidSchema(ref m)) if m.contains("already")));
        assert!(slot.get().is_some_and(|s| Arc::ptr_eq(s, &b)));
    }

    #[test]
    fn type_errors_carry_location() {
        let r = registry();
        let err = Schema::builder("User", &r)
            .attribute("address", "object", TypeOptions::default())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("User.address"), "{}", err);
    }
}
