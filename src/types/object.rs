//! Single nested schema object.

use super::{Nested, Typed, TypedValue};
use crate::input::Input;
use crate::params::{Params, ParamsError};
use crate::registry::TypeOptions;
use crate::schema::{Permitted, Schema, SchemaError, SchemaRef};
use crate::value::{KeyForm, Value};
use std::sync::Arc;

/// Casts a map into an entity of the wrapped schema.
#[derive(Debug, Clone)]
pub struct ObjectType {
    schema: SchemaRef,
}

impl ObjectType {
    pub fn new(schema: Arc<Schema>) -> Self {
        ObjectType::from_ref(SchemaRef::Resolved(schema))
    }

    pub fn from_ref(schema: SchemaRef) -> Self {
        ObjectType { schema }
    }

    /// Build from type options; the options must name a schema.
    pub fn from_options(options: &TypeOptions) -> Result<Self, SchemaError> {
        if options.value_type.is_some() {
            return Err(SchemaError::InvalidConfiguration(
                "object takes a schema, not a primitive type".to_string(),
            ));
        }
        match &options.value_class {
            Some(schema) => Ok(ObjectType::from_ref(schema.clone())),
            None => Err(SchemaError::InvalidSchema(
                "object requires a schema argument".to_string(),
            )),
        }
    }

    pub fn schema_ref(&self) -> &SchemaRef {
        &self.schema
    }

    /// The wrapped schema; `None` while a deferred reference is unfilled.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.get()
    }

    pub(crate) fn resolved(&self) -> Result<&Arc<Schema>, ParamsError> {
        self.schema().ok_or_else(|| {
            ParamsError::InvalidInput(format!("schema {} is not resolved", self.schema.name()))
        })
    }

    pub fn permitted_fields(&self) -> Vec<Permitted> {
        self.schema().map(|s| s.permitted_fields()).unwrap_or_default()
    }

    /// Allow-list entry for an attribute of this type. Deferred references
    /// stay lazy so recursive schemas expand only as deep as the input.
    pub(crate) fn permitted(&self, name: &str) -> Permitted {
        match &self.schema {
            SchemaRef::Resolved(s) => Permitted::Nested(name.to_string(), s.permitted_fields()),
            SchemaRef::Deferred(slot) => Permitted::Deferred(name.to_string(), slot.clone()),
        }
    }

    fn is_own_instance(&self, params: &Params) -> bool {
        self.schema().is_some_and(|s| Arc::ptr_eq(params.schema(), s))
    }

    /// Construct a new entity of the wrapped schema from a map.
    pub(crate) fn construct(&self, raw: Input) -> Result<Typed, ParamsError> {
        let params = Params::new(self.resolved()?, raw)?;
        Ok(Typed::Entity(Nested::Owned(Box::new(params))))
    }
}

impl TypedValue for ObjectType {
    fn type_tag(&self) -> &str {
        "object"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        match raw {
            Input::Nil => Ok(Typed::Nil),
            Input::Instance(p) if self.is_own_instance(&p) => Ok(Typed::Entity(Nested::Borrowed(p))),
            raw @ (Input::Map(_) | Input::Untrusted(_)) => self.construct(raw),
            other => Err(ParamsError::InvalidInput(format!(
                "expects a map or an instance of {}, got {}",
                self.schema.name(),
                other.kind()
            ))),
        }
    }

    fn serialize(&self, value: &Typed) -> Value {
        match value {
            Typed::Nil => Value::Null,
            Typed::Entity(n) => n.attributes(KeyForm::String),
            other => other.to_plain(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permit::UntrustedParams;
    use crate::registry::TypeRegistry;
    use crate::rules::Rule;
    use crate::schema::SchemaSlot;
    use serde_json::json;

    fn address(registry: &TypeRegistry) -> Arc<Schema> {
        Schema::builder("Address", registry)
            .string("city")
            .validates("city", Rule::presence())
            .build()
            .unwrap()
    }

    #[test]
    fn serialize_edges() {
        let t = ObjectType::new(address(&TypeRegistry::standard()));
        assert_eq!(t.serialize(&Typed::Nil), Value::Null);
        assert_eq!(t.serialize(&Typed::Scalar(Value::from("as is"))), Value::from("as is"));
        let plain = Typed::List(vec![Typed::Scalar(Value::Int(1))]);
        assert_eq!(t.serialize(&plain), Value::from(json!([1])));
    }

    #[test]
    fn casts_untrusted_through_allow_list() {
        let t = ObjectType::new(address(&TypeRegistry::standard()));
        let raw = UntrustedParams::from(json!({"city": "Tokyo", "admin": true}));
        let cast = t.cast(Input::from(raw)).unwrap();
        let entity = cast.as_entity().expect("entity");
        assert_eq!(entity.attributes(KeyForm::String).to_json(), json!({"city": "Tokyo"}));
        assert!(matches!(cast, Typed::Entity(Nested::Owned(_))));
    }

    #[test]
    fn shares_instance_of_wrapped_schema() {
        let schema = address(&TypeRegistry::standard());
        let t = ObjectType::new(Arc::clone(&schema));
        let instance = Arc::new(Params::new(&schema, json!({"city": "Osaka"})).unwrap());
        let cast = t.cast(Input::from(Arc::clone(&instance))).unwrap();
        assert!(matches!(cast, Typed::Entity(Nested::Borrowed(ref p)) if Arc::ptr_eq(p, &instance)));
    }

    #[test]
    fn rejects_instance_of_same_named_schema() {
        let registry = TypeRegistry::standard();
        let t = ObjectType::new(address(&registry));
        let other = Schema::builder("Address", &registry).string("phone").build().unwrap();
        let foreign = Params::new(&other, json!({"phone": "123"})).unwrap();
        let err = t.cast(Input::from(foreign)).unwrap_err();
        assert!(
            matches!(err, ParamsError::InvalidInput(ref m) if m == "expects a map or an instance of Address, got Address params"),
            "{}",
            err
        );
    }

    #[test]
    fn rejects_scalars_and_lists() {
        let t = ObjectType::new(address(&TypeRegistry::standard()));
        assert!(matches!(t.cast(Input::from("Tokyo")), Err(ParamsError::InvalidInput(_))));
        assert!(matches!(t.cast(Input::from(json!([{"city": "x"}]))), Err(ParamsError::InvalidInput(_))));
        assert!(t.cast(Input::Nil).unwrap().is_nil());
    }

    #[test]
    fn unfilled_reference_fails_construction() {
        let t = ObjectType::from_ref(SchemaRef::Deferred(SchemaSlot::new("Later")));
        assert!(t.schema().is_none());
        assert!(t.permitted_fields().is_empty());
        let err = t.cast(Input::from(json!({}))).unwrap_err();
        assert!(matches!(err, ParamsError::InvalidInput(ref m) if m.contains("Later")));
    }
}
