//! Homogeneous sequences of primitives or nested schema objects.

use super::{ObjectType, Typed, TypedValue};
use crate::input::Input;
use crate::params::ParamsError;
use crate::registry::{TypeOptions, TypeRegistry};
use crate::schema::{Permitted, Schema, SchemaError, SchemaRef};
use crate::value::Value;
use std::sync::Arc;

/// Element type of an [`ArrayType`].
#[derive(Debug, Clone)]
pub enum ItemType {
    Schema(ObjectType),
    Primitive(Arc<dyn TypedValue>),
}

#[derive(Debug, Clone)]
pub struct ArrayType {
    item: ItemType,
}

impl ArrayType {
    pub fn of_schema(schema: Arc<Schema>) -> Self {
        ArrayType::of_schema_ref(SchemaRef::Resolved(schema))
    }

    pub fn of_schema_ref(schema: SchemaRef) -> Self {
        ArrayType {
            item: ItemType::Schema(ObjectType::from_ref(schema)),
        }
    }

    pub fn of_primitive(item: Arc<dyn TypedValue>) -> Self {
        ArrayType {
            item: ItemType::Primitive(item),
        }
    }

    /// Exactly one of `value_class` and `value_type` must be set.
    pub fn from_options(options: &TypeOptions, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        match (&options.value_class, &options.value_type) {
            (Some(_), Some(_)) => Err(SchemaError::InvalidConfiguration(
                "array takes either a schema or a primitive type, not both".to_string(),
            )),
            (None, None) => Err(SchemaError::InvalidConfiguration(
                "array requires a schema or a primitive type".to_string(),
            )),
            (Some(schema), None) => Ok(ArrayType::of_schema_ref(schema.clone())),
            (None, Some(name)) => {
                let item_options = TypeOptions {
                    options: options.options.clone(),
                    ..TypeOptions::default()
                };
                Ok(ArrayType::of_primitive(registry.primitive(name, &item_options)?))
            }
        }
    }

    pub fn item(&self) -> &ItemType {
        &self.item
    }

    pub fn is_schema_bound_item(&self) -> bool {
        matches!(self.item, ItemType::Schema(_))
    }

    /// Allow-list of the item schema; empty for primitive items.
    pub fn permitted_fields(&self) -> Vec<Permitted> {
        match &self.item {
            ItemType::Schema(t) => t.permitted_fields(),
            ItemType::Primitive(_) => Vec::new(),
        }
    }

    /// Allow-list entry for an attribute of this type.
    pub(crate) fn permitted(&self, name: &str) -> Permitted {
        match &self.item {
            ItemType::Schema(t) => t.permitted(name),
            ItemType::Primitive(_) => Permitted::Nested(name.to_string(), Vec::new()),
        }
    }

    fn cast_item(&self, raw: Input) -> Result<Typed, ParamsError> {
        match &self.item {
            ItemType::Schema(t) => t.construct(raw),
            ItemType::Primitive(t) => t.cast(raw),
        }
    }

    fn serialize_item(&self, value: &Typed) -> Value {
        match &self.item {
            ItemType::Schema(t) => t.serialize(value),
            ItemType::Primitive(t) => t.serialize(value),
        }
    }
}

impl TypedValue for ArrayType {
    fn type_tag(&self) -> &str {
        "array"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        let items = match raw {
            Input::Nil => return Ok(Typed::Nil),
            Input::Sequence(items) => items,
            single => vec![single],
        };
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            out.push(self.cast_item(item).map_err(|e| e.at(index))?);
        }
        Ok(Typed::List(out))
    }

    fn serialize(&self, value: &Typed) -> Value {
        match value {
            Typed::Nil => Value::Null,
            Typed::List(items) => Value::List(items.iter().map(|v| self.serialize_item(v)).collect()),
            _ => Value::List(Vec::new()),
        }
    }
}
