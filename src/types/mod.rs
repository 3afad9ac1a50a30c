//! Typed values: the cast/serialize contract every attribute type implements,
//! the cast representation ([`Typed`]) and the attribute type descriptor.

pub mod array;
pub mod object;
pub mod primitive;

pub use array::{ArrayType, ItemType};
pub use object::ObjectType;
pub use primitive::{BooleanType, FloatType, IntegerType, StringType, ValueType};

use crate::input::Input;
use crate::params::{Params, ParamsError};
use crate::schema::Permitted;
use crate::value::Value;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Cast/serialize contract for an attribute type.
///
/// `cast(Input::Nil)` is always `Typed::Nil` and `serialize(&Typed::Nil)` is
/// always `Value::Null`.
pub trait TypedValue: fmt::Debug + Send + Sync {
    fn type_tag(&self) -> &str;
    fn cast(&self, raw: Input) -> Result<Typed, ParamsError>;
    fn serialize(&self, value: &Typed) -> Value;
}

/// A nested entity held by an attribute slot.
#[derive(Debug, Clone)]
pub enum Nested {
    /// Constructed by the parent during casting.
    Owned(Box<Params>),
    /// Passed in already constructed; the caller keeps its reference.
    Borrowed(Arc<Params>),
}

impl Nested {
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Nested::Borrowed(_))
    }

    /// Exclusive copy of the entity (deep-copies a borrowed one).
    pub fn into_owned(self) -> Params {
        match self {
            Nested::Owned(p) => *p,
            Nested::Borrowed(p) => Arc::try_unwrap(p).unwrap_or_else(|shared| (*shared).clone()),
        }
    }
}

impl Deref for Nested {
    type Target = Params;

    fn deref(&self) -> &Params {
        match self {
            Nested::Owned(p) => p,
            Nested::Borrowed(p) => p,
        }
    }
}

/// A cast attribute value.
#[derive(Debug, Clone, Default)]
pub enum Typed {
    #[default]
    Nil,
    Scalar(Value),
    Entity(Nested),
    List(Vec<Typed>),
}

impl Typed {
    pub fn is_nil(&self) -> bool {
        matches!(self, Typed::Nil)
    }

    /// Nil, blank scalars and empty lists. Entities are never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Typed::Nil => true,
            Typed::Scalar(v) => v.is_blank(),
            Typed::Entity(_) => false,
            Typed::List(items) => items.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Typed::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Params> {
        match self {
            Typed::Entity(n) => Some(&**n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Typed]> {
        match self {
            Typed::List(items) => Some(items),
            _ => None,
        }
    }

    /// Plain value: scalars as-is, entities as their attribute maps.
    pub fn to_plain(&self) -> Value {
        match self {
            Typed::Nil => Value::Null,
            Typed::Scalar(v) => v.clone(),
            Typed::Entity(n) => n.attributes(Default::default()),
            Typed::List(items) => Value::List(items.iter().map(Typed::to_plain).collect()),
        }
    }
}

impl PartialEq<Value> for Typed {
    fn eq(&self, other: &Value) -> bool {
        self.to_plain() == *other
    }
}

/// Attribute type descriptor held by a schema.
#[derive(Debug, Clone)]
pub enum AttributeType {
    Primitive(Arc<dyn TypedValue>),
    Object(ObjectType),
    Array(ArrayType),
}

impl AttributeType {
    pub fn typed_value(&self) -> &dyn TypedValue {
        match self {
            AttributeType::Primitive(t) => t.as_ref(),
            AttributeType::Object(t) => t,
            AttributeType::Array(t) => t,
        }
    }

    pub fn type_tag(&self) -> &str {
        self.typed_value().type_tag()
    }

    pub fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        self.typed_value().cast(raw)
    }

    pub fn serialize(&self, value: &Typed) -> Value {
        self.typed_value().serialize(value)
    }

    /// Nested allow-list for composite types, `None` for primitives.
    pub fn permitted_fields(&self) -> Option<Vec<Permitted>> {
        match self {
            AttributeType::Primitive(_) => None,
            AttributeType::Object(t) => Some(t.permitted_fields()),
            AttributeType::Array(t) => Some(t.permitted_fields()),
        }
    }

    /// Allow-list entry for an attribute `name` of this type.
    pub fn permitted(&self, name: &str) -> Permitted {
        match self {
            AttributeType::Primitive(_) => Permitted::Field(name.to_string()),
            AttributeType::Object(t) => t.permitted(name),
            AttributeType::Array(t) => t.permitted(name),
        }
    }

    /// Holds nested entities (object, or array of a schema).
    pub fn is_structured(&self) -> bool {
        match self {
            AttributeType::Primitive(_) => false,
            AttributeType::Object(_) => true,
            AttributeType::Array(t) => t.is_schema_bound_item(),
        }
    }
}
