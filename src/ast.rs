//! Abstract Syntax Tree for the schema definition DSL.

use crate::value::Value;

/// Root document: a list of schema sections in source order.
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    pub schemas: Vec<SchemaDef>,
}

impl SchemaDocument {
    pub fn get(&self, name: &str) -> Option<&SchemaDef> {
        self.schemas.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaDef {
    pub name: String,
    pub attributes: Vec<AttributeDef>,
}

#[derive(Debug, Clone)]
pub struct AttributeDef {
    pub name: String,
    pub type_ref: TypeRef,
    pub rules: Vec<RuleDef>,
}

/// `name` or `name<argument>`, e.g. `string`, `object<Address>`, `array<string>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: String,
    pub argument: Option<String>,
}

/// A rule application: `presence`, `length(max: 50)`, `inclusion(1..3)`.
#[derive(Debug, Clone)]
pub struct RuleDef {
    pub name: String,
    pub args: Vec<RuleArg>,
}

impl RuleDef {
    pub fn named(&self, key: &str) -> Option<&Literal> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(key))
            .map(|a| &a.value)
    }

    pub fn positional(&self) -> impl Iterator<Item = &Literal> {
        self.args.iter().filter(|a| a.name.is_none()).map(|a| &a.value)
    }
}

#[derive(Debug, Clone)]
pub struct RuleArg {
    pub name: Option<String>,
    pub value: Literal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    /// Inclusive integer range `a..b`.
    Range(i64, i64),
}

impl Literal {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(x) => Some(*x as f64),
            Literal::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Literal::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Scalar value of the literal; ranges have none.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Literal::Int(x) => Some(Value::Int(*x)),
            Literal::Float(x) => Some(Value::Float(*x)),
            Literal::Bool(b) => Some(Value::Bool(*b)),
            Literal::String(s) => Some(Value::String(s.clone())),
            Literal::Range(..) => None,
        }
    }
}
