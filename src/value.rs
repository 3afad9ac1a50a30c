//! Plain runtime values: the loosely-typed input and serialized output representation.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::sync::Arc;

/// Map keyed by string or symbol keys, in insertion order.
pub type Map = IndexMap<Key, Value>;

/// An interned-style symbolic key (`:name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Map key. Both forms address the same attribute once normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    String(String),
    Symbol(Symbol),
}

impl Key {
    pub fn symbol(name: &str) -> Self {
        Key::Symbol(Symbol::new(name))
    }

    /// Canonical (string) name of the key.
    pub fn name(&self) -> &str {
        match self {
            Key::String(s) => s,
            Key::Symbol(s) => s.as_str(),
        }
    }

    pub fn in_form(&self, form: KeyForm) -> Key {
        match form {
            KeyForm::String => Key::String(self.name().to_string()),
            KeyForm::Symbol => Key::symbol(self.name()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => write!(f, "{}", s),
            Key::Symbol(s) => write!(f, ":{}", s.as_str()),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<Symbol> for Key {
    fn from(s: Symbol) -> Self {
        Key::Symbol(s)
    }
}

/// Output key form for serialized attribute trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyForm {
    #[default]
    String,
    Symbol,
}

/// A single plain value (scalar or compound).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Map),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Null, false, whitespace-only strings and empty collections are blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.trim().is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
            Value::Int(_) | Value::Float(_) => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(x) => Some(*x as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a map entry by canonical key name, whatever its key form.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.name() == name)
            .map(|(_, v)| v)
    }

    /// Human-readable kind, used in cast and input error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    /// Rewrite every map key in the tree to the given form.
    pub fn with_key_form(self, form: KeyForm) -> Value {
        match self {
            Value::Map(m) => Value::Map(
                m.into_iter()
                    .map(|(k, v)| (k.in_form(form), v.with_key_form(form)))
                    .collect(),
            ),
            Value::List(l) => Value::List(l.into_iter().map(|v| v.with_key_form(form)).collect()),
            other => other,
        }
    }

    /// Text used when a scalar is read as a string (format/length rules, string casts).
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(x) => x.to_string(),
            Value::Float(x) => format!("{:?}", x),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => self.to_json().to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(x) => serde_json::Value::from(*x),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(Value::to_json).collect()),
            Value::Map(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.name().to_string(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (Key::String(k), Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Int(x as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Map> for Value {
    fn from(m: Map) -> Self {
        Value::Map(m)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(x) => serializer.serialize_i64(*x),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(l) => {
                let mut seq = serializer.serialize_seq(Some(l.len()))?;
                for v in l {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k.name(), v)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("  ").is_blank());
        assert!(Value::List(vec![]).is_blank());
        assert!(!Value::from(0i64).is_blank());
        assert!(!Value::from("x").is_blank());
    }

    #[test]
    fn key_form_rewrites_nested_maps() {
        let v = Value::from(json!({"a": {"b": [{"c": 1}]}})).with_key_form(KeyForm::Symbol);
        let inner = v.get("a").and_then(|a| a.get("b")).and_then(Value::as_list).expect("list");
        let first = inner[0].as_map().expect("map");
        assert_eq!(first.keys().next(), Some(&Key::symbol("c")));
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let src = json!({"z": 1, "a": [true, null, 1.5, "s"]});
        let v = Value::from(src.clone());
        let keys: Vec<_> = v.as_map().expect("map").keys().map(Key::name).collect();
        assert_eq!(keys, vec!["z", "a"]);
        assert_eq!(v.to_json(), src);
    }

    #[test]
    fn float_text_keeps_fraction() {
        assert_eq!(Value::Float(3.0).to_text(), "3.0");
        assert_eq!(Value::Float(0.25).to_text(), "0.25");
    }
}
