//! Raw construction input, classified once at the cast boundary.

use crate::params::Params;
use crate::permit::UntrustedParams;
use crate::value::{Key, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Raw input for casting. Shape is decided here, not by the types that cast it.
#[derive(Debug, Clone, Default)]
pub enum Input {
    #[default]
    Nil,
    /// A non-null scalar value.
    Scalar(Value),
    Sequence(Vec<Input>),
    Map(IndexMap<Key, Input>),
    /// An already-constructed entity, shared with the caller.
    Instance(Arc<Params>),
    /// Externally supplied data that must be allow-listed before casting.
    Untrusted(UntrustedParams),
}

impl Input {
    pub fn is_nil(&self) -> bool {
        matches!(self, Input::Nil)
    }

    pub fn kind(&self) -> String {
        match self {
            Input::Nil => "nil".to_string(),
            Input::Scalar(v) => v.kind().to_string(),
            Input::Sequence(_) => "list".to_string(),
            Input::Map(_) => "map".to_string(),
            Input::Instance(p) => format!("{} params", p.schema().name()),
            Input::Untrusted(_) => "untrusted params".to_string(),
        }
    }

    /// Build a map input from `(key, value)` pairs.
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        V: Into<Input>,
        I: IntoIterator<Item = (K, V)>,
    {
        Input::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Plain value for this input. Instances serialize to their attributes.
    pub fn into_value(self) -> Value {
        match self {
            Input::Nil => Value::Null,
            Input::Scalar(v) => v,
            Input::Sequence(items) => Value::List(items.into_iter().map(Input::into_value).collect()),
            Input::Map(m) => Value::Map(m.into_iter().map(|(k, v)| (k, v.into_value())).collect()),
            Input::Instance(p) => p.attributes(Default::default()),
            Input::Untrusted(u) => u.into_value(),
        }
    }
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Input::Nil,
            Value::List(items) => Input::Sequence(items.into_iter().map(Input::from).collect()),
            Value::Map(m) => Input::Map(m.into_iter().map(|(k, v)| (k, Input::from(v))).collect()),
            scalar => Input::Scalar(scalar),
        }
    }
}

impl From<serde_json::Value> for Input {
    fn from(v: serde_json::Value) -> Self {
        Input::from(Value::from(v))
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Scalar(Value::from(s))
    }
}

impl From<i64> for Input {
    fn from(x: i64) -> Self {
        Input::Scalar(Value::Int(x))
    }
}

impl From<Vec<Input>> for Input {
    fn from(items: Vec<Input>) -> Self {
        Input::Sequence(items)
    }
}

impl From<Arc<Params>> for Input {
    fn from(p: Arc<Params>) -> Self {
        Input::Instance(p)
    }
}

impl From<Params> for Input {
    fn from(p: Params) -> Self {
        Input::Instance(Arc::new(p))
    }
}

impl From<UntrustedParams> for Input {
    fn from(u: UntrustedParams) -> Self {
        Input::Untrusted(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_json_shapes() {
        let input = Input::from(json!({"a": [1, null], "b": "x"}));
        let Input::Map(m) = input else {
            panic!("expected map");
        };
        assert!(matches!(m.get(&Key::from("a")), Some(Input::Sequence(items)) if items.len() == 2));
        assert!(matches!(m.get(&Key::from("b")), Some(Input::Scalar(Value::String(_)))));
        assert_eq!(Input::from(json!(null)).kind(), "nil");
    }

    #[test]
    fn map_builder_accepts_symbol_keys() {
        let input = Input::map([(Key::symbol("name"), Input::from("Taro"))]);
        assert_eq!(input.into_value().get("name"), Some(&Value::from("Taro")));
    }
}
