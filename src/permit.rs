//! Allow-list filtering for externally supplied parameters.

use crate::path::Path;
use crate::schema::Permitted;
use crate::value::{Map, Value};

/// Externally supplied data. Only allow-listed keys survive [`permit`](Self::permit).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UntrustedParams(Value);

impl UntrustedParams {
    pub fn new(value: impl Into<Value>) -> Self {
        UntrustedParams(value.into())
    }

    pub fn from_json(source: &str) -> Result<Self, serde_json::Error> {
        let json: serde_json::Value = serde_json::from_str(source)?;
        Ok(UntrustedParams(Value::from(json)))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Keep only allow-listed keys, preserving nested shape.
    ///
    /// A bare name keeps a scalar; `{name: []}` keeps a list of scalars;
    /// `{name: fields}` keeps a map, or a list of maps, filtered by `fields`.
    /// Deferred entries expand one level each time the input nests deeper.
    pub fn permit(&self, allowed: &[Permitted]) -> Value {
        match &self.0 {
            Value::Map(m) => Value::Map(permit_map(m, allowed, &Path::new())),
            _ => Value::Map(Map::new()),
        }
    }
}

impl From<serde_json::Value> for UntrustedParams {
    fn from(json: serde_json::Value) -> Self {
        UntrustedParams(Value::from(json))
    }
}

fn permit_map(map: &Map, allowed: &[Permitted], at: &Path) -> Map {
    let mut out = Map::new();
    for (key, value) in map {
        let path = at.child(key.name());
        let kept = match allowed.iter().find(|p| p.name() == key.name()) {
            None => None,
            Some(Permitted::Field(_)) => value.is_scalar().then(|| value.clone()),
            Some(Permitted::Nested(_, fields)) => permit_nested(value, fields, &path),
            Some(deferred @ Permitted::Deferred(..)) => {
                permit_nested(value, &deferred.fields().unwrap_or_default(), &path)
            }
        };
        match kept {
            Some(v) => {
                out.insert(key.clone(), v);
            }
            None => tracing::debug!(path = %path, "unpermitted parameter dropped"),
        }
    }
    out
}

fn permit_nested(value: &Value, fields: &[Permitted], at: &Path) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::List(items) if fields.is_empty() => {
            Some(Value::List(items.iter().filter(|v| v.is_scalar()).cloned().collect()))
        }
        Value::List(items) => Some(Value::List(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| match item {
                    Value::Map(m) => Some(Value::Map(permit_map(m, fields, &at.child(i)))),
                    _ => None,
                })
                .collect(),
        )),
        Value::Map(m) if !fields.is_empty() => Some(Value::Map(permit_map(m, fields, at))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn allow_list() -> Vec<Permitted> {
        vec![
            Permitted::Field("name".to_string()),
            Permitted::Nested("address".to_string(), vec![Permitted::Field("city".to_string())]),
            Permitted::Nested("hobbies".to_string(), vec![Permitted::Field("name".to_string())]),
            Permitted::Nested("tags".to_string(), vec![]),
        ]
    }

    #[test]
    fn drops_unpermitted_keys_at_every_level() {
        let raw = UntrustedParams::from(json!({
            "name": "Taro",
            "admin": true,
            "address": {"city": "Tokyo", "secret": 1},
            "hobbies": [{"name": "go", "rank": 9}, "junk"],
            "tags": ["a", {"b": 1}, "c"]
        }));
        let permitted = raw.permit(&allow_list());
        assert_eq!(
            permitted.to_json(),
            json!({
                "name": "Taro",
                "address": {"city": "Tokyo"},
                "hobbies": [{"name": "go"}],
                "tags": ["a", "c"]
            })
        );
    }

    #[test]
    fn shape_mismatches_are_dropped() {
        let raw = UntrustedParams::from(json!({"name": {"first": "x"}, "address": "Tokyo", "tags": "a"}));
        assert_eq!(raw.permit(&allow_list()).to_json(), json!({}));
    }

    #[test]
    fn recursive_allow_list_follows_input_depth() {
        use crate::registry::TypeRegistry;
        use crate::schema::Schema;

        let registry = TypeRegistry::standard();
        let node = Schema::builder("Node", &registry)
            .string("label")
            .array_of_self("children")
            .build()
            .unwrap();
        let raw = UntrustedParams::from(json!({
            "label": "root",
            "children": [{"label": "a", "children": [{"label": "a1", "rank": 2}], "x": 1}]
        }));
        assert_eq!(
            raw.permit(&node.permitted_fields()).to_json(),
            json!({"label": "root", "children": [{"label": "a", "children": [{"label": "a1"}]}]})
        );
    }

    #[test]
    fn parses_json_source() {
        let raw = UntrustedParams::from_json(r#"{"name": "x"}"#).unwrap();
        assert_eq!(raw.as_value().get("name"), Some(&Value::from("x")));
        assert!(UntrustedParams::from_json("{").is_err());
    }
}
