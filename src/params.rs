//! Schema-bound entities: construction from raw input, recursive validation
//! and serialization back to plain nested values.

use crate::errors::Errors;
use crate::input::Input;
use crate::path::Path;
use crate::rules;
use crate::schema::Schema;
use crate::types::{Nested, Typed};
use crate::value::{Key, KeyForm, Map, Value};
use indexmap::IndexMap;
use std::sync::Arc;

/// Construction failures. Validation failures are never errors; they are
/// collected into [`Errors`].
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unknown attribute '{attribute}' for {schema}")]
    UnknownAttribute { schema: String, attribute: String },
    #[error("Cannot cast {found} to {expected}")]
    Cast { expected: String, found: String },
    #[error("{path}: {source}")]
    At { path: Path, source: Box<ParamsError> },
}

impl ParamsError {
    /// Prepend a path segment (attribute name or index).
    pub fn at(self, segment: impl ToString) -> Self {
        let head = Path::from(vec![segment.to_string()]);
        match self {
            ParamsError::At { path, source } => ParamsError::At {
                path: head.join(&path),
                source,
            },
            other => ParamsError::At {
                path: head,
                source: Box::new(other),
            },
        }
    }

    /// Where the failure happened; empty for the top level.
    pub fn path(&self) -> Path {
        match self {
            ParamsError::At { path, .. } => path.clone(),
            _ => Path::new(),
        }
    }

    /// The underlying failure without path wrapping.
    pub fn root(&self) -> &ParamsError {
        match self {
            ParamsError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

/// An entity bound to a schema.
#[derive(Debug, Clone)]
pub struct Params {
    schema: Arc<Schema>,
    values: IndexMap<String, Typed>,
    errors: Errors,
}

/// Rewrite every map key to its canonical string form.
fn canonical(input: Input) -> Input {
    match input {
        Input::Map(m) => Input::Map(
            m.into_iter()
                .map(|(k, v)| (Key::String(k.name().to_string()), canonical(v)))
                .collect(),
        ),
        Input::Sequence(items) => Input::Sequence(items.into_iter().map(canonical).collect()),
        other => other,
    }
}

impl Params {
    /// Cast `input` against `schema`.
    ///
    /// Untrusted input is filtered through the schema's allow-list first. Plain
    /// maps are trusted: their keys are normalized but not filtered, so a key
    /// that names no attribute is an error.
    pub fn new(schema: &Arc<Schema>, input: impl Into<Input>) -> Result<Self, ParamsError> {
        let fields = match input.into() {
            Input::Untrusted(untrusted) => {
                if untrusted.as_value().as_map().is_none() {
                    return Err(ParamsError::InvalidInput(format!(
                        "{} params must wrap a map, got {}",
                        schema.name(),
                        untrusted.as_value().kind()
                    )));
                }
                match canonical(Input::from(untrusted.permit(&schema.permitted_fields()))) {
                    Input::Map(m) => m,
                    _ => IndexMap::new(),
                }
            }
            map @ Input::Map(_) => match canonical(map) {
                Input::Map(m) => m,
                _ => IndexMap::new(),
            },
            other => {
                return Err(ParamsError::InvalidInput(format!(
                    "{} params must be a map or untrusted params, got {}",
                    schema.name(),
                    other.kind()
                )))
            }
        };
        Self::cast_fields(schema, fields)
    }

    fn cast_fields(schema: &Arc<Schema>, mut fields: IndexMap<Key, Input>) -> Result<Self, ParamsError> {
        if let Some(unknown) = fields.keys().find(|k| schema.attribute(k.name()).is_none()) {
            return Err(ParamsError::UnknownAttribute {
                schema: schema.name().to_string(),
                attribute: unknown.name().to_string(),
            });
        }
        let mut values = IndexMap::new();
        for attribute in schema.attributes() {
            let raw = fields
                .shift_remove(&Key::String(attribute.name().to_string()))
                .unwrap_or_default();
            let typed = attribute.ty().cast(raw).map_err(|e| e.at(attribute.name()))?;
            values.insert(attribute.name().to_string(), typed);
        }
        tracing::trace!(schema = schema.name(), "params constructed");
        Ok(Params {
            schema: Arc::clone(schema),
            values,
            errors: Errors::new(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Cast value of an attribute.
    pub fn get(&self, name: &str) -> Option<&Typed> {
        self.values.get(name)
    }

    /// Plain value of an attribute (`Null` when undeclared).
    pub fn value(&self, name: &str) -> Value {
        self.get(name).map(Typed::to_plain).unwrap_or_default()
    }

    pub fn entity(&self, name: &str) -> Option<&Params> {
        self.get(name).and_then(Typed::as_entity)
    }

    pub fn values(&self) -> impl Iterator<Item = (&str, &Typed)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Errors of the last validation pass; empty until one runs.
    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    pub fn valid(&mut self) -> bool {
        self.valid_in(None)
    }

    /// Run a validation pass in `context`, replacing the previous errors.
    ///
    /// Every nested entity is evaluated; nothing short-circuits. Owned
    /// children have their own errors refreshed; shared children are
    /// evaluated without being mutated.
    pub fn valid_in(&mut self, context: Option<&str>) -> bool {
        let mut errors = Errors::new();
        rules::run(self, context, &mut errors);

        let schema = Arc::clone(&self.schema);
        for name in schema.structured_attribute_names() {
            let prefix = Path::from(vec![name.to_string()]);
            match self.values.get_mut(name) {
                Some(Typed::List(items)) => {
                    for (index, item) in items.iter_mut().enumerate() {
                        if let Typed::Entity(nested) = item {
                            errors.import(&prefix.child(index), &validate_nested(nested, context));
                        }
                    }
                }
                Some(Typed::Entity(nested)) => {
                    errors.import(&prefix, &validate_nested(nested, context));
                }
                _ => {}
            }
        }

        tracing::debug!(
            schema = self.schema.name(),
            context = context.unwrap_or(""),
            errors = errors.len(),
            "validated"
        );
        self.errors = errors;
        self.errors.is_empty()
    }

    /// The errors a validation pass in `context` would produce, without
    /// mutating this entity or its children.
    pub fn collect_errors(&self, context: Option<&str>) -> Errors {
        let mut errors = Errors::new();
        rules::run(self, context, &mut errors);
        for name in self.schema.structured_attribute_names() {
            let prefix = Path::from(vec![name.to_string()]);
            match self.values.get(name) {
                Some(Typed::List(items)) => {
                    for (index, item) in items.iter().enumerate() {
                        if let Typed::Entity(nested) = item {
                            errors.import(&prefix.child(index), &nested.collect_errors(context));
                        }
                    }
                }
                Some(Typed::Entity(nested)) => {
                    errors.import(&prefix, &nested.collect_errors(context));
                }
                _ => {}
            }
        }
        errors
    }

    /// Plain nested map of every attribute; nested entities are serialized
    /// recursively and `form` applies to every key in the tree.
    pub fn attributes(&self, form: KeyForm) -> Value {
        let mut out = Map::new();
        for attribute in self.schema.attributes() {
            let value = self.values.get(attribute.name()).unwrap_or(&Typed::Nil);
            let plain = if attribute.is_structured() {
                attribute.ty().serialize(value)
            } else {
                value.to_plain()
            };
            out.insert(Key::String(attribute.name().to_string()), plain);
        }
        Value::Map(out).with_key_form(form)
    }
}

fn validate_nested(nested: &mut Nested, context: Option<&str>) -> Errors {
    match nested {
        Nested::Owned(child) => {
            child.valid_in(context);
            child.errors().clone()
        }
        Nested::Borrowed(child) => child.collect_errors(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;
    use crate::rules::Rule;
    use serde_json::json;

    fn schemas() -> Arc<Schema> {
        let r = TypeRegistry::standard();
        let hobby = Schema::builder("Hobby", &r)
            .string("name")
            .validates("name", Rule::presence())
            .build()
            .unwrap();
        Schema::builder("User", &r)
            .string("name")
            .integer("age")
            .array_of("hobbies", &hobby)
            .validates("name", Rule::presence())
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_non_map_input() {
        let err = Params::new(&schemas(), "not a map").unwrap_err();
        assert!(matches!(err, ParamsError::InvalidInput(ref m) if m.contains("string")));
    }

    #[test]
    fn unknown_key_in_plain_map_fails() {
        let err = Params::new(&schemas(), json!({"name": "a", "nickname": "b"})).unwrap_err();
        assert!(matches!(err, ParamsError::UnknownAttribute { ref attribute, .. } if attribute == "nickname"));
    }

    #[test]
    fn cast_failure_reports_path() {
        let err = Params::new(&schemas(), json!({"age": "old"})).unwrap_err();
        assert_eq!(err.path().to_dot(), "age");
        assert!(matches!(err.root(), ParamsError::Cast { .. }));
    }

    #[test]
    fn errors_reset_between_passes() {
        let mut p = Params::new(&schemas(), json!({"name": "", "hobbies": [{"name": ""}]})).unwrap();
        assert!(p.errors().is_empty());
        assert!(!p.valid());
        let first = p.errors().len();
        assert!(!p.valid());
        assert_eq!(p.errors().len(), first);
        assert_eq!(p.collect_errors(None).to_flat(false), p.errors().to_flat(false));
    }

    #[test]
    fn missing_attributes_are_nil() {
        let p = Params::new(&schemas(), json!({})).unwrap();
        assert!(p.get("name").is_some_and(Typed::is_nil));
        assert_eq!(p.value("age"), Value::Null);
        assert!(p.get("nickname").is_none());
    }
}
