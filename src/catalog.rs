//! Resolved set of schemas built from a DSL document.

use crate::ast::{AttributeDef, SchemaDef, SchemaDocument};
use crate::parser::parse;
use crate::registry::{TypeKind, TypeOptions, TypeRegistry};
use crate::rules::Rule;
use crate::schema::{Schema, SchemaError, SchemaSlot};
use indexmap::{IndexMap, IndexSet};
use std::path::Path;
use std::sync::Arc;

/// Schemas by name, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: IndexMap<String, Arc<Schema>>,
}

impl Catalog {
    pub fn from_source(source: &str, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let doc = parse(source).map_err(SchemaError::Parse)?;
        Catalog::resolve(&doc, registry)
    }

    pub fn load(path: impl AsRef<Path>, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let catalog = Catalog::from_source(&source, registry)?;
        tracing::debug!(path = %path.display(), schemas = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    /// Build every schema of `doc`. Schemas may reference each other in any
    /// order. References are built dependencies first; a reference back into
    /// a schema still being built (self or mutual recursion) goes through a
    /// [`SchemaSlot`] filled once that schema exists.
    pub fn resolve(doc: &SchemaDocument, registry: &TypeRegistry) -> Result<Self, SchemaError> {
        let mut defs: IndexMap<&str, &SchemaDef> = IndexMap::new();
        for def in &doc.schemas {
            if defs.insert(def.name.as_str(), def).is_some() {
                return Err(SchemaError::DuplicateSchema(def.name.clone()));
            }
        }

        let mut order = Vec::with_capacity(defs.len());
        let mut seen: IndexSet<&str> = IndexSet::new();
        for &name in defs.keys() {
            visit(name, &defs, registry, &mut seen, &mut order);
        }

        let mut built: IndexMap<String, Arc<Schema>> = IndexMap::new();
        let mut slots: IndexMap<String, SchemaSlot> = IndexMap::new();
        for name in order {
            let def = defs[name];
            let schema = build_schema(def, &defs, &built, &mut slots, registry)?;
            if let Some(slot) = slots.get(name) {
                slot.fill(&schema)?;
            }
            tracing::trace!(schema = name, "schema resolved");
            built.insert(name.to_string(), schema);
        }

        // Declaration order, not dependency order.
        let schemas = defs
            .keys()
            .filter_map(|name| built.get(*name).map(|s| (name.to_string(), Arc::clone(s))))
            .collect();
        Ok(Catalog { schemas })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Like [`get`](Self::get) but failing with `InvalidSchema`.
    pub fn schema(&self, name: &str) -> Result<&Arc<Schema>, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::InvalidSchema(format!("unknown schema '{}'", name)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Schemas referenced through composite type arguments.
fn schema_refs<'a>(def: &'a SchemaDef, defs: &IndexMap<&str, &SchemaDef>, registry: &TypeRegistry) -> Vec<&'a str> {
    def.attributes
        .iter()
        .filter(|a| matches!(registry.kind(&a.type_ref.name), Some(TypeKind::Object | TypeKind::Array)))
        .filter_map(|a| a.type_ref.argument.as_deref())
        .filter(|arg| defs.contains_key(arg))
        .collect()
}

/// Depth-first dependency order. A schema met again while still on the
/// stack is a recursive reference and adds no ordering constraint.
fn visit<'a>(
    name: &'a str,
    defs: &IndexMap<&'a str, &'a SchemaDef>,
    registry: &TypeRegistry,
    seen: &mut IndexSet<&'a str>,
    order: &mut Vec<&'a str>,
) {
    if !seen.insert(name) {
        return;
    }
    for dep in schema_refs(defs[name], defs, registry) {
        visit(dep, defs, registry, seen, order);
    }
    order.push(name);
}

fn build_schema(
    def: &SchemaDef,
    defs: &IndexMap<&str, &SchemaDef>,
    built: &IndexMap<String, Arc<Schema>>,
    slots: &mut IndexMap<String, SchemaSlot>,
    registry: &TypeRegistry,
) -> Result<Arc<Schema>, SchemaError> {
    let mut builder = Schema::builder(&def.name, registry);
    for attr in &def.attributes {
        let location = format!("{}.{}", def.name, attr.name);
        let options = type_options(attr, defs, built, slots, registry).map_err(|e| e.within(&location))?;
        builder = builder.attribute(&attr.name, &attr.type_ref.name, options);
        for rule in &attr.rules {
            builder = builder.try_validates(&attr.name, Rule::from_definition(rule));
        }
    }
    builder.build()
}

/// Type options for an attribute's `<argument>`: a schema for composites, a
/// primitive name for array items. A schema not built yet is referenced
/// through its slot.
fn type_options(
    attr: &AttributeDef,
    defs: &IndexMap<&str, &SchemaDef>,
    built: &IndexMap<String, Arc<Schema>>,
    slots: &mut IndexMap<String, SchemaSlot>,
    registry: &TypeRegistry,
) -> Result<TypeOptions, SchemaError> {
    let head = &attr.type_ref.name;
    let Some(arg) = attr.type_ref.argument.as_deref() else {
        return Ok(TypeOptions::default());
    };
    let kind = registry
        .kind(head)
        .ok_or_else(|| SchemaError::UnknownType(head.clone()))?;
    if kind == TypeKind::Primitive {
        return Err(SchemaError::InvalidConfiguration(format!(
            "{} takes no type argument, got <{}>",
            head, arg
        )));
    }
    let names_schema = defs.contains_key(arg);
    let names_primitive = registry.kind(arg) == Some(TypeKind::Primitive);
    match (names_schema, names_primitive) {
        (true, true) if kind == TypeKind::Array => Err(SchemaError::InvalidConfiguration(format!(
            "<{}> names both a schema and a primitive type",
            arg
        ))),
        (true, _) => match built.get(arg) {
            Some(schema) => Ok(TypeOptions::schema(schema)),
            None => {
                tracing::trace!(attribute = %attr.name, reference = arg, "recursive reference deferred");
                let slot = slots
                    .entry(arg.to_string())
                    .or_insert_with(|| SchemaSlot::new(arg))
                    .clone();
                Ok(TypeOptions::schema_ref(slot))
            }
        },
        (false, true) => Ok(TypeOptions::item_type(arg)),
        (false, false) => Err(SchemaError::InvalidSchema(format!("unknown schema '{}'", arg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeType, ItemType};

    #[test]
    fn resolves_forward_references() {
        let catalog = Catalog::from_source(
            r#"
            schema User { address: object<Address>; hobbies: array<Hobby>; }
            schema Address { city: string [presence]; }
            schema Hobby { name: string; }
            "#,
            &TypeRegistry::standard(),
        )
        .unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["User", "Address", "Hobby"]);
        let user = catalog.schema("User").unwrap();
        assert_eq!(user.structured_attribute_names().collect::<Vec<_>>(), vec!["address", "hobbies"]);
    }

    #[test]
    fn mutual_recursion_resolves() {
        let catalog = Catalog::from_source(
            "schema A { b: object<B>; } schema B { a: array<A>; }",
            &TypeRegistry::standard(),
        )
        .unwrap();
        let a = catalog.schema("A").unwrap();
        let b = catalog.schema("B").unwrap();
        let AttributeType::Object(a_to_b) = a.attribute("b").unwrap().ty() else {
            panic!("expected object");
        };
        assert!(!a_to_b.schema_ref().is_deferred());
        assert!(a_to_b.schema().is_some_and(|s| Arc::ptr_eq(s, b)));

        let AttributeType::Array(b_to_a) = b.attribute("a").unwrap().ty() else {
            panic!("expected array");
        };
        let ItemType::Schema(item) = b_to_a.item() else {
            panic!("expected schema item");
        };
        assert!(item.schema_ref().is_deferred());
        assert!(item.schema().is_some_and(|s| Arc::ptr_eq(s, a)));
    }

    #[test]
    fn duplicate_schema_rejected() {
        let err = Catalog::from_source("schema A { } schema A { }", &TypeRegistry::standard()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSchema(ref n) if n == "A"));
    }
}
