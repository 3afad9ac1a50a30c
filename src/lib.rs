//! # structparams - Recursive parameter binding and validation
//!
//! Casts loosely-typed nested input (maps and sequences of scalars) into a
//! tree of schema-bound entities, validates every level, and reports failures
//! under path identifiers that render flat (`address.postal_code`), as JSON
//! Pointers (`/address/postal_code`) or as a tree shaped like the input.
//!
//! ## Pieces
//!
//! - **Schemas**: ordered attribute declarations with per-attribute rules,
//!   built with [`SchemaBuilder`] or loaded from the schema DSL ([`Catalog`])
//! - **Types**: primitives plus two composites, [`ObjectType`] (one nested
//!   entity) and [`ArrayType`] (a sequence of primitives or nested entities)
//! - **Entities**: [`Params`] casts input, validates recursively and
//!   serializes back to plain values
//! - **Errors**: [`Errors`] stores `(path, message)` entries; [`ErrorFormatter`]
//!   adds pointer-keyed views
//! - **Untrusted input**: [`UntrustedParams`] is filtered through the schema's
//!   allow-list before casting; plain maps are trusted
//!
//! ## Example DSL
//!
//! ```text
//! schema Address {
//!     postal_code: string [presence, format("^\d{3}-\d{4}$")];
//!     city: string [presence];
//! }
//!
//! schema User {
//!     name: string [presence, length(max: 50)];
//!     age: integer [numericality(gt: 0, allow_nil: true)];
//!     address: object<Address>;
//!     hobbies: array<Hobby>;
//!     tags: array<string>;
//! }
//!
//! schema Hobby {
//!     name: string [presence];
//!     level: integer [inclusion(1..3)];
//! }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use structparams::{Catalog, KeyForm, Params, TypeRegistry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Catalog::load("schemas/user.params", &TypeRegistry::standard())?;
//! let user = catalog.schema("User")?;
//! let mut params = Params::new(user, serde_json::json!({"name": "", "address": {"city": ""}}))?;
//! if !params.valid() {
//!     println!("{:?}", params.errors().to_flat(false));
//! }
//! println!("{:?}", params.attributes(KeyForm::String));
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod catalog;
pub mod errors;
pub mod formatter;
pub mod input;
pub mod params;
pub mod parser;
pub mod path;
pub mod permit;
pub mod registry;
pub mod rules;
pub mod schema;
pub mod types;
pub mod value;

pub use catalog::Catalog;
pub use errors::{ErrorEntry, ErrorSnapshot, ErrorTree, Errors};
pub use formatter::ErrorFormatter;
pub use input::Input;
pub use params::{Params, ParamsError};
pub use parser::parse;
pub use path::Path;
pub use permit::UntrustedParams;
pub use registry::{TypeKind, TypeOptions, TypeRegistry};
pub use rules::{Allowed, Numericality, Rule, RuleKind};
pub use schema::{Attribute, Permitted, Schema, SchemaBuilder, SchemaError};
pub use types::{ArrayType, AttributeType, ItemType, Nested, ObjectType, Typed, TypedValue};
pub use value::{Key, KeyForm, Symbol, Value};
