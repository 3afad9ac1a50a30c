//! Validate a JSON document against a schema from a schema file.
//!
//! Usage:
//!   check_params [OPTIONS] SCHEMA_FILE SCHEMA_NAME [INPUT.json]
//!   check_params [OPTIONS] SCHEMA_FILE SCHEMA_NAME < input.json
//!
//! The input is treated as untrusted: keys outside the schema's allow-list are
//! dropped before casting. Errors are printed to stdout as JSON and the exit
//! status is 1 when the input is invalid.
//!
//! Options:
//!   --nested, -n         Errors as a tree shaped like the input
//!   --pointer, -p        Errors keyed by JSON Pointer
//!   --full, -f           Attribute-prefixed messages
//!   --context NAME       Validation context (runs rules declared with `on: NAME`)
//!
//! Set RUST_LOG=structparams=debug to trace casting and dropped keys.

use anyhow::{bail, Context};
use serde_json::json;
use std::io::{self, Read};
use structparams::{Catalog, ErrorFormatter, KeyForm, Params, TypeRegistry, UntrustedParams};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Layout {
    Flat,
    Nested,
    Pointer,
}

fn take_flag(args: &mut Vec<String>, long: &str, short: &str) -> bool {
    match args.iter().position(|a| a == long || a == short) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_value(args: &mut Vec<String>, long: &str) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == long) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{} requires a value", long);
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let context = take_value(&mut args, "--context")?;
    let full = take_flag(&mut args, "--full", "-f");
    let layout = if take_flag(&mut args, "--nested", "-n") {
        Layout::Nested
    } else if take_flag(&mut args, "--pointer", "-p") {
        Layout::Pointer
    } else {
        Layout::Flat
    };

    let (schema_file, schema_name, input_file) = match args.as_slice() {
        [file, name] => (file.clone(), name.clone(), None),
        [file, name, input] => (file.clone(), name.clone(), Some(input.clone())),
        _ => bail!("usage: check_params [--nested|--pointer] [--full] [--context NAME] SCHEMA_FILE SCHEMA_NAME [INPUT.json]"),
    };

    let catalog = Catalog::load(&schema_file, &TypeRegistry::standard())
        .with_context(|| format!("loading {}", schema_file))?;
    let schema = catalog.schema(&schema_name)?;

    let source = match &input_file {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s)?;
            s
        }
    };
    let untrusted = UntrustedParams::from_json(&source).context("parsing input JSON")?;

    let mut params = Params::new(schema, untrusted)?;
    let valid = params.valid_in(context.as_deref());

    let report = if valid {
        json!({ "valid": true, "attributes": params.attributes(KeyForm::String) })
    } else {
        let errors = match layout {
            Layout::Flat => serde_json::to_value(params.errors().as_presentation(false, full))?,
            Layout::Nested => serde_json::to_value(params.errors().as_presentation(true, full))?,
            Layout::Pointer if full => serde_json::to_value(params.full_messages_by_pointer())?,
            Layout::Pointer => serde_json::to_value(params.messages_by_pointer())?,
        };
        json!({ "valid": false, "errors": errors })
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}
