//! Schema DSL fuzz target: feed arbitrary bytes to the parser and resolver.
//! Neither may panic; both return Ok or an error value.
//! Build with: cargo fuzz run parser_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(doc) = structparams::parse(s) {
        let _ = structparams::Catalog::resolve(&doc, &structparams::TypeRegistry::standard());
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run parser_fuzz");
}
