//! Benchmark: construct and validate a user with many nested hobbies, and
//! render the resulting errors flat and nested.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use structparams::{Catalog, KeyForm, Params, TypeRegistry, UntrustedParams};

const SCHEMAS: &str = r#"
schema Address {
    postal_code: string [presence, format("^\d{3}-\d{4}$")];
    city: string [presence];
}

schema Hobby {
    name: string [presence];
    level: integer [inclusion(1..3)];
    years_experience: integer [numericality(gte: 0)];
}

schema User {
    name: string [presence, length(max: 50)];
    age: integer [numericality(gt: 0)];
    address: object<Address>;
    hobbies: array<Hobby>;
    tags: array<string>;
}
"#;

fn user_input(hobbies: usize) -> serde_json::Value {
    let hobbies: Vec<_> = (0..hobbies)
        .map(|i| {
            // Every third hobby is invalid.
            if i % 3 == 0 {
                json!({"name": "", "level": 5, "years_experience": -1})
            } else {
                json!({"name": format!("hobby {}", i), "level": 1 + (i % 3) as i64, "years_experience": i})
            }
        })
        .collect();
    json!({
        "name": "Tanaka Taro",
        "age": 30,
        "address": {"postal_code": "123-4567", "city": "Shibuya"},
        "hobbies": hobbies,
        "tags": ["a", "b", "c"]
    })
}

fn bench_validate_nested(c: &mut Criterion) {
    let catalog = Catalog::from_source(SCHEMAS, &TypeRegistry::standard()).expect("schemas");
    let user = catalog.schema("User").expect("User").clone();
    let input = user_input(200);

    c.bench_function("construct_user_200_hobbies", |b| {
        b.iter(|| Params::new(&user, black_box(input.clone())).expect("construct"))
    });

    c.bench_function("construct_untrusted_user_200_hobbies", |b| {
        b.iter(|| Params::new(&user, UntrustedParams::from(black_box(input.clone()))).expect("construct"))
    });

    let params = Params::new(&user, input.clone()).expect("construct");
    c.bench_function("validate_user_200_hobbies", |b| {
        b.iter(|| {
            let mut p = params.clone();
            black_box(p.valid())
        })
    });

    let mut validated = params.clone();
    validated.valid();
    c.bench_function("errors_flat_and_nested", |b| {
        b.iter(|| {
            let errors = validated.errors();
            black_box((errors.to_flat(true), errors.to_nested(false)))
        })
    });

    c.bench_function("attributes_user_200_hobbies", |b| {
        b.iter(|| black_box(params.attributes(KeyForm::Symbol)))
    });
}

criterion_group!(benches, bench_validate_nested);
criterion_main!(benches);
