//! Parse schema DSL source into AST using PEST.

use crate::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Parse schema source into AST.
pub fn parse(source: &str) -> Result<SchemaDocument, String> {
    let pairs = SchemaParser::parse(Rule::document, source).map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_document(pair)
}

fn build_document(pair: Pair<Rule>) -> Result<SchemaDocument, String> {
    let mut schemas = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::schema_section {
            schemas.push(build_schema(inner)?);
        }
    }
    Ok(SchemaDocument { schemas })
}

fn build_schema(pair: Pair<Rule>) -> Result<SchemaDef, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("schema: name")?.as_str().to_string();
    let mut attributes = Vec::new();
    for inner in it {
        if inner.as_rule() == Rule::attribute {
            attributes.push(build_attribute(inner)?);
        }
    }
    Ok(SchemaDef { name, attributes })
}

fn build_attribute(pair: Pair<Rule>) -> Result<AttributeDef, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("attribute: name")?.as_str().to_string();
    let type_ref = build_type_ref(it.next().ok_or_else(|| format!("attribute {}: type", name))?)?;
    let mut rules = Vec::new();
    if let Some(list) = it.next() {
        for rule in list.into_inner() {
            rules.push(build_rule(rule)?);
        }
    }
    Ok(AttributeDef { name, type_ref, rules })
}

fn build_type_ref(pair: Pair<Rule>) -> Result<TypeRef, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("type: name")?.as_str().to_string();
    let argument = it.next().map(|p| p.as_str().to_string());
    Ok(TypeRef { name, argument })
}

fn build_rule(pair: Pair<Rule>) -> Result<RuleDef, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("rule: name")?.as_str().to_string();
    let mut args = Vec::new();
    for arg in it {
        args.push(build_rule_arg(arg)?);
    }
    Ok(RuleDef { name, args })
}

fn build_rule_arg(pair: Pair<Rule>) -> Result<RuleArg, String> {
    let mut name = None;
    let mut value = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = Some(inner.as_str().to_string()),
            _ => value = Some(build_literal(inner)?),
        }
    }
    let value = value.ok_or("rule argument: value")?;
    Ok(RuleArg { name, value })
}

fn build_literal(pair: Pair<Rule>) -> Result<Literal, String> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::int => text
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|e| format!("integer {}: {}", text, e)),
        Rule::float => text
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|e| format!("float {}: {}", text, e)),
        Rule::bool => Ok(Literal::Bool(text == "true")),
        Rule::string => {
            let inner = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Literal::String(unescape(inner)))
        }
        Rule::range => {
            let mut it = pair.into_inner();
            let lo = it.next().ok_or("range: start")?.as_str();
            let hi = it.next().ok_or("range: end")?.as_str();
            let lo = lo.parse::<i64>().map_err(|e| format!("range {}: {}", text, e))?;
            let hi = hi.parse::<i64>().map_err(|e| format!("range {}: {}", text, e))?;
            if lo > hi {
                return Err(format!("range {}: start after end", text));
            }
            Ok(Literal::Range(lo, hi))
        }
        other => Err(format!("unexpected literal {:?}", other)),
    }
}

/// Resolve `\"`, `\\`, `\n` and `\t`; other escapes (e.g. `\d` in patterns) are kept.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_keeps_pattern_escapes() {
        assert_eq!(unescape(r#"^\d{3}-\d{4}$"#), r"^\d{3}-\d{4}$");
        assert_eq!(unescape(r#"say \"hi\"\n"#), "say \"hi\"\n");
        assert_eq!(unescape(r"a\\b"), r"a\b");
    }

    #[test]
    fn parses_attribute_with_rules() {
        let doc = parse(
            r#"
            schema Hobby {
                name: string [presence];
                level: integer [inclusion(1..3), numericality(gte: 0, message: "bad")];
            }
            "#,
        )
        .unwrap();
        let hobby = doc.get("Hobby").unwrap();
        assert_eq!(hobby.attributes.len(), 2);
        let level = &hobby.attributes[1];
        assert_eq!(level.type_ref, TypeRef { name: "integer".to_string(), argument: None });
        assert_eq!(level.rules[0].positional().next(), Some(&Literal::Range(1, 3)));
        assert_eq!(level.rules[1].named("gte"), Some(&Literal::Int(0)));
        assert_eq!(level.rules[1].named("message"), Some(&Literal::String("bad".to_string())));
    }

    #[test]
    fn parses_type_arguments_and_literals() {
        let doc = parse("schema U { tags: array<string> [length(max: 3), inclusion(1.5, true, -2)]; }").unwrap();
        let tags = &doc.schemas[0].attributes[0];
        assert_eq!(tags.type_ref.argument.as_deref(), Some("string"));
        let values: Vec<_> = tags.rules[1].positional().cloned().collect();
        assert_eq!(values, vec![Literal::Float(1.5), Literal::Bool(true), Literal::Int(-2)]);
    }

    #[test]
    fn rejects_malformed_source() {
        assert!(parse("schema { }").is_err());
        assert!(parse("schema A { name string; }").is_err());
        assert!(parse("schema A { n: integer [inclusion(3..1)]; }").is_err());
    }
}
