//! Per-attribute validation rules and the executor that runs them.
//!
//! Rules write failures into the entity's own [`Errors`] at the bare attribute
//! name. Nested entities are validated separately by [`Params`].

use crate::ast::{Literal, RuleDef};
use crate::errors::Errors;
use crate::params::Params;
use crate::schema::SchemaError;
use crate::types::Typed;
use crate::value::Value;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone)]
pub enum Allowed {
    Values(Vec<Value>),
    /// Inclusive integer range.
    Range(i64, i64),
}

impl Allowed {
    fn contains(&self, value: &Typed) -> bool {
        let Some(v) = value.as_scalar() else {
            return false;
        };
        match self {
            Allowed::Values(values) => values.iter().any(|a| same_value(a, v)),
            Allowed::Range(min, max) => number_of(v).is_some_and(|n| n >= *min as f64 && n <= *max as f64),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Numericality {
    pub only_integer: bool,
    pub gt: Option<f64>,
    pub gte: Option<f64>,
    pub lt: Option<f64>,
    pub lte: Option<f64>,
    pub eq: Option<f64>,
}

#[derive(Debug, Clone)]
pub enum RuleKind {
    Presence,
    Absence,
    Format(Regex),
    Length {
        min: Option<usize>,
        max: Option<usize>,
        is: Option<usize>,
    },
    Numericality(Numericality),
    Inclusion(Allowed),
    Exclusion(Allowed),
}

/// A rule with its options.
#[derive(Debug, Clone)]
pub struct Rule {
    pub kind: RuleKind,
    /// Only run in this validation context.
    pub on: Option<String>,
    /// Replaces the default message.
    pub message: Option<String>,
    pub allow_nil: bool,
}

impl From<RuleKind> for Rule {
    fn from(kind: RuleKind) -> Self {
        Rule {
            kind,
            on: None,
            message: None,
            allow_nil: false,
        }
    }
}

impl Rule {
    pub fn presence() -> Self {
        RuleKind::Presence.into()
    }

    pub fn absence() -> Self {
        RuleKind::Absence.into()
    }

    pub fn format(pattern: &str) -> Result<Self, SchemaError> {
        let re = Regex::new(pattern).map_err(|e| SchemaError::InvalidRule(format!("format: {}", e)))?;
        Ok(RuleKind::Format(re).into())
    }

    pub fn length(min: Option<usize>, max: Option<usize>) -> Self {
        RuleKind::Length { min, max, is: None }.into()
    }

    pub fn numericality(n: Numericality) -> Self {
        RuleKind::Numericality(n).into()
    }

    pub fn inclusion(allowed: Allowed) -> Self {
        RuleKind::Inclusion(allowed).into()
    }

    pub fn exclusion(allowed: Allowed) -> Self {
        RuleKind::Exclusion(allowed).into()
    }

    pub fn on(mut self, context: &str) -> Self {
        self.on = Some(context.to_string());
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn allow_nil(mut self) -> Self {
        self.allow_nil = true;
        self
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            RuleKind::Presence => "presence",
            RuleKind::Absence => "absence",
            RuleKind::Format(_) => "format",
            RuleKind::Length { .. } => "length",
            RuleKind::Numericality(_) => "numericality",
            RuleKind::Inclusion(_) => "inclusion",
            RuleKind::Exclusion(_) => "exclusion",
        }
    }

    /// Build a rule from its DSL form.
    pub fn from_definition(def: &RuleDef) -> Result<Self, SchemaError> {
        let mut rule: Rule = match def.name.as_str() {
            "presence" => RuleKind::Presence.into(),
            "absence" => RuleKind::Absence.into(),
            "format" => {
                let pattern = def
                    .named("with")
                    .or_else(|| def.positional().next())
                    .and_then(Literal::as_str)
                    .ok_or_else(|| SchemaError::InvalidRule("format: expected a pattern string".to_string()))?;
                Rule::format(pattern)?
            }
            "length" => {
                let size = |keys: &[&str]| -> Result<Option<usize>, SchemaError> {
                    match keys.iter().find_map(|k| def.named(k)) {
                        None => Ok(None),
                        Some(l) => l
                            .as_i64()
                            .and_then(|n| usize::try_from(n).ok())
                            .map(Some)
                            .ok_or_else(|| SchemaError::InvalidRule(format!("length: bad size {:?}", l))),
                    }
                };
                let min = size(&["min", "minimum"])?;
                let max = size(&["max", "maximum"])?;
                let is = size(&["is"])?;
                if min.is_none() && max.is_none() && is.is_none() {
                    return Err(SchemaError::InvalidRule("length: expected min, max or is".to_string()));
                }
                RuleKind::Length { min, max, is }.into()
            }
            "numericality" => {
                let bound = |keys: &[&str]| -> Result<Option<f64>, SchemaError> {
                    match keys.iter().find_map(|k| def.named(k)) {
                        None => Ok(None),
                        Some(l) => l
                            .as_f64()
                            .map(Some)
                            .ok_or_else(|| SchemaError::InvalidRule(format!("numericality: bad bound {:?}", l))),
                    }
                };
                RuleKind::Numericality(Numericality {
                    only_integer: def.named("only_integer").and_then(Literal::as_bool).unwrap_or(false),
                    gt: bound(&["gt", "greater_than"])?,
                    gte: bound(&["gte", "greater_than_or_equal_to"])?,
                    lt: bound(&["lt", "less_than"])?,
                    lte: bound(&["lte", "less_than_or_equal_to"])?,
                    eq: bound(&["eq", "equal_to"])?,
                })
                .into()
            }
            "inclusion" => RuleKind::Inclusion(allowed_from(def)?).into(),
            "exclusion" => RuleKind::Exclusion(allowed_from(def)?).into(),
            other => return Err(SchemaError::InvalidRule(format!("unknown rule '{}'", other))),
        };
        for arg in &def.args {
            match arg.name.as_deref() {
                Some("on") => rule.on = arg.value.as_str().map(str::to_string),
                Some("message") => rule.message = arg.value.as_str().map(str::to_string),
                Some("allow_nil") => rule.allow_nil = arg.value.as_bool().unwrap_or(false),
                _ => {}
            }
        }
        Ok(rule)
    }

    /// Whether the rule runs in the given validation context.
    pub fn applies_in(&self, context: Option<&str>) -> bool {
        match &self.on {
            None => true,
            Some(on) => context == Some(on.as_str()),
        }
    }

    /// Check a cast value; the error is the default failure message.
    pub fn check(&self, value: &Typed) -> Result<(), String> {
        match &self.kind {
            RuleKind::Presence => {
                if value.is_blank() {
                    return Err("can't be blank".to_string());
                }
            }
            RuleKind::Absence => {
                if !value.is_blank() {
                    return Err("must be blank".to_string());
                }
            }
            RuleKind::Format(re) => {
                let text = match value {
                    Typed::Nil => String::new(),
                    Typed::Scalar(v) => v.to_text(),
                    _ => return Err("is invalid".to_string()),
                };
                if !re.is_match(&text) {
                    return Err("is invalid".to_string());
                }
            }
            RuleKind::Length { min, max, is } => {
                let len = match value {
                    Typed::Nil => 0,
                    Typed::Scalar(v) => v.to_text().chars().count(),
                    Typed::List(items) => items.len(),
                    Typed::Entity(_) => return Ok(()),
                };
                if let Some(n) = is {
                    if len != *n {
                        return Err(format!("is the wrong length (should be {})", characters(*n)));
                    }
                }
                if let Some(n) = min {
                    if len < *n {
                        return Err(format!("is too short (minimum is {})", characters(*n)));
                    }
                }
                if let Some(n) = max {
                    if len > *n {
                        return Err(format!("is too long (maximum is {})", characters(*n)));
                    }
                }
            }
            RuleKind::Numericality(n) => check_number(n, value)?,
            RuleKind::Inclusion(allowed) => {
                if !allowed.contains(value) {
                    return Err("is not included in the list".to_string());
                }
            }
            RuleKind::Exclusion(allowed) => {
                if allowed.contains(value) {
                    return Err("is reserved".to_string());
                }
            }
        }
        Ok(())
    }
}

fn allowed_from(def: &RuleDef) -> Result<Allowed, SchemaError> {
    let literals: Vec<&Literal> = match def.named("in") {
        Some(l) => vec![l],
        None => def.positional().collect(),
    };
    match literals.as_slice() {
        [] => Err(SchemaError::InvalidRule(format!("{}: expected values or a range", def.name))),
        [Literal::Range(a, b)] => Ok(Allowed::Range(*a, *b)),
        many => many
            .iter()
            .map(|l| {
                l.to_value()
                    .ok_or_else(|| SchemaError::InvalidRule(format!("{}: ranges cannot be mixed with values", def.name)))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Allowed::Values),
    }
}

fn characters(n: usize) -> String {
    if n == 1 {
        "1 character".to_string()
    } else {
        format!("{} characters", n)
    }
}

struct Number(f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Int(x) => Some(*x as f64),
        Value::Float(x) => Some(*x),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_integer(v: &Value) -> bool {
    match v {
        Value::Int(_) => true,
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

fn check_number(n: &Numericality, value: &Typed) -> Result<(), String> {
    let raw = value.as_scalar().ok_or_else(|| "is not a number".to_string())?;
    let x = number_of(raw).ok_or_else(|| "is not a number".to_string())?;
    if n.only_integer && !is_integer(raw) {
        return Err("must be an integer".to_string());
    }
    if let Some(b) = n.gt {
        if x <= b {
            return Err(format!("must be greater than {}", Number(b)));
        }
    }
    if let Some(b) = n.gte {
        if x < b {
            return Err(format!("must be greater than or equal to {}", Number(b)));
        }
    }
    if let Some(b) = n.lt {
        if x >= b {
            return Err(format!("must be less than {}", Number(b)));
        }
    }
    if let Some(b) = n.lte {
        if x > b {
            return Err(format!("must be less than or equal to {}", Number(b)));
        }
    }
    if let Some(b) = n.eq {
        if x != b {
            return Err(format!("must be equal to {}", Number(b)));
        }
    }
    Ok(())
}

/// Run every declared rule and custom validator of `params`.
pub(crate) fn run(params: &Params, context: Option<&str>, errors: &mut Errors) {
    for attribute in params.schema().attributes() {
        let value = params.get(attribute.name()).unwrap_or(&Typed::Nil);
        for rule in attribute.rules() {
            if !rule.applies_in(context) || (rule.allow_nil && value.is_nil()) {
                continue;
            }
            if let Err(default) = rule.check(value) {
                let message = rule.message.clone().unwrap_or(default);
                tracing::trace!(attribute = attribute.name(), rule = rule.name(), %message, "rule failed");
                errors.add(attribute.name(), message);
            }
        }
    }
    for validator in params.schema().validators() {
        validator(params, context, errors);
    }
}
