//! Built-in primitive types: string, integer, float, boolean and a passthrough `value`.

use super::{Typed, TypedValue};
use crate::input::Input;
use crate::params::ParamsError;
use crate::value::Value;

const FALSE_STRINGS: &[&str] = &["false", "f", "0", "off", "no", "n"];

fn cast_error(expected: &str, raw: &Input) -> ParamsError {
    ParamsError::Cast {
        expected: expected.to_string(),
        found: raw.kind(),
    }
}

/// Scalar payload of an input, or a cast error for compound shapes.
fn scalar<'a>(expected: &str, raw: &'a Input) -> Result<&'a Value, ParamsError> {
    match raw {
        Input::Scalar(v) => Ok(v),
        other => Err(cast_error(expected, other)),
    }
}

/// Truncate toward zero; `None` outside the `i64` range or for NaN.
fn truncate_to_i64(x: f64) -> Option<i64> {
    let t = x.trunc();
    (t >= i64::MIN as f64 && t < i64::MAX as f64).then_some(t as i64)
}

fn serialize_scalar(value: &Typed) -> Value {
    match value {
        Typed::Nil => Value::Null,
        other => other.to_plain(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl TypedValue for StringType {
    fn type_tag(&self) -> &str {
        "string"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        if raw.is_nil() {
            return Ok(Typed::Nil);
        }
        let text = match scalar(self.type_tag(), &raw)? {
            Value::Bool(true) => "t".to_string(),
            Value::Bool(false) => "f".to_string(),
            v => v.to_text(),
        };
        Ok(Typed::Scalar(Value::String(text)))
    }

    fn serialize(&self, value: &Typed) -> Value {
        serialize_scalar(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl TypedValue for IntegerType {
    fn type_tag(&self) -> &str {
        "integer"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        if raw.is_nil() {
            return Ok(Typed::Nil);
        }
        let n = match scalar(self.type_tag(), &raw)? {
            Value::Int(x) => *x,
            Value::Float(x) => truncate_to_i64(*x).ok_or_else(|| cast_error(self.type_tag(), &raw))?,
            Value::Bool(b) => i64::from(*b),
            Value::String(s) if s.trim().is_empty() => return Ok(Typed::Nil),
            Value::String(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(x) => x,
                    Err(_) => s
                        .parse::<f64>()
                        .ok()
                        .and_then(truncate_to_i64)
                        .ok_or_else(|| cast_error(self.type_tag(), &raw))?,
                }
            }
            _ => return Err(cast_error(self.type_tag(), &raw)),
        };
        Ok(Typed::Scalar(Value::Int(n)))
    }

    fn serialize(&self, value: &Typed) -> Value {
        serialize_scalar(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FloatType;

impl TypedValue for FloatType {
    fn type_tag(&self) -> &str {
        "float"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        if raw.is_nil() {
            return Ok(Typed::Nil);
        }
        let x = match scalar(self.type_tag(), &raw)? {
            Value::Int(x) => *x as f64,
            Value::Float(x) => *x,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::String(s) if s.trim().is_empty() => return Ok(Typed::Nil),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| cast_error(self.type_tag(), &raw))?,
            _ => return Err(cast_error(self.type_tag(), &raw)),
        };
        Ok(Typed::Scalar(Value::Float(x)))
    }

    fn serialize(&self, value: &Typed) -> Value {
        serialize_scalar(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl TypedValue for BooleanType {
    fn type_tag(&self) -> &str {
        "boolean"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        if raw.is_nil() {
            return Ok(Typed::Nil);
        }
        let b = match scalar(self.type_tag(), &raw)? {
            Value::Bool(b) => *b,
            Value::Int(x) => *x != 0,
            Value::Float(x) => *x != 0.0,
            Value::String(s) if s.trim().is_empty() => return Ok(Typed::Nil),
            Value::String(s) => {
                let lowered = s.trim().to_ascii_lowercase();
                !FALSE_STRINGS.contains(&lowered.as_str())
            }
            _ => return Err(cast_error(self.type_tag(), &raw)),
        };
        Ok(Typed::Scalar(Value::Bool(b)))
    }

    fn serialize(&self, value: &Typed) -> Value {
        serialize_scalar(value)
    }
}

/// Accepts any input and keeps it as a plain value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueType;

impl TypedValue for ValueType {
    fn type_tag(&self) -> &str {
        "value"
    }

    fn cast(&self, raw: Input) -> Result<Typed, ParamsError> {
        Ok(match raw.into_value() {
            Value::Null => Typed::Nil,
            v => Typed::Scalar(v),
        })
    }

    fn serialize(&self, value: &Typed) -> Value {
        serialize_scalar(value)
    }
}
