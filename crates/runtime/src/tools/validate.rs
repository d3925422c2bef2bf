//! Argument validation and coercion.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{ParamKind, ParamValue, ParameterSpec, ToolDescriptor, ToolError, ValidationError};

/// Arguments that passed validation, coerced to their declared kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(HashMap<String, ParamValue>);

impl Arguments {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A text or enumerated-text argument.
    pub fn text(&self, name: &str) -> Result<&str, ToolError> {
        self.get(name)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }

    pub fn integer(&self, name: &str) -> Result<i64, ToolError> {
        match self.get(name) {
            Some(ParamValue::Integer(i)) => Ok(*i),
            _ => Err(ToolError::MissingArgument(name.to_string())),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, ToolError> {
        self.get(name)
            .and_then(ParamValue::as_f64)
            .ok_or_else(|| ToolError::MissingArgument(name.to_string()))
    }
}

impl FromIterator<(String, ParamValue)> for Arguments {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Check `raw` against `descriptor`, substituting defaults and coercing values.
///
/// Undeclared keys are ignored. The first failing parameter, in declaration
/// order, determines the error.
pub fn validate(descriptor: &ToolDescriptor, raw: &Value) -> Result<Arguments, ValidationError> {
    let empty = Map::new();
    let object = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(ValidationError::NotAnObject),
    };

    let mut arguments = HashMap::with_capacity(descriptor.parameters().len());
    for param in descriptor.parameters() {
        match object.get(&param.name).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = coerce(param, value)?;
                check_constraints(param, &coerced)?;
                arguments.insert(param.name.clone(), coerced);
            }
            None => {
                if let Some(default) = &param.default {
                    arguments.insert(param.name.clone(), default.clone());
                } else if param.is_required() {
                    return Err(ValidationError::MissingParameter(param.name.clone()));
                }
            }
        }
    }
    Ok(Arguments(arguments))
}

fn coerce(param: &ParameterSpec, value: &Value) -> Result<ParamValue, ValidationError> {
    let mismatch = || ValidationError::TypeMismatch {
        name: param.name.clone(),
        expected: param.kind,
    };

    match param.kind {
        // Scalars render as text; enum membership is checked afterwards.
        ParamKind::Text | ParamKind::EnumeratedText => match value {
            Value::String(s) => Ok(ParamValue::Text(s.clone())),
            Value::Number(n) => Ok(ParamValue::Text(n.to_string())),
            Value::Bool(b) => Ok(ParamValue::Text(b.to_string())),
            _ => Err(mismatch()),
        },
        ParamKind::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(ParamValue::Integer(i))
                } else {
                    n.as_f64().and_then(whole_number).ok_or_else(mismatch)
                }
            }
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .map(ParamValue::Integer)
                    .or_else(|_| s.parse::<f64>().ok().and_then(whole_number).ok_or(()))
                    .map_err(|_| mismatch())
            }
            _ => Err(mismatch()),
        },
        ParamKind::Float => {
            let parsed = match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            parsed
                .filter(|f| f.is_finite())
                .map(ParamValue::Float)
                .ok_or_else(mismatch)
        }
    }
}

fn whole_number(f: f64) -> Option<ParamValue> {
    let in_bounds = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_bounds).then(|| ParamValue::Integer(f as i64))
}

fn check_constraints(param: &ParameterSpec, value: &ParamValue) -> Result<(), ValidationError> {
    if param.kind == ParamKind::EnumeratedText {
        let member = value
            .as_str()
            .is_some_and(|s| param.allowed_values.iter().any(|a| a == s));
        if !member {
            return Err(ValidationError::InvalidEnumValue {
                name: param.name.clone(),
                allowed: param.allowed_values.clone(),
            });
        }
    }

    if let (Some(range), Some(number)) = (param.numeric_range, value.as_f64()) {
        if !range.contains(number) {
            return Err(ValidationError::OutOfRange {
                name: param.name.clone(),
                min: range.min,
                max: range.max,
            });
        }
    }
    Ok(())
}
