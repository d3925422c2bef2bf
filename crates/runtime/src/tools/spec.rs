//! Parameter declarations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The declared kind of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Text,
    Integer,
    Float,
    /// Text restricted to a closed set of alternatives.
    EnumeratedText,
}

impl ParamKind {
    /// The JSON Schema `type` for this kind.
    pub fn json_type(self) -> &'static str {
        match self {
            Self::Text | Self::EnumeratedText => "string",
            Self::Integer => "integer",
            Self::Float => "number",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::EnumeratedText => "enumerated-text",
        };
        f.write_str(name)
    }
}

/// A validated, coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    /// Whether this value can stand for a parameter of `kind`.
    ///
    /// Integers are accepted where floats are declared.
    pub fn fits(&self, kind: ParamKind) -> bool {
        match (self, kind) {
            (Self::Text(_), ParamKind::Text | ParamKind::EnumeratedText) => true,
            (Self::Integer(_), ParamKind::Integer | ParamKind::Float) => true,
            (Self::Float(_), ParamKind::Float) => true,
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    pub max: f64,
}

impl NumericRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Declaration of one tool argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: Option<String>,
    pub allowed_values: Vec<String>,
    pub numeric_range: Option<NumericRange>,
    pub default: Option<ParamValue>,
    optional: bool,
}

impl ParameterSpec {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            allowed_values: Vec::new(),
            numeric_range: None,
            default: None,
            optional: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Text)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Float)
    }

    /// A text parameter restricted to `values`, kept in the given order.
    pub fn one_of<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = Self::new(name, ParamKind::EnumeratedText);
        for value in values {
            let value = value.into();
            if !spec.allowed_values.contains(&value) {
                spec.allowed_values.push(value);
            }
        }
        spec
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark the parameter as not required even though it has no default.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.numeric_range = Some(NumericRange { min, max });
        self
    }

    /// A parameter is required iff it has no default and is not optional.
    pub fn is_required(&self) -> bool {
        self.default.is_none() && !self.optional
    }
}
