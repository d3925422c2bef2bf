//! Tool descriptors and their builder.

use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::fmt::Write;

use super::{ParamKind, ParamValue, ParameterSpec, SchemaError};
use crate::model::ToolSpec;

/// Immutable schema of one tool: name, description and ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl ToolDescriptor {
    /// Start building a descriptor.
    ///
    /// # Example
    ///
    /// ```
    /// use runtime::tools::{ParameterSpec, ToolDescriptor};
    ///
    /// let descriptor = ToolDescriptor::builder("get_weather", "Get weather for a city")
    ///     .param(ParameterSpec::text("city").describe("The name of the city"))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(descriptor.parameters().len(), 1);
    /// ```
    pub fn builder(name: impl Into<String>, description: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameters in declaration order.
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// JSON Schema describing the tool's input object.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".into(), json!(param.kind.json_type()));
            if let Some(description) = &param.description {
                prop.insert("description".into(), json!(description));
            }
            if param.kind == ParamKind::EnumeratedText {
                prop.insert("enum".into(), json!(param.allowed_values));
            }
            if let Some(range) = param.numeric_range {
                prop.insert("minimum".into(), json!(range.min));
                prop.insert("maximum".into(), json!(range.max));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.to_json());
            }
            if param.is_required() {
                required.push(Value::from(param.name.as_str()));
            }
            properties.insert(param.name.clone(), Value::Object(prop));
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// The model-facing specification of this tool.
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Human-readable documentation, stable across runs.
    pub fn render_doc(&self) -> String {
        let mut doc = format!("{}\n    {}\n", self.name, self.description);
        for param in &self.parameters {
            let _ = write!(doc, "    - {} ({})", param.name, param.kind);
            if param.kind == ParamKind::EnumeratedText {
                let _ = write!(doc, " one of [{}]", param.allowed_values.join(", "));
            }
            if let Some(range) = param.numeric_range {
                let _ = write!(doc, " in [{}, {}]", range.min, range.max);
            }
            match &param.default {
                Some(default) => {
                    let _ = write!(doc, " default {default}");
                }
                None if param.is_required() => doc.push_str(" required"),
                None => doc.push_str(" optional"),
            }
            if let Some(description) = &param.description {
                let _ = write!(doc, ": {description}");
            }
            doc.push('\n');
        }
        doc
    }
}

/// Builder for [`ToolDescriptor`]. Checks the declaration on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
}

impl DescriptorBuilder {
    /// Declare the next parameter.
    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.parameters.push(spec);
        self
    }

    pub fn build(self) -> Result<ToolDescriptor, SchemaError> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::EmptyToolName);
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(SchemaError::DuplicateParameter(param.name.clone()));
            }
            check_parameter(param)?;
        }

        Ok(ToolDescriptor {
            name: self.name,
            description: self.description,
            parameters: self.parameters,
        })
    }
}

fn check_parameter(param: &ParameterSpec) -> Result<(), SchemaError> {
    if param.kind == ParamKind::EnumeratedText && param.allowed_values.is_empty() {
        return Err(SchemaError::EmptyAllowedValues(param.name.clone()));
    }

    if let Some(range) = param.numeric_range {
        if !param.kind.is_numeric() {
            return Err(SchemaError::RangeOnNonNumeric {
                name: param.name.clone(),
                kind: param.kind,
            });
        }
        if range.min > range.max {
            return Err(SchemaError::InvertedRange {
                name: param.name.clone(),
                min: range.min,
                max: range.max,
            });
        }
    }

    let Some(default) = &param.default else {
        return Ok(());
    };
    let invalid = |reason: String| SchemaError::InvalidDefault {
        name: param.name.clone(),
        reason,
    };

    if !default.fits(param.kind) {
        return Err(invalid(format!("expected {}", param.kind)));
    }
    if let ParamValue::Text(text) = default {
        if param.kind == ParamKind::EnumeratedText && !param.allowed_values.contains(text) {
            return Err(invalid(format!("'{text}' is not an allowed value")));
        }
    }
    if let (Some(range), Some(value)) = (param.numeric_range, default.as_f64()) {
        if !range.contains(value) {
            return Err(invalid(format!("{value} is outside [{}, {}]", range.min, range.max)));
        }
    }
    Ok(())
}
