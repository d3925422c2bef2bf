use thiserror::Error;

use super::ParamKind;

/// A malformed tool declaration, raised at registration time.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("tool name must not be empty")]
    EmptyToolName,

    #[error("duplicate parameter '{0}'")]
    DuplicateParameter(String),

    #[error("parameter '{0}' has an empty set of allowed values")]
    EmptyAllowedValues(String),

    #[error("parameter '{name}' has an inverted range: min {min} exceeds max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },

    #[error("parameter '{name}' declares a range but is of kind {kind}")]
    RangeOnNonNumeric { name: String, kind: ParamKind },

    #[error("parameter '{name}' has a default that does not satisfy its declaration: {reason}")]
    InvalidDefault { name: String, reason: String },
}

/// Caller-supplied arguments rejected by a tool descriptor.
///
/// These are recoverable: the registry relays them back to the remote agent
/// so it can correct the call.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' expected a value of kind {expected}")]
    TypeMismatch { name: String, expected: ParamKind },

    #[error("parameter '{name}' must be one of: {}", allowed.join(", "))]
    InvalidEnumValue { name: String, allowed: Vec<String> },

    #[error("parameter '{name}' must be between {min} and {max}")]
    OutOfRange { name: String, min: f64, max: f64 },

    #[error("arguments must be a JSON object")]
    NotAnObject,
}

/// Failure raised by a tool body.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// The tool could not produce a result.
    #[error("{0}")]
    Execution(String),

    /// A tool body asked for an argument the validator did not provide.
    #[error("argument '{0}' is not available")]
    MissingArgument(String),
}

impl ToolError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}
