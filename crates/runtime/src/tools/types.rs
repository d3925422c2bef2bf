//! Invocation request and result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// One request to execute a tool, as received from the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub tool_name: String,
    /// Loosely-typed arguments keyed by parameter name.
    pub arguments: Value,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Why an invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ToolNotFound,
    InvalidArguments,
    ExecutionError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ToolNotFound => "tool not found",
            Self::InvalidArguments => "invalid arguments",
            Self::ExecutionError => "execution error",
        };
        f.write_str(name)
    }
}

/// Outcome of one invocation. Every failure mode is represented as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationResult {
    Success { payload: String },
    Failure { kind: FailureKind, message: String },
}

impl InvocationResult {
    pub fn success(payload: impl Into<String>) -> Self {
        Self::Success {
            payload: payload.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl fmt::Display for InvocationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { payload } => f.write_str(payload),
            Self::Failure { kind, message } => write!(f, "{kind}: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_relays_payload_or_failure() {
        assert_eq!(InvocationResult::success("72F").to_string(), "72F");
        let failure = InvocationResult::failure(FailureKind::ToolNotFound, "get_tides");
        assert_eq!(failure.to_string(), "tool not found: get_tides");
        assert_eq!(failure.failure_kind(), Some(FailureKind::ToolNotFound));
    }
}
