use super::errors::ModelError;
use crate::tools::{InvocationRequest, InvocationResult};
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

/// Who authored a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// A tool invocation requested by the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier used to correlate the result.
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    pub fn to_request(&self) -> InvocationRequest {
        InvocationRequest::new(self.name.clone(), self.input.clone())
    }
}

/// The result relayed back to the remote agent for one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: InvocationResult,
}

/// A part of a turn, which can be text or a tool interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// One entry of a session's append-only history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Position within the session; strictly increasing, never reused.
    pub position: u64,
    pub role: Role,
    pub parts: Vec<Part>,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(position: u64, role: Role, parts: Vec<Part>) -> Self {
        Self {
            position,
            role,
            parts,
            at: Utc::now(),
        }
    }

    /// Textual content: text parts joined, tool results rendered.
    pub fn content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.clone()),
                Part::ToolResult(result) => Some(result.result.to_string()),
                Part::ToolCall(_) => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all tool calls from this turn.
    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}

/// A tool definition as presented to the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total_tokens(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    pub fn add(&mut self, other: Usage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
    }
}

/// Everything needed for one request to the remote agent.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub tools: Vec<ToolSpec>,
}

/// One decoded element of the remote agent's streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of natural-language text.
    Text(String),
    /// A complete tool invocation request.
    ToolCall(ToolCall),
    /// Token usage reported by the provider.
    Usage(Usage),
}

/// Forward-only sequence of stream events; ends when the reply is complete.
pub type EventStream = BoxStream<'static, Result<StreamEvent, ModelError>>;

/// Transport to the hosted agent runtime.
pub trait Backend: Send + Sync {
    /// Open a streaming request.
    fn open(
        &self,
        request: ModelRequest,
    ) -> impl Future<Output = Result<EventStream, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FailureKind;

    #[test]
    fn turn_content_joins_text_and_results() {
        let turn = ConversationTurn::new(
            0,
            Role::Agent,
            vec![
                Part::Text { text: "Hello ".into() },
                Part::ToolCall(ToolCall {
                    id: "1".into(),
                    name: "test".into(),
                    input: Value::Null,
                }),
                Part::Text { text: "world".into() },
            ],
        );
        assert_eq!(turn.content(), "Hello world");
        assert_eq!(turn.tool_calls().len(), 1);

        let tool = ConversationTurn::new(
            1,
            Role::Tool,
            vec![Part::ToolResult(ToolResult {
                tool_call_id: "1".into(),
                result: InvocationResult::failure(FailureKind::ToolNotFound, "test"),
            })],
        );
        assert_eq!(tool.content(), "tool not found: test");
    }

    #[test]
    fn usage_accumulates() {
        let mut usage = Usage::default();
        usage.add(Usage {
            input_tokens: 100,
            output_tokens: 50,
        });
        usage.add(Usage {
            input_tokens: 10,
            output_tokens: 5,
        });
        assert_eq!(usage.total_tokens(), 165);
    }
}
