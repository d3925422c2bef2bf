//! Streaming HTTP backend speaking the Messages wire format.

use futures_util::{StreamExt, TryStreamExt, future};
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::BufReader;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::sse::{SseEvent, sse_events};
use crate::model::{
    Backend, ConversationTurn, EventStream, ModelError, ModelRequest, Part, Role, StreamEvent,
    ToolCall, ToolSpec, Usage,
};
use crate::tools::InvocationResult;

const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// How requests authenticate against the endpoint.
///
/// Credentials are acquired elsewhere; this only decides how they travel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Auth {
    /// No credentials (e.g. a local gateway).
    #[default]
    None,
    /// Sent as an `x-api-key` header.
    ApiKey(String),
    /// Sent as an `Authorization: Bearer` header.
    Bearer(String),
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::ApiKey(_) => write!(f, "api_key"),
            Self::Bearer(_) => write!(f, "bearer"),
        }
    }
}

impl Auth {
    fn apply_headers(&self, req: RequestBuilder) -> RequestBuilder {
        match self {
            Self::None => req,
            Self::ApiKey(key) => req.header("x-api-key", key),
            Self::Bearer(token) => req.header("Authorization", format!("Bearer {token}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    stream: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiStreamBlock {
    ToolUse {
        id: String,
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiStreamEvent {
    MessageStart { message: ApiStartMessage },
    ContentBlockStart { content_block: ApiStreamBlock },
    ContentBlockDelta { delta: ApiDelta },
    ContentBlockStop,
    MessageDelta { usage: Option<ApiUsage> },
    Error { error: ApiErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiStartMessage {
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Tool-use block being assembled from `input_json_delta` fragments.
#[derive(Debug, Default)]
struct PendingToolUse {
    id: String,
    name: String,
    json: String,
}

#[derive(Debug, Default)]
struct StreamDecoder {
    tool: Option<PendingToolUse>,
}

impl StreamDecoder {
    fn decode(&mut self, event: SseEvent) -> Result<Option<StreamEvent>, ModelError> {
        let parsed: ApiStreamEvent = serde_json::from_str(&event.data)
            .map_err(|e| ModelError::InvalidResponse(format!("{e}: {}", event.data)))?;

        Ok(match parsed {
            ApiStreamEvent::MessageStart { message } => message.usage.map(|u| {
                StreamEvent::Usage(Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                })
            }),
            ApiStreamEvent::ContentBlockStart { content_block } => {
                if let ApiStreamBlock::ToolUse { id, name } = content_block {
                    self.tool = Some(PendingToolUse {
                        id,
                        name,
                        json: String::new(),
                    });
                }
                None
            }
            ApiStreamEvent::ContentBlockDelta { delta } => match delta {
                ApiDelta::TextDelta { text } if !text.is_empty() => Some(StreamEvent::Text(text)),
                ApiDelta::InputJsonDelta { partial_json } => {
                    if let Some(tool) = self.tool.as_mut() {
                        tool.json.push_str(&partial_json);
                    }
                    None
                }
                _ => None,
            },
            ApiStreamEvent::ContentBlockStop => match self.tool.take() {
                Some(tool) => {
                    let input = if tool.json.trim().is_empty() {
                        Value::Object(Default::default())
                    } else {
                        serde_json::from_str(&tool.json).map_err(|e| {
                            ModelError::InvalidResponse(format!("tool input for {}: {e}", tool.name))
                        })?
                    };
                    Some(StreamEvent::ToolCall(ToolCall {
                        id: tool.id,
                        name: tool.name,
                        input,
                    }))
                }
                None => None,
            },
            ApiStreamEvent::MessageDelta { usage } => usage.map(|u| {
                StreamEvent::Usage(Usage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                })
            }),
            ApiStreamEvent::Error { error } => return Err(ModelError::Api(error.message)),
            ApiStreamEvent::Other => None,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackendBuilder {
    endpoint: String,
    model: String,
    auth: Auth,
    max_tokens: u32,
}

impl HttpBackendBuilder {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            auth: Auth::None,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> HttpBackend {
        HttpBackend {
            client: reqwest::Client::new(),
            endpoint: self.endpoint,
            model: self.model,
            auth: self.auth,
            max_tokens: self.max_tokens,
        }
    }
}

/// Backend that streams replies from a hosted agent endpoint over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    auth: Auth,
    max_tokens: u32,
}

impl HttpBackend {
    pub fn builder(endpoint: impl Into<String>, model: impl Into<String>) -> HttpBackendBuilder {
        HttpBackendBuilder::new(endpoint, model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::User | Role::Tool => "user",
            Role::Agent => "assistant",
        }
    }

    fn part_to_api(part: &Part) -> ApiContentBlock {
        match part {
            Part::Text { text } => ApiContentBlock::Text { text: text.clone() },
            Part::ToolCall(call) => ApiContentBlock::ToolUse {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.input.clone(),
            },
            Part::ToolResult(result) => {
                let (content, is_error) = match &result.result {
                    InvocationResult::Success { payload } => (payload.clone(), false),
                    failure => (failure.to_string(), true),
                };
                ApiContentBlock::ToolResult {
                    tool_use_id: result.tool_call_id.clone(),
                    content,
                    is_error,
                }
            }
        }
    }

    /// Convert turns to wire messages, merging consecutive turns that map to
    /// the same wire role.
    fn turns_to_api(turns: &[ConversationTurn]) -> Vec<ApiMessage> {
        let mut merged: Vec<(&'static str, Vec<ApiContentBlock>)> = Vec::new();
        for turn in turns {
            let role = Self::role_to_api(turn.role);
            let blocks = turn.parts.iter().map(Self::part_to_api);
            match merged.last_mut() {
                Some((last, existing)) if *last == role => existing.extend(blocks),
                _ => merged.push((role, blocks.collect())),
            }
        }

        merged
            .into_iter()
            .map(|(role, blocks)| {
                // Simple case: single text part
                let content = match <[ApiContentBlock; 1]>::try_from(blocks) {
                    Ok([ApiContentBlock::Text { text }]) => ApiContent::Text(text),
                    Ok([block]) => ApiContent::Blocks(vec![block]),
                    Err(blocks) => ApiContent::Blocks(blocks),
                };
                ApiMessage { role, content }
            })
            .collect()
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            name: spec.name.clone(),
            description: spec.description.clone(),
            input_schema: spec.input_schema.clone(),
        }
    }
}

impl std::fmt::Display for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "http({}, {}, auth={})", self.endpoint, self.model, self.auth)
    }
}

impl Backend for HttpBackend {
    async fn open(&self, request: ModelRequest) -> Result<EventStream, ModelError> {
        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: Self::turns_to_api(&request.turns),
            system: request.system,
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            stream: true,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "opening agent stream");

        let req = self
            .client
            .post(&self.endpoint)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream");

        let response = self
            .auth
            .apply_headers(req)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect::<String>();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ModelError::Unauthorized(format!("{status}: {body}"))
                }
                _ => ModelError::Api(format!("{status}: {body}")),
            });
        }

        let bytes = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let reader = BufReader::new(StreamReader::new(bytes));

        let events = sse_events(reader)
            .scan(StreamDecoder::default(), |decoder, event| {
                future::ready(Some(event.and_then(|event| decoder.decode(event))))
            })
            .filter_map(|decoded| future::ready(decoded.transpose()));

        Ok(events.boxed())
    }
}
