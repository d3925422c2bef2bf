//! Protocol types shared with the remote agent, and the backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Backend, ConversationTurn, EventStream, ModelRequest, Part, Role, StreamEvent, ToolCall,
    ToolResult, ToolSpec, Usage,
};
