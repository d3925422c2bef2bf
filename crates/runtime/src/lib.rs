//! Concierge runtime: tool contracts and streaming agent sessions.
//!
//! This crate provides the pieces a host application needs to expose local
//! tools to a hosted conversational agent and to converse with it.
//!
//! # Overview
//!
//! - **Tools**: [`ParameterSpec`](tools::ParameterSpec) and
//!   [`ToolDescriptor`](tools::ToolDescriptor) declare a tool's contract,
//!   [`validate`](tools::validate) checks raw agent arguments against it and
//!   [`ToolRegistry`](tools::ToolRegistry) dispatches invocations.
//! - **Backend**: a trait abstracting the remote agent runtime, with an
//!   HTTP/SSE adapter and a scripted one for tests.
//! - **AgentSession**: a conversation that streams the agent's reply in
//!   chunks, runs tool exchanges transparently and supports cancellation.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::providers::{Auth, HttpBackend};
//! use runtime::tools::ToolRegistry;
//! use runtime::AgentSession;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = HttpBackend::builder("https://agents.example.com/v1/messages", "assistant-1")
//!     .auth(Auth::ApiKey("key".into()))
//!     .build();
//! let mut session = AgentSession::new(backend, Arc::new(ToolRegistry::new()));
//!
//! let mut turn = session.send("Hello!")?;
//! while let Some(chunk) = turn.next().await {
//!     print!("{}", chunk?.text);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod model;
pub mod providers;
mod session;
pub mod tools;

pub use error::{Error, Result};
pub use session::{AgentSession, CancelHandle, SessionId, SessionState, StreamChunk, Turn};
