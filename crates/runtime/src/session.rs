//! Agent session management.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{
    Backend, ConversationTurn, EventStream, ModelError, ModelRequest, Part, Role, StreamEvent,
    ToolCall, ToolResult, Usage,
};
use crate::tools::{InvocationRequest, ToolRegistry};
use crate::{Error, Result};

const DEFAULT_MAX_TOOL_ROUNDS: u32 = 8;

/// A unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an [`AgentSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// A request is open but no text has arrived yet.
    Sending,
    Streaming,
    /// Terminal: a non-recoverable transport failure occurred.
    Closed,
}

/// One fragment of the agent's natural-language reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChunk {
    /// Position of this chunk within the turn, starting at zero.
    pub index: usize,
    pub text: String,
}

/// Cancels whichever turn of a session is in flight.
///
/// Cloneable and usable from another task, e.g. a signal handler.
/// Cancellation takes effect at the turn's next suspension point.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<Mutex<CancellationToken>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.current().cancel();
    }

    fn current(&self) -> CancellationToken {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn renew(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = token.clone();
        token
    }
}

/// One logical conversation with the remote agent.
///
/// Owns the append-only turn history. At most one turn is in flight at a
/// time: [`send`](Self::send) hands out a [`Turn`] that mutably borrows the
/// session until it is finished, cancelled or dropped.
pub struct AgentSession<B> {
    pub id: SessionId,
    backend: B,
    registry: Arc<ToolRegistry>,
    system: Option<String>,
    turns: Vec<ConversationTurn>,
    next_position: u64,
    state: SessionState,
    usage: Usage,
    max_tool_rounds: u32,
    cancel: CancelHandle,
}

impl<B: Backend> AgentSession<B> {
    /// Create a new session over `backend`, exposing the tools in `registry`.
    pub fn new(backend: B, registry: Arc<ToolRegistry>) -> Self {
        let id = SessionId::new();
        info!(session = %id, tools = registry.len(), "session started");
        Self {
            id,
            backend,
            registry,
            system: None,
            turns: Vec::new(),
            next_position: 0,
            state: SessionState::Idle,
            usage: Usage::default(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            cancel: CancelHandle::default(),
        }
    }

    /// Set the system prompt.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Bound the number of tool exchanges within one user turn.
    pub fn with_max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Committed history, oldest first.
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Token usage accumulated over the session.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Append a user turn and open a request to the remote agent.
    ///
    /// The reply is pulled from the returned [`Turn`].
    pub fn send(&mut self, user_text: impl Into<String>) -> Result<Turn<'_, B>> {
        match self.state {
            SessionState::Closed => return Err(Error::SessionClosed),
            SessionState::Sending | SessionState::Streaming => return Err(Error::SessionBusy),
            SessionState::Idle => {}
        }

        self.commit(Role::User, vec![Part::Text {
            text: user_text.into(),
        }]);
        self.state = SessionState::Sending;
        let token = self.cancel.renew();
        debug!(session = %self.id, turns = self.turns.len(), "turn opened");

        Ok(Turn {
            session: self,
            token,
            stream: None,
            staged: Vec::new(),
            text: String::new(),
            calls: Vec::new(),
            rounds: 0,
            chunks: 0,
            done: false,
            cancelled: false,
        })
    }

    /// End the session, releasing the backend.
    pub fn end(self) {
        info!(session = %self.id, turns = self.turns.len(), "session ended");
    }

    fn commit(&mut self, role: Role, parts: Vec<Part>) {
        let turn = ConversationTurn::new(self.next_position, role, parts);
        self.next_position += 1;
        self.turns.push(turn);
    }

    fn request(&self, staged: &[(Role, Vec<Part>)]) -> ModelRequest {
        let mut turns = self.turns.clone();
        let mut position = self.next_position;
        for (role, parts) in staged {
            turns.push(ConversationTurn::new(position, *role, parts.clone()));
            position += 1;
        }
        ModelRequest {
            system: self.system.clone(),
            turns,
            tools: self.registry.specs(),
        }
    }
}

enum Step {
    Chunk(StreamChunk),
    Continue,
    End,
    Fail(Error),
}

/// The in-flight reply to one user turn.
///
/// A lazy, forward-only sequence of [`StreamChunk`]s pulled with
/// [`next`](Self::next). Tool invocations requested by the agent are
/// dispatched between chunks and never surface here. Nothing the agent
/// produced is committed to the session until the turn completes;
/// cancelling or dropping the turn early discards it.
pub struct Turn<'a, B: Backend> {
    session: &'a mut AgentSession<B>,
    token: CancellationToken,
    stream: Option<EventStream>,
    /// Completed tool exchanges of this turn, committed on completion.
    staged: Vec<(Role, Vec<Part>)>,
    /// Agent text of the current round.
    text: String,
    calls: Vec<ToolCall>,
    rounds: u32,
    chunks: usize,
    done: bool,
    cancelled: bool,
}

impl<B: Backend> Turn<'_, B> {
    /// Pull the next chunk. `None` marks the end of the turn.
    pub async fn next(&mut self) -> Option<Result<StreamChunk>> {
        loop {
            match self.step().await {
                Step::Chunk(chunk) => return Some(Ok(chunk)),
                Step::Continue => continue,
                Step::End => return None,
                Step::Fail(error) => return Some(Err(error)),
            }
        }
    }

    /// Drain the turn, returning the full reply text.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut reply = String::new();
        while let Some(chunk) = self.next().await {
            reply.push_str(&chunk?.text);
        }
        Ok(reply)
    }

    /// Abort the turn, discarding anything not yet committed.
    pub fn cancel(mut self) {
        self.abort();
    }

    /// Whether the turn ended through cancellation.
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn is_finished(&self) -> bool {
        self.done
    }

    async fn step(&mut self) -> Step {
        if self.done {
            return Step::End;
        }
        if self.token.is_cancelled() {
            self.abort();
            return Step::End;
        }

        let Some(stream) = self.stream.as_mut() else {
            return self.open().await;
        };

        let event = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            event = stream.next() => Some(event),
        };

        match event {
            None => {
                self.abort();
                Step::End
            }
            Some(Some(Ok(StreamEvent::Text(text)))) => {
                self.session.state = SessionState::Streaming;
                self.text.push_str(&text);
                let chunk = StreamChunk {
                    index: self.chunks,
                    text,
                };
                self.chunks += 1;
                Step::Chunk(chunk)
            }
            Some(Some(Ok(StreamEvent::ToolCall(call)))) => {
                debug!(session = %self.session.id, tool = %call.name, "agent requested tool");
                self.calls.push(call);
                Step::Continue
            }
            Some(Some(Ok(StreamEvent::Usage(usage)))) => {
                self.session.usage.add(usage);
                Step::Continue
            }
            Some(Some(Err(error))) => Step::Fail(self.fail(error)),
            Some(None) => self.finish_round().await,
        }
    }

    async fn open(&mut self) -> Step {
        let request = self.session.request(&self.staged);
        let opened = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            opened = self.session.backend.open(request) => Some(opened),
        };

        match opened {
            None => {
                self.abort();
                Step::End
            }
            Some(Ok(stream)) => {
                self.stream = Some(stream);
                Step::Continue
            }
            Some(Err(error)) => Step::Fail(self.fail(error)),
        }
    }

    /// The remote agent finished one reply: either the turn is complete, or
    /// it asked for tools and the results go back in another request.
    async fn finish_round(&mut self) -> Step {
        self.stream = None;
        let text = std::mem::take(&mut self.text);

        if self.calls.is_empty() {
            for (role, parts) in std::mem::take(&mut self.staged) {
                self.session.commit(role, parts);
            }
            self.session.commit(Role::Agent, vec![Part::Text { text }]);
            self.session.state = SessionState::Idle;
            self.done = true;
            debug!(session = %self.session.id, chunks = self.chunks, "turn complete");
            return Step::End;
        }

        self.rounds += 1;
        if self.rounds > self.session.max_tool_rounds {
            warn!(session = %self.session.id, rounds = self.rounds, "too many tool rounds");
            self.discard();
            self.session.state = SessionState::Idle;
            return Step::Fail(Error::ToolRoundsExceeded(self.session.max_tool_rounds));
        }

        let calls = std::mem::take(&mut self.calls);
        let requests: Vec<InvocationRequest> = calls.iter().map(ToolCall::to_request).collect();
        let registry = Arc::clone(&self.session.registry);
        let results = tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            results = registry.dispatch_all(&requests) => Some(results),
        };
        let Some(results) = results else {
            self.abort();
            return Step::End;
        };

        let mut parts = Vec::with_capacity(calls.len() + 1);
        if !text.is_empty() {
            parts.push(Part::Text { text });
        }
        let results: Vec<_> = calls
            .iter()
            .zip(results)
            .map(|(call, result)| {
                vec![Part::ToolResult(ToolResult {
                    tool_call_id: call.id.clone(),
                    result,
                })]
            })
            .collect();
        parts.extend(calls.into_iter().map(Part::ToolCall));

        self.staged.push((Role::Agent, parts));
        self.staged
            .extend(results.into_iter().map(|parts| (Role::Tool, parts)));
        self.session.state = SessionState::Sending;
        Step::Continue
    }

    fn fail(&mut self, error: ModelError) -> Error {
        self.discard();
        if error.is_fatal() {
            warn!(session = %self.session.id, %error, "session closed by transport failure");
            self.session.state = SessionState::Closed;
        } else {
            warn!(session = %self.session.id, %error, "turn failed");
            self.session.state = SessionState::Idle;
        }
        Error::Transport(error)
    }

    fn abort(&mut self) {
        if self.done {
            return;
        }
        debug!(session = %self.session.id, "turn cancelled");
        self.discard();
        self.cancelled = true;
        if self.session.state != SessionState::Closed {
            self.session.state = SessionState::Idle;
        }
    }

    fn discard(&mut self) {
        self.stream = None;
        self.staged.clear();
        self.text.clear();
        self.calls.clear();
        self.done = true;
    }
}

impl<B: Backend> Drop for Turn<'_, B> {
    fn drop(&mut self) {
        self.abort();
    }
}
