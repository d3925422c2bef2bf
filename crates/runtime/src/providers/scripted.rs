//! Scripted backend.
//!
//! Replays canned replies in order and records every request it receives.
//! Useful for tests and for exercising the session loop without a network.

use futures_util::{StreamExt, stream};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::model::{
    Backend, EventStream, ModelError, ModelRequest, StreamEvent, ToolCall, Usage,
};

/// One canned reply from the remote agent.
#[derive(Debug, Clone)]
pub struct Reply {
    outcome: Result<Vec<Result<StreamEvent, ModelError>>, ModelError>,
    hang: bool,
}

impl Reply {
    /// A reply streaming `fragments` as text.
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::events(fragments.into_iter().map(|f| StreamEvent::Text(f.into())))
    }

    /// A reply requesting the given tool calls.
    pub fn tool_calls(calls: impl IntoIterator<Item = ToolCall>) -> Self {
        Self::events(calls.into_iter().map(StreamEvent::ToolCall))
    }

    pub fn events(events: impl IntoIterator<Item = StreamEvent>) -> Self {
        Self {
            outcome: Ok(events.into_iter().map(Ok).collect()),
            hang: false,
        }
    }

    /// A request that fails before any event is produced.
    pub fn failure(error: ModelError) -> Self {
        Self {
            outcome: Err(error),
            hang: false,
        }
    }

    /// Append a mid-stream error.
    pub fn then_error(mut self, error: ModelError) -> Self {
        if let Ok(events) = &mut self.outcome {
            events.push(Err(error));
        }
        self
    }

    /// Append a usage report.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        if let Ok(events) = &mut self.outcome {
            events.push(Ok(StreamEvent::Usage(usage)));
        }
        self
    }

    /// Never finish after the scripted events.
    pub fn then_hang(mut self) -> Self {
        self.hang = true;
        self
    }
}

/// Backend replaying [`Reply`] values.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: Reply) {
        lock(&self.replies).push_back(reply);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

impl Backend for ScriptedBackend {
    async fn open(&self, request: ModelRequest) -> Result<EventStream, ModelError> {
        lock(&self.requests).push(request);
        let reply = lock(&self.replies)
            .pop_front()
            .ok_or_else(|| ModelError::Api("no scripted reply left".into()))?;

        let events = stream::iter(reply.outcome?);
        if reply.hang {
            Ok(events.chain(stream::pending()).boxed())
        } else {
            Ok(events.boxed())
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConversationTurn, Part, Role};
    use futures_util::StreamExt;

    fn request(text: &str) -> ModelRequest {
        ModelRequest {
            system: None,
            turns: vec![ConversationTurn::new(
                0,
                Role::User,
                vec![Part::Text { text: text.into() }],
            )],
            tools: Vec::new(),
        }
    }

    #[tokio::test]
    async fn replays_in_order_and_records() {
        let backend = ScriptedBackend::new([Reply::text(["a", "b"]), Reply::text(["c"])]);

        let first: Vec<_> = backend.open(request("1")).await.unwrap().collect().await;
        assert_eq!(first.len(), 2);
        let second: Vec<_> = backend.open(request("2")).await.unwrap().collect().await;
        assert_eq!(second, vec![Ok(StreamEvent::Text("c".into()))]);

        assert_eq!(backend.requests().len(), 2);
        assert_eq!(backend.remaining(), 0);
        assert!(backend.open(request("3")).await.is_err());

        backend.push(Reply::text(["d"]));
        let pushed: Vec<_> = backend.open(request("4")).await.unwrap().collect().await;
        assert_eq!(pushed, vec![Ok(StreamEvent::Text("d".into()))]);
    }
}
