//! Server-Sent Events (SSE) line parser.

use futures_util::Stream;
use futures_util::stream;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use crate::model::ModelError;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SseEvent {
    /// The event type (e.g. "content_block_delta").
    pub event: Option<String>,
    /// The event data (usually JSON).
    pub data: String,
}

struct SseLines<R> {
    lines: Lines<R>,
    event: Option<String>,
    data: String,
}

impl<R: AsyncBufRead + Unpin> SseLines<R> {
    async fn next_event(&mut self) -> Result<Option<SseEvent>, ModelError> {
        while let Some(line) = self
            .lines
            .next_line()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?
        {
            if line.is_empty() {
                // Empty line = end of event
                if !self.data.is_empty() {
                    return Ok(Some(self.take()));
                }
                self.event = None;
                continue;
            }

            if let Some(event) = line.strip_prefix("event:") {
                self.event = Some(event.trim_start().to_string());
            } else if let Some(data) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(data.strip_prefix(' ').unwrap_or(data));
            }
            // Ignore other fields (id:, retry:, comments)
        }

        if self.data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.take()))
        }
    }

    fn take(&mut self) -> SseEvent {
        SseEvent {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
        }
    }
}

/// Parse SSE events lazily from a buffered reader.
///
/// The stream ends after the reader is exhausted or after the first error.
pub(crate) fn sse_events<R>(reader: R) -> impl Stream<Item = Result<SseEvent, ModelError>> + Send
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let state = SseLines {
        lines: reader.lines(),
        event: None,
        data: String::new(),
    };
    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        match state.next_event().await {
            Ok(Some(event)) => Some((Ok(event), Some(state))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn parses_named_and_multiline_events() {
        let body: &'static [u8] = b"event: ping\ndata: {}\n\n: comment\nevent: delta\ndata: one\ndata: two\n\ndata: tail";
        let events: Vec<_> = sse_events(body).collect().await;
        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();

        assert_eq!(
            events,
            vec![
                SseEvent {
                    event: Some("ping".into()),
                    data: "{}".into()
                },
                SseEvent {
                    event: Some("delta".into()),
                    data: "one\ntwo".into()
                },
                SseEvent {
                    event: None,
                    data: "tail".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn blank_lines_without_data_are_skipped() {
        let body: &'static [u8] = b"\n\nevent: lonely\n\n";
        let events: Vec<_> = sse_events(body).collect().await;
        assert!(events.is_empty());
    }
}
