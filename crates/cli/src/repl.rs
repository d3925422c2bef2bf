//! The interactive session loop.

use runtime::model::Backend;
use runtime::AgentSession;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;

/// Words that end the loop, matched case-insensitively.
pub const EXIT_KEYWORDS: [&str; 3] = ["exit", "quit", "bye"];

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Keyword,
    EndOfInput,
    /// Interrupted while waiting for input.
    Interrupted,
    /// The session hit a non-recoverable transport failure.
    SessionClosed,
}

/// Queries `ask` streams when it is given none.
pub const DEMO_QUERIES: [&str; 3] = [
    "What are the current market trends in Seattle for the last 6 months?",
    "Search for houses in Seattle with 3 bedrooms under $500,000",
    "Calculate the monthly mortgage for a $450,000 home with 20% down at 6.5% interest",
];

pub fn is_exit_keyword(input: &str) -> bool {
    EXIT_KEYWORDS
        .iter()
        .any(|keyword| keyword.eq_ignore_ascii_case(input.trim()))
}

/// Read lines from `input` and converse until an exit condition.
///
/// Each `()` received on `interrupts` cancels the turn being streamed, or
/// ends the loop if none is. Errors from the session are written to
/// `output`; only I/O failures on `input` or `output` are returned.
pub async fn run<B, R, W>(
    session: &mut AgentSession<B>,
    input: R,
    output: &mut W,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<Exit>
where
    B: Backend,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(output, "> ")?;
        output.flush()?;

        let line = tokio::select! {
            biased;
            Some(()) = interrupts.recv() => {
                writeln!(output)?;
                return Ok(Exit::Interrupted);
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            writeln!(output)?;
            return Ok(Exit::EndOfInput);
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_exit_keyword(line) {
            return Ok(Exit::Keyword);
        }

        converse(session, line, output, interrupts).await?;
        if session.is_closed() {
            return Ok(Exit::SessionClosed);
        }

        // Interrupts raised after the turn ended belong to no turn.
        while interrupts.try_recv().is_ok() {}
    }
}

/// Stream each query through `session` in order, echoing it first.
///
/// An interrupt cancels only the reply in progress. Stops early with
/// `Exit::SessionClosed` if the session closes.
pub async fn ask<B, Q, W>(
    session: &mut AgentSession<B>,
    queries: &[Q],
    output: &mut W,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<Exit>
where
    B: Backend,
    Q: AsRef<str>,
    W: Write,
{
    for query in queries {
        let query = query.as_ref().trim();
        if query.is_empty() {
            continue;
        }
        writeln!(output, "> {query}")?;
        converse(session, query, output, interrupts).await?;
        if session.is_closed() {
            return Ok(Exit::SessionClosed);
        }
        while interrupts.try_recv().is_ok() {}
    }
    Ok(Exit::EndOfInput)
}

/// Run one turn, streaming the reply to `output`.
async fn converse<B, W>(
    session: &mut AgentSession<B>,
    text: &str,
    output: &mut W,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> Result<()>
where
    B: Backend,
    W: Write,
{
    let mut turn = match session.send(text) {
        Ok(turn) => turn,
        Err(e) => {
            writeln!(output, "Error: {e}\n")?;
            return Ok(());
        }
    };

    writeln!(output)?;
    loop {
        let next = tokio::select! {
            biased;
            Some(()) = interrupts.recv() => None,
            chunk = turn.next() => Some(chunk),
        };

        match next {
            None => {
                debug!("turn interrupted");
                turn.cancel();
                writeln!(output, "\n[cancelled]\n")?;
                return Ok(());
            }
            Some(Some(Ok(chunk))) => {
                write!(output, "{}", chunk.text)?;
                output.flush()?;
            }
            Some(Some(Err(e))) => {
                writeln!(output, "\nError: {e}\n")?;
                return Ok(());
            }
            Some(None) => {
                writeln!(output, "\n")?;
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime::model::{ModelError, Role};
    use runtime::providers::{Reply, ScriptedBackend};
    use runtime::tools::ToolRegistry;
    use runtime::SessionState;
    use std::sync::Arc;

    fn session(replies: Vec<Reply>) -> AgentSession<ScriptedBackend> {
        AgentSession::new(ScriptedBackend::new(replies), Arc::new(ToolRegistry::new()))
    }

    async fn drive(
        session: &mut AgentSession<ScriptedBackend>,
        input: &str,
    ) -> (Exit, String) {
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let mut out = Vec::new();
        let exit = run(session, input.as_bytes(), &mut out, &mut rx)
            .await
            .unwrap();
        (exit, String::from_utf8(out).unwrap())
    }

    #[test]
    fn exit_keywords_ignore_case() {
        assert!(is_exit_keyword("exit"));
        assert!(is_exit_keyword("QUIT"));
        assert!(is_exit_keyword(" Bye "));
        assert!(!is_exit_keyword("goodbye"));
    }

    #[tokio::test]
    async fn streams_reply_then_exits_on_keyword() {
        let mut session = session(vec![Reply::text(["It is ", "sunny."])]);
        let (exit, out) = drive(&mut session, "weather?\n\nBye\nnever sent\n").await;

        assert_eq!(exit, Exit::Keyword);
        assert!(out.contains("It is sunny."));
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.backend().remaining(), 0);
    }

    #[tokio::test]
    async fn end_of_input_terminates() {
        let mut session = session(Vec::new());
        let (exit, _) = drive(&mut session, "   \n").await;
        assert_eq!(exit, Exit::EndOfInput);
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn recoverable_error_is_reported_and_loop_continues() {
        let mut session = session(vec![
            Reply::failure(ModelError::Network("connection reset".into())),
            Reply::text(["recovered"]),
        ]);
        let (exit, out) = drive(&mut session, "one\ntwo\n").await;

        assert_eq!(exit, Exit::EndOfInput);
        assert!(out.contains("Error: transport error"));
        assert!(out.contains("recovered"));
    }

    #[tokio::test]
    async fn closed_session_terminates() {
        let mut session = session(vec![Reply::failure(ModelError::Unauthorized(
            "invalid key".into(),
        ))]);
        let (exit, out) = drive(&mut session, "hello\nagain\n").await;

        assert_eq!(exit, Exit::SessionClosed);
        assert!(out.contains("Error:"));
        assert_eq!(session.backend().requests().len(), 1);
    }

    #[tokio::test]
    async fn interrupt_while_waiting_for_input_ends_loop() {
        let mut session = session(Vec::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(()).unwrap();

        let mut out = Vec::new();
        let exit = run(&mut session, "hello\n".as_bytes(), &mut out, &mut rx)
            .await
            .unwrap();
        assert_eq!(exit, Exit::Interrupted);
        assert!(session.turns().is_empty());
    }

    #[tokio::test]
    async fn ask_streams_each_query_through_one_session() {
        let mut session = session(vec![
            Reply::text(["Prices are ", "up 5%."]),
            Reply::text(["Found 2 houses."]),
            Reply::text(["$2,275.44 per month."]),
        ]);
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let mut out = Vec::new();

        let exit = ask(&mut session, &DEMO_QUERIES[..], &mut out, &mut rx)
            .await
            .unwrap();
        assert_eq!(exit, Exit::EndOfInput);

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("> What are the current market trends in Seattle"));
        assert!(out.contains("Prices are up 5%."));
        assert!(out.contains("$2,275.44 per month."));
        assert_eq!(session.turns().len(), 6);

        // Later requests carry the earlier exchanges.
        let requests = session.backend().requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].turns.len(), 5);
        assert_eq!(requests[2].turns[4].content(), DEMO_QUERIES[2]);
    }

    #[tokio::test]
    async fn ask_stops_when_session_closes() {
        let mut session = session(vec![Reply::failure(ModelError::Unauthorized(
            "invalid key".into(),
        ))]);
        let (_tx, mut rx) = mpsc::unbounded_channel();
        let mut out = Vec::new();

        let queries = vec!["first".to_string(), " ".to_string(), "second".to_string()];
        let exit = ask(&mut session, &queries[..], &mut out, &mut rx).await.unwrap();
        assert_eq!(exit, Exit::SessionClosed);
        assert_eq!(session.backend().requests().len(), 1);
        assert!(!String::from_utf8(out).unwrap().contains("> second"));
    }

    #[tokio::test]
    async fn interrupt_while_streaming_cancels_turn() {
        let mut session = session(vec![
            Reply::text(["partial"]).then_hang(),
            Reply::text(["second"]),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut out = Vec::new();

        let interrupter = tokio::spawn(async move {
            // Let the loop start streaming before interrupting.
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            let _ = tx.send(());
        });

        converse(&mut session, "first", &mut out, &mut rx)
            .await
            .unwrap();
        interrupter.await.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("partial"));
        assert!(out.contains("[cancelled]"));
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.turns().iter().all(|turn| turn.role != Role::Agent));

        // The session accepts the next turn.
        let mut out = Vec::new();
        converse(&mut session, "again", &mut out, &mut rx)
            .await
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("second"));
        assert_eq!(session.turns().last().map(|t| t.content()), Some("second".into()));
    }
}
