//! The single-reader main loop.
//!
//! Exactly one task runs this loop. It is the only place that reads the
//! connection, so dispatch start order always matches wire arrival order.
//! Handlers themselves are spawned fire-and-forget; the loop never waits on
//! them before reading the next line.

use std::sync::Arc;

use banana_proto::{Message, ProtocolError};
use futures_util::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::error::BotError;
use crate::event::Event;
use crate::handlers::HandlerRegistry;

use super::Connection;

/// Read lines until the stream ends, dispatching each parsed event.
pub async fn run<S>(
    connection: Arc<Connection>,
    lines: &mut S,
    handlers: Arc<HandlerRegistry>,
) -> Result<(), BotError>
where
    S: Stream<Item = Result<String, ProtocolError>> + Unpin,
{
    while let Some(line) = lines.next().await {
        let line = line?;
        if line.is_empty() {
            continue;
        }

        // Keep-alive outranks parsing and dispatch.
        if line.starts_with("PING") {
            connection.send(line.replacen("PING", "PONG", 1))?;
            continue;
        }

        match Message::parse(&line) {
            Ok(message) => {
                let event = Event::new(message, Arc::clone(&connection));
                debug!(event = ?event, "dispatching");
                handlers.dispatch(&event);
            }
            // A malformed line costs one message, never the connection.
            Err(e) => warn!(error = %e, line = %line, "skipping malformed line"),
        }
    }

    debug!("line stream ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::handlers::EventHandler;
    use async_trait::async_trait;
    use futures_util::stream;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct Probe {
        seen: mpsc::UnboundedSender<String>,
    }

    #[async_trait]
    impl EventHandler for Probe {
        async fn handle(&self, event: Event) -> HandlerResult {
            self.seen.send(event.command().to_owned()).unwrap();
            Ok(())
        }
    }

    fn server_lines(lines: &[&str]) -> impl Stream<Item = Result<String, ProtocolError>> + Unpin {
        stream::iter(
            lines
                .iter()
                .map(|l| Ok(l.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_ping_answered_without_dispatch() {
        let (tx, mut out) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        let handlers = HandlerRegistry::new();
        let mut lines = server_lines(&["PING :server123"]);

        run(connection, &mut lines, handlers).await.unwrap();

        assert_eq!(out.try_recv().unwrap(), "PONG :server123");
        assert!(out.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_line_is_skipped() {
        let (tx, _out) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        let handlers = HandlerRegistry::new();
        let (seen_tx, mut seen) = mpsc::unbounded_channel();
        handlers.register("JOIN", Arc::new(Probe { seen: seen_tx }));

        let mut lines = server_lines(&["complete garbage", ":a!b@c JOIN #chan"]);
        run(connection, &mut lines, Arc::clone(&handlers))
            .await
            .unwrap();

        let command = timeout(Duration::from_secs(1), seen.recv()).await.unwrap();
        assert_eq!(command.as_deref(), Some("JOIN"));
    }

    #[tokio::test]
    async fn test_both_join_handlers_run_once() {
        let (tx, _out) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        let handlers = HandlerRegistry::new();
        let (seen_tx, mut seen) = mpsc::unbounded_channel();
        handlers.register(
            "JOIN",
            Arc::new(Probe {
                seen: seen_tx.clone(),
            }),
        );
        handlers.register("JOIN", Arc::new(Probe { seen: seen_tx }));

        let mut lines = server_lines(&[":a!b@c JOIN #chan"]);
        run(connection, &mut lines, Arc::clone(&handlers))
            .await
            .unwrap();

        // Both handlers run exactly once; completion order is not asserted.
        for _ in 0..2 {
            let command = timeout(Duration::from_secs(1), seen.recv()).await.unwrap();
            assert_eq!(command.as_deref(), Some("JOIN"));
        }
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_read_error_is_fatal() {
        let (tx, _out) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        let handlers = HandlerRegistry::new();
        let mut lines = stream::iter(vec![Err(ProtocolError::LineTooLong {
            actual: 600,
            limit: 512,
        })]);

        let err = run(connection, &mut lines, handlers).await.unwrap_err();
        assert!(matches!(err, BotError::Protocol(_)));
    }
}
