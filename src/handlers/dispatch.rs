//! The built-in PRIVMSG handler that turns chat lines into command calls.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::HandlerResult;
use crate::event::Event;

use super::{CommandRegistry, CommandSpec, EventHandler};

/// Recognizes command words in channel messages and invokes the command
/// registry with arity checking and failure isolation.
///
/// Arguments are exactly whitespace-separated tokens; there is no quoting
/// and no multi-word final argument.
pub struct CommandDispatcher {
    commands: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    pub fn new(commands: Arc<CommandRegistry>) -> Arc<Self> {
        Arc::new(Self { commands })
    }
}

#[async_trait]
impl EventHandler for CommandDispatcher {
    async fn handle(&self, event: Event) -> HandlerResult {
        let Some(text) = event.text() else {
            return Ok(());
        };
        let mut words = text.split_whitespace();
        let Some(word) = words.next() else {
            return Ok(());
        };
        let args: Vec<String> = words.map(str::to_owned).collect();

        // An unknown word is ordinary chat, already delivered to the other
        // PRIVMSG handlers; no reply.
        let Some(spec) = self.commands.get(word) else {
            return Ok(());
        };

        if !(spec.min_args..=spec.max_args).contains(&args.len()) {
            return event.reply(&format!("Usage: {}", spec.usage));
        }

        // Fire-and-forget with an error boundary; a failing command must
        // never reach the reader loop.
        tokio::spawn(run_isolated(spec, event, args));
        Ok(())
    }
}

/// Error boundary for one command invocation: a failure becomes a chat
/// reply and a log line, never a propagated error.
async fn run_isolated(spec: Arc<CommandSpec>, event: Event, args: Vec<String>) {
    if let Err(e) = spec.invoke(event.clone(), args).await {
        warn!(command = %spec.name, kind = e.kind(), error = %e, "command failed");
        let _ = event.reply(&format!("{}: {}", e.kind(), e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, HandlerResult};
    use crate::handlers::{CommandHandler, Param};
    use crate::network::Connection;
    use banana_proto::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler for Counting {
        async fn invoke(&self, _event: Event, _args: Vec<String>) -> HandlerResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        async fn invoke(&self, _event: Event, _args: Vec<String>) -> HandlerResult {
            Err(HandlerError::invalid("bad input"))
        }
    }

    struct Echo;

    #[async_trait]
    impl CommandHandler for Echo {
        async fn invoke(&self, event: Event, args: Vec<String>) -> HandlerResult {
            event.reply(&args.join("|"))
        }
    }

    fn chat_event(text: &str) -> (Event, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        let line = format!(":alice!a@h PRIVMSG #chan :{text}");
        (Event::new(Message::parse(&line).unwrap(), connection), rx)
    }

    #[tokio::test]
    async fn test_arity_failure_replies_usage_and_skips_handler() {
        let commands = CommandRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        commands.register(
            "!cmd",
            &[Param::required("a"), Param::optional("b")],
            None,
            Arc::new(Counting {
                calls: Arc::clone(&calls),
            }),
        );
        let dispatcher = CommandDispatcher::new(commands);

        let (event, mut out) = chat_event("!cmd a b c");
        dispatcher.handle(event).await.unwrap();

        assert_eq!(out.try_recv().unwrap(), "PRIVMSG #chan :Usage: !cmd A [B]");
        assert!(out.try_recv().is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_kind_message_reply() {
        let commands = CommandRegistry::new();
        commands.register("!fail", &[], None, Arc::new(Failing));
        let dispatcher = CommandDispatcher::new(commands);

        let (event, mut out) = chat_event("!fail");
        dispatcher.handle(event).await.unwrap();

        let reply = timeout(Duration::from_secs(1), out.recv()).await.unwrap();
        assert_eq!(
            reply.as_deref(),
            Some("PRIVMSG #chan :ValueError: bad input")
        );
    }

    #[tokio::test]
    async fn test_later_events_survive_a_failing_command() {
        let commands = CommandRegistry::new();
        commands.register("!fail", &[], None, Arc::new(Failing));
        commands.register("!echo", &[Param::required("what")], None, Arc::new(Echo));
        let dispatcher = CommandDispatcher::new(commands);

        let (event, mut out) = chat_event("!fail");
        dispatcher.handle(event).await.unwrap();
        timeout(Duration::from_secs(1), out.recv()).await.unwrap();

        let (event, mut out) = chat_event("!echo ok");
        dispatcher.handle(event).await.unwrap();
        let reply = timeout(Duration::from_secs(1), out.recv()).await.unwrap();
        assert_eq!(reply.as_deref(), Some("PRIVMSG #chan :ok"));
    }

    #[tokio::test]
    async fn test_unknown_word_is_silent() {
        let commands = CommandRegistry::new();
        let dispatcher = CommandDispatcher::new(commands);

        let (event, mut out) = chat_event("!nosuchthing at all");
        dispatcher.handle(event).await.unwrap();
        assert!(out.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_args_are_single_tokens() {
        let commands = CommandRegistry::new();
        commands.register(
            "!echo",
            &[Param::required("a"), Param::required("b")],
            None,
            Arc::new(Echo),
        );
        let dispatcher = CommandDispatcher::new(commands);

        let (event, mut out) = chat_event("!echo one   two");
        dispatcher.handle(event).await.unwrap();
        let reply = timeout(Duration::from_secs(1), out.recv()).await.unwrap();
        assert_eq!(reply.as_deref(), Some("PRIVMSG #chan :one|two"));
    }
}
