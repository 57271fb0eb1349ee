//! Handler registration and concurrent dispatch.
//!
//! Two registries, constructed once at startup and shared by reference
//! (never ambient globals, so several bot instances can coexist in tests):
//!
//! - [`HandlerRegistry`]: protocol command name → ordered generic handlers.
//! - [`CommandRegistry`]: chat command word → validated [`CommandSpec`].
//!
//! Dispatch is fire-and-forget: each handler invocation runs as its own
//! tokio task, so one slow or failing handler can never hold up another, and
//! nothing here blocks the reader loop.

mod dispatch;
mod eval;
mod help;
mod logging;
mod termbin;

pub use dispatch::CommandDispatcher;
pub use eval::{EvalCommand, Evaluator};
pub use help::register_help;
pub use logging::{ChannelLogs, KickLogger, MembershipLogger, PrivmsgLogger};
pub use termbin::{LogCommand, SrcCommand, termbin};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::warn;

use crate::error::HandlerResult;
use crate::event::Event;

/// A generic handler, keyed by protocol command (JOIN, PRIVMSG, ...).
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> HandlerResult;
}

/// A chat command handler.
///
/// Receives exactly one argument string per declared parameter; arity is
/// enforced by the dispatcher before this is ever invoked.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn invoke(&self, event: Event, args: Vec<String>) -> HandlerResult;
}

/// A declared command parameter; drives the usage string and arity bounds.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }
}

/// Immutable command descriptor, computed once at registration.
pub struct CommandSpec {
    pub name: String,
    /// `name PARAM [OPTIONAL]`, parameter order preserved.
    pub usage: String,
    pub min_args: usize,
    pub max_args: usize,
    pub help: Option<&'static str>,
    handler: Arc<dyn CommandHandler>,
}

impl CommandSpec {
    fn new(
        name: &str,
        params: &[Param],
        help: Option<&'static str>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        debug_assert!(
            params.windows(2).all(|w| w[0].required || !w[1].required),
            "optional parameters must come after required ones"
        );

        let mut usage = String::from(name);
        let mut min_args = 0;
        for param in params {
            let upper = param.name.to_uppercase();
            if param.required {
                min_args += 1;
                usage.push(' ');
                usage.push_str(&upper);
            } else {
                usage.push_str(" [");
                usage.push_str(&upper);
                usage.push(']');
            }
        }

        Self {
            name: name.to_owned(),
            usage,
            min_args,
            max_args: params.len(),
            help,
            handler,
        }
    }

    /// Run the underlying handler. Arity must already be validated.
    pub async fn invoke(&self, event: Event, args: Vec<String>) -> HandlerResult {
        self.handler.invoke(event, args).await
    }
}

/// Chat commands by command word. Re-registering a name overwrites: last
/// registration wins.
#[derive(Default)]
pub struct CommandRegistry {
    commands: RwLock<HashMap<String, Arc<CommandSpec>>>,
}

impl CommandRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(
        &self,
        name: &str,
        params: &[Param],
        help: Option<&'static str>,
        handler: Arc<dyn CommandHandler>,
    ) {
        let spec = Arc::new(CommandSpec::new(name, params, help, handler));
        self.commands.write().insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandSpec>> {
        self.commands.read().get(name).cloned()
    }

    /// Exact lookup, then a retry ignoring leading/trailing punctuation on
    /// both sides, so `help` finds `!help`.
    pub fn lookup_fuzzy(&self, name: &str) -> Option<Arc<CommandSpec>> {
        if let Some(spec) = self.get(name) {
            return Some(spec);
        }
        let strip = |s: &str| {
            s.trim_matches(|c: char| c.is_ascii_punctuation())
                .to_owned()
        };
        let wanted = strip(name);
        self.commands
            .read()
            .values()
            .find(|spec| strip(&spec.name) == wanted)
            .cloned()
    }

    /// Sorted command words, for the help listing.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Generic event handlers by protocol command, in registration order.
///
/// Registration is not deduplicated; registering the same handler twice
/// runs it twice.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, command: &str, handler: Arc<dyn EventHandler>) {
        self.handlers
            .write()
            .entry(command.to_owned())
            .or_default()
            .push(handler);
    }

    /// Spawn every handler registered for the event's command.
    ///
    /// Never waits: each handler runs as an independent task. A command with
    /// no handlers is silently dropped. A failing handler has no user to
    /// answer, so its error is logged and swallowed; it cannot affect the
    /// other handlers or the reader loop.
    pub fn dispatch(&self, event: &Event) {
        let matching = self
            .handlers
            .read()
            .get(event.command())
            .cloned()
            .unwrap_or_default();

        for handler in matching {
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle(event.clone()).await {
                    warn!(
                        command = %event.command(),
                        kind = e.kind(),
                        error = %e,
                        "event handler failed"
                    );
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;

    struct Nop;

    #[async_trait]
    impl CommandHandler for Nop {
        async fn invoke(&self, _event: Event, _args: Vec<String>) -> HandlerResult {
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl CommandHandler for Failing {
        async fn invoke(&self, _event: Event, _args: Vec<String>) -> HandlerResult {
            Err(HandlerError::invalid("always fails"))
        }
    }

    #[test]
    fn test_usage_from_params() {
        let spec = CommandSpec::new(
            "!kickban",
            &[Param::required("target"), Param::optional("reason")],
            None,
            Arc::new(Nop),
        );
        assert_eq!(spec.usage, "!kickban TARGET [REASON]");
        assert_eq!(spec.min_args, 1);
        assert_eq!(spec.max_args, 2);
    }

    #[test]
    fn test_optional_only_param_bounds() {
        let spec = CommandSpec::new("!log", &[Param::optional("target")], None, Arc::new(Nop));
        assert_eq!(spec.usage, "!log [TARGET]");
        assert_eq!(spec.min_args, 0);
        assert_eq!(spec.max_args, 1);
    }

    #[test]
    fn test_no_params() {
        let spec = CommandSpec::new("!src", &[], None, Arc::new(Nop));
        assert_eq!(spec.usage, "!src");
        assert_eq!(spec.min_args, 0);
        assert_eq!(spec.max_args, 0);
    }

    #[test]
    fn test_last_registration_wins() {
        let commands = CommandRegistry::new();
        commands.register("!x", &[], Some("first"), Arc::new(Nop));
        commands.register("!x", &[Param::required("arg")], Some("second"), Arc::new(Failing));

        let spec = commands.get("!x").unwrap();
        assert_eq!(spec.help, Some("second"));
        assert_eq!(spec.min_args, 1);
        assert_eq!(commands.names(), vec!["!x"]);
    }

    #[test]
    fn test_fuzzy_lookup_strips_punctuation() {
        let commands = CommandRegistry::new();
        commands.register("!help", &[], None, Arc::new(Nop));

        assert!(commands.lookup_fuzzy("!help").is_some());
        assert!(commands.lookup_fuzzy("help").is_some());
        assert!(commands.lookup_fuzzy("help!").is_some());
        assert!(commands.lookup_fuzzy("nothing").is_none());
    }

    #[test]
    fn test_names_are_sorted() {
        let commands = CommandRegistry::new();
        commands.register("!src", &[], None, Arc::new(Nop));
        commands.register("!help", &[], None, Arc::new(Nop));
        commands.register("!log", &[], None, Arc::new(Nop));
        assert_eq!(commands.names(), vec!["!help", "!log", "!src"]);
    }
}
