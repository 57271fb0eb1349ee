//! The built-in help command.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::error::HandlerResult;
use crate::event::Event;

use super::{CommandHandler, CommandRegistry, Param};

const DEFAULT_HELP: &str = "No description provided.";

/// Register a help command under `name` (conventionally `!help`).
///
/// Commands registered after this call still show up in the listing; the
/// help handler reads the registry live rather than snapshotting it.
pub fn register_help(commands: &Arc<CommandRegistry>, name: &str) {
    let handler = Arc::new(HelpCommand {
        name: name.to_owned(),
        commands: Arc::downgrade(commands),
    });
    commands.register(
        name,
        &[Param::optional("command")],
        Some("Display a list of commands or help on a specific command."),
        handler,
    );
}

struct HelpCommand {
    name: String,
    // Weak: the registry owns this handler, not the other way around.
    commands: Weak<CommandRegistry>,
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn invoke(&self, event: Event, args: Vec<String>) -> HandlerResult {
        let Some(commands) = self.commands.upgrade() else {
            return Ok(());
        };

        let Some(wanted) = args.into_iter().next() else {
            let listing = commands.names().join(", ");
            return event.reply(&format!(
                "See '{} COMMAND' for help on a specific command. List of commands: {listing}",
                self.name
            ));
        };

        let Some(spec) = commands.lookup_fuzzy(wanted.trim()) else {
            return event.reply(&format!("No command called {wanted} :("));
        };

        let help = spec
            .help
            .unwrap_or(DEFAULT_HELP)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        event.reply(&format!("{}: {}", spec.usage, help))
    }
}
