//! Dispatched events and their bound reply capability.

use std::fmt;
use std::sync::Arc;

use banana_proto::{Message, Sender};

use crate::error::HandlerResult;
use crate::network::Connection;

/// One parsed message bound to the connection it arrived on.
///
/// Cloning is cheap; every spawned handler gets its own handle. The
/// connection back-reference and the reply capability are dispatch-time
/// state, not wire data.
#[derive(Clone)]
pub struct Event {
    inner: Arc<Inner>,
}

struct Inner {
    message: Message,
    connection: Arc<Connection>,
}

impl Event {
    pub(crate) fn new(message: Message, connection: Arc<Connection>) -> Self {
        Self {
            inner: Arc::new(Inner {
                message,
                connection,
            }),
        }
    }

    pub fn sender(&self) -> &Sender {
        &self.inner.message.sender
    }

    /// Protocol verb, e.g. `PRIVMSG` or `376`.
    pub fn command(&self) -> &str {
        &self.inner.message.command
    }

    /// Parameters exactly as they arrived on the wire.
    pub fn params(&self) -> &[String] {
        &self.inner.message.params
    }

    /// Channel or nick this message acts on (rule-table verbs only).
    pub fn target(&self) -> Option<&str> {
        self.inner.message.target()
    }

    /// Message body (PRIVMSG only).
    pub fn text(&self) -> Option<&str> {
        self.inner.message.text()
    }

    /// Channel a kick happened in (KICK only).
    pub fn channel(&self) -> Option<&str> {
        self.inner.message.channel()
    }

    /// Kick reason (KICK only).
    pub fn reason(&self) -> Option<&str> {
        self.inner.message.reason()
    }

    /// Send a PRIVMSG back where this event came from.
    ///
    /// Replies to a message addressed to the bot's own nick go to the
    /// sender's nick instead, so the answer always lands somewhere a human
    /// can see it.
    pub fn reply(&self, text: &str) -> HandlerResult {
        self.inner.connection.reply(&self.inner.message, text)?;
        Ok(())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner.message, f)
    }
}
