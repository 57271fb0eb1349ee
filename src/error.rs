//! Unified error handling for the bot runtime.
//!
//! Two layers: [`BotError`] covers connection-level failures (fatal, no
//! channel to reply to yet), while [`HandlerError`] covers anything escaping
//! an event or command handler (always recovered before it can touch the
//! main loop).

use thiserror::Error;
use tokio::sync::mpsc;

/// Result of one handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Connection-level errors: handshake and main-loop failures.
///
/// These are process-fatal in the minimal design; there is no reconnect
/// policy in scope.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] banana_proto::ProtocolError),

    /// The writer task went away; nothing can be sent anymore.
    #[error("outbound channel closed")]
    Send(#[from] mpsc::error::SendError<String>),

    #[error("server closed the connection")]
    Disconnected,
}

/// Errors escaping an event or command handler.
///
/// Command dispatch converts these into a `"{kind}: {message}"` chat reply;
/// generic dispatch logs and swallows them. Either way the main loop never
/// sees them.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Reply target unreachable because the connection is gone.
    #[error("outbound channel closed")]
    Send(#[from] mpsc::error::SendError<String>),

    /// Bad input from the invoking user.
    #[error("{message}")]
    Invalid {
        message: String,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    /// A bad-input failure, surfaced to the user as `ValueError: {message}`.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Short error-kind label used in chat replies and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "IoError",
            Self::Http(_) => "HttpError",
            Self::Send(_) => "SendError",
            Self::Invalid { .. } => "ValueError",
            Self::Other(_) => "Error",
        }
    }
}
