//! Wire-level IRC support for bananabot.
//!
//! This crate covers exactly the protocol surface the bot engine needs:
//!
//! - [`LineCodec`]: newline-terminated framing with lossy UTF-8 decoding,
//!   suitable for a long-lived connection fed partially-trusted text.
//! - [`Message`]: one parsed inbound line (sender prefix, command verb,
//!   parameter list, and per-verb convenience detail).
//! - [`Sender`]: the `:nick!user@host` / `:server` prefix model.
//!
//! Nothing here knows about handlers, registries, or the connection state
//! machine; those live in the binary crate.

pub mod error;
pub mod line;
pub mod message;
pub mod prefix;

pub use error::{MessageParseError, ProtocolError};
pub use line::LineCodec;
pub use message::{Detail, Message};
pub use prefix::Sender;
