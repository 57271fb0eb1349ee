//! Registration handshake: NICK/USER, the MOTD wait, initial JOINs.

use banana_proto::{Message, ProtocolError};
use futures_util::{Stream, StreamExt};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::BotError;

use super::Connection;

/// Numeric that terminates the message of the day (RFC 2812).
const RPL_ENDOFMOTD: &str = "376";

/// Where the connection stands in the registration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Connected,
    Registering,
    AwaitingMotdEnd,
    Joining,
    Ready,
}

/// Drive a freshly-connected stream to ready.
///
/// There is deliberately no timeout: a server that never finishes its MOTD
/// stalls the bot, a documented limitation of the engine. Channels are
/// joined in configuration order without waiting for acknowledgment.
pub async fn run<S>(
    connection: &Connection,
    lines: &mut S,
    config: &ConnectionConfig,
) -> Result<(), BotError>
where
    S: Stream<Item = Result<String, ProtocolError>> + Unpin,
{
    let mut state = HandshakeState::Connected;
    debug!(?state, "connection established");

    state = HandshakeState::Registering;
    debug!(?state, "sending user information");
    connection.send(format!("NICK {}", config.nick))?;
    connection.send(format!("USER {} 0 * :{}", config.nick, config.nick))?;

    state = HandshakeState::AwaitingMotdEnd;
    debug!(?state, "waiting for the end of MOTD");
    loop {
        let line = match lines.next().await {
            Some(line) => line?,
            None => return Err(BotError::Disconnected),
        };
        match Message::parse(&line) {
            Ok(message) if message.command == RPL_ENDOFMOTD => break,
            // Everything up to 376 is MOTD or notice text: operator-visible,
            // never a protocol event.
            _ => info!(target: "motd", "{line}"),
        }
    }

    state = HandshakeState::Joining;
    debug!(?state, "joining channels");
    for channel in &config.channels {
        info!(channel = %channel, "joining");
        connection.send(format!("JOIN {channel}"))?;
    }

    state = HandshakeState::Ready;
    info!(?state, nick = %config.nick, "registration complete");
    Ok(())
}
