//! The one outbound stream and its writer task.

use std::sync::Arc;

use banana_proto::{LineCodec, Message};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{error, info};

use crate::config::ConnectionConfig;
use crate::error::BotError;

/// The read half of the framed connection; owned by exactly one task.
pub type LineReader = SplitStream<Framed<TcpStream, LineCodec>>;

type LineWriter = SplitSink<Framed<TcpStream, LineCodec>, String>;

/// Shared handle to the outbound side of the connection.
///
/// Every concurrently running handler funnels its writes through one mpsc
/// channel into a single writer task, so each queued line reaches the socket
/// as one atomic framed write; bytes from two replies can never interleave.
pub struct Connection {
    nick: String,
    out: mpsc::UnboundedSender<String>,
}

impl Connection {
    /// Open the TCP connection and spawn the writer task.
    ///
    /// Returns the shared handle and the read half; the caller drives the
    /// handshake and then the main loop with the reader.
    pub async fn open(config: &ConnectionConfig) -> Result<(Arc<Connection>, LineReader), BotError> {
        info!(host = %config.host, port = config.port, "connecting");
        let stream = TcpStream::connect((config.host.as_str(), config.port)).await?;
        let framed = Framed::new(stream, LineCodec::new());
        let (sink, reader) = framed.split();

        let (out, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(sink, rx));

        let connection = Arc::new(Connection {
            nick: config.nick.clone(),
            out,
        });
        Ok((connection, reader))
    }

    /// Build a connection handle around an arbitrary outbound channel.
    #[cfg(test)]
    pub(crate) fn detached(nick: &str, out: mpsc::UnboundedSender<String>) -> Arc<Connection> {
        Arc::new(Connection {
            nick: nick.to_owned(),
            out,
        })
    }

    /// Queue one raw line for the writer task.
    ///
    /// The codec guarantees the `\r\n` terminator, appending it only when
    /// the line does not already carry one.
    pub fn send(&self, line: impl Into<String>) -> Result<(), mpsc::error::SendError<String>> {
        self.out.send(line.into())
    }

    /// Reply to `message` with a PRIVMSG.
    ///
    /// The target is `params[0]`; when that is the bot's own nick the
    /// message was a direct message, so the reply is redirected to the
    /// sender's nick.
    pub fn reply(
        &self,
        message: &Message,
        text: &str,
    ) -> Result<(), mpsc::error::SendError<String>> {
        let target = match message.params.first() {
            Some(target) if *target != self.nick => target.as_str(),
            _ => match message.sender.nick() {
                Some(nick) => nick,
                // a server-originated line with no usable target; drop it
                None => return Ok(()),
            },
        };
        self.send(format!("PRIVMSG {target} :{text}"))
    }
}

/// Drain the outbound queue into the socket, one framed line per send.
async fn write_loop(mut sink: LineWriter, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = sink.send(line).await {
            error!(error = %e, "write failed, closing outbound queue");
            break;
        }
    }
}
