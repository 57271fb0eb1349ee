//! Pasting text to termbin and the commands built on it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::info;

use crate::error::{HandlerError, HandlerResult};
use crate::event::Event;

use super::{ChannelLogs, CommandHandler};

const TERMBIN_ADDR: &str = "termbin.com:9999";

/// Send `lines` to termbin and return the paste URL.
pub async fn termbin<I, S>(lines: I) -> Result<String, HandlerError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stream = TcpStream::connect(TERMBIN_ADDR).await?;
    let mut count = 0usize;
    for line in lines {
        stream.write_all(line.as_ref().as_bytes()).await?;
        stream.write_all(b"\n").await?;
        count += 1;
    }
    info!(lines = count, "pasted to termbin");

    // Half-close so termbin knows the paste is complete, then read the URL.
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(String::from_utf8_lossy(&response).trim().to_owned())
}

/// `!log [CHANNEL]`: paste a channel's log buffer.
pub struct LogCommand {
    logs: Arc<ChannelLogs>,
}

impl LogCommand {
    pub fn new(logs: Arc<ChannelLogs>) -> Arc<Self> {
        Arc::new(Self { logs })
    }
}

#[async_trait]
impl CommandHandler for LogCommand {
    async fn invoke(&self, event: Event, mut args: Vec<String>) -> HandlerResult {
        let explicit = args.pop();
        let channel = match &explicit {
            Some(channel) => channel.clone(),
            None => event.target().unwrap_or_default().to_owned(),
        };

        let lines = self.logs.lines(&channel).await.unwrap_or_default();
        if lines.is_empty() {
            // termbin answers "Use netcat." to an empty paste; say something
            // more useful instead.
            let mut reply = format!("Nothing is logged from {channel} yet!");
            if explicit.is_none() {
                reply.push_str(" You can use '!log CHANNEL' to get logs from a specific channel.");
            }
            return event.reply(&reply);
        }

        let url = termbin(&lines).await?;
        event.reply(&url)
    }
}

/// `!src`: paste the bot's own source files.
pub struct SrcCommand;

impl SrcCommand {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl CommandHandler for SrcCommand {
    async fn invoke(&self, event: Event, _args: Vec<String>) -> HandlerResult {
        event.reply("I'm termbinning myself, please wait...")?;

        let mut results = Vec::new();
        let paths = glob::glob("src/**/*.rs").map_err(anyhow::Error::from)?;
        for entry in paths {
            let path = entry.map_err(anyhow::Error::from)?;
            let contents = tokio::fs::read_to_string(&path).await?;
            let url = termbin(contents.lines()).await?;
            results.push(format!("{}: {}", path.display(), url));
        }

        if results.is_empty() {
            return Err(HandlerError::invalid("no source files found"));
        }
        event.reply(&results.join("   "))
    }
}
