//! Channel logging: per-channel ring buffers persisted across restarts.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use crate::error::HandlerResult;
use crate::event::Event;

use super::EventHandler;

/// Lines kept per channel.
const LOG_LEN: usize = 1000;

/// Per-channel in-memory logs, shared by every logging handler.
///
/// Handler invocations run concurrently and the dispatch core provides no
/// locking around shared state, so this module serializes its own buffer
/// access with a mutex.
pub struct ChannelLogs {
    dir: PathBuf,
    buffers: Mutex<HashMap<String, VecDeque<String>>>,
}

impl ChannelLogs {
    pub fn new(dir: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            dir: dir.into(),
            buffers: Mutex::new(HashMap::new()),
        })
    }

    fn file_for(&self, channel: &str) -> PathBuf {
        self.dir.join(format!("{channel}.txt"))
    }

    fn stamp(line: &str) -> String {
        format!("[{}] {}", Local::now().format("%d %b %H:%M:%S"), line)
    }

    /// Append one line to a channel's buffer, timestamped.
    ///
    /// The first time a channel is seen its buffer is seeded from the
    /// on-disk log, so restarts keep history.
    pub async fn record(&self, channel: &str, line: &str) {
        let mut buffers = self.buffers.lock().await;
        if !buffers.contains_key(channel) {
            let seeded: VecDeque<String> = match fs::read_to_string(self.file_for(channel)).await {
                Ok(contents) => contents.lines().map(str::to_owned).collect(),
                // First run for this channel, nothing logged yet.
                Err(_) => VecDeque::new(),
            };
            buffers.insert(channel.to_owned(), seeded);
        }

        if let Some(buffer) = buffers.get_mut(channel) {
            buffer.push_back(Self::stamp(line));
            while buffer.len() > LOG_LEN {
                buffer.pop_front();
            }
        }
    }

    /// Lines currently buffered for a channel, oldest first.
    pub async fn lines(&self, channel: &str) -> Option<Vec<String>> {
        self.buffers
            .lock()
            .await
            .get(channel)
            .map(|buffer| buffer.iter().cloned().collect())
    }

    /// Write every buffer back to disk with a shutdown marker.
    pub async fn save(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let mut buffers = self.buffers.lock().await;
        for (channel, buffer) in buffers.iter_mut() {
            buffer.push_back(Self::stamp("* Shutting down."));
            let mut file = fs::File::create(self.file_for(channel)).await?;
            for line in buffer.iter() {
                file.write_all(line.as_bytes()).await?;
                file.write_all(b"\n").await?;
            }
            file.flush().await?;
        }
        info!(dir = %self.dir.display(), channels = buffers.len(), "saved channel logs");
        Ok(())
    }
}

/// Logs channel messages as `<nick> text`.
pub struct PrivmsgLogger {
    logs: Arc<ChannelLogs>,
}

impl PrivmsgLogger {
    pub fn new(logs: Arc<ChannelLogs>) -> Arc<Self> {
        Arc::new(Self { logs })
    }
}

#[async_trait]
impl EventHandler for PrivmsgLogger {
    async fn handle(&self, event: Event) -> HandlerResult {
        if let (Some(target), Some(text)) = (event.target(), event.text()) {
            let nick = event.sender().nick().unwrap_or("?");
            self.logs.record(target, &format!("<{nick}> {text}")).await;
        }
        Ok(())
    }
}

/// Logs JOIN/PART/QUIT as `* nick joins` and friends.
pub struct MembershipLogger {
    logs: Arc<ChannelLogs>,
}

impl MembershipLogger {
    pub fn new(logs: Arc<ChannelLogs>) -> Arc<Self> {
        Arc::new(Self { logs })
    }
}

#[async_trait]
impl EventHandler for MembershipLogger {
    async fn handle(&self, event: Event) -> HandlerResult {
        if let Some(target) = event.target() {
            let nick = event.sender().nick().unwrap_or("?");
            let verb = event.command().to_lowercase();
            self.logs.record(target, &format!("* {nick} {verb}s")).await;
        }
        Ok(())
    }
}

/// Logs kicks with the reason.
pub struct KickLogger {
    logs: Arc<ChannelLogs>,
}

impl KickLogger {
    pub fn new(logs: Arc<ChannelLogs>) -> Arc<Self> {
        Arc::new(Self { logs })
    }
}

#[async_trait]
impl EventHandler for KickLogger {
    async fn handle(&self, event: Event) -> HandlerResult {
        if let (Some(channel), Some(target), Some(reason)) =
            (event.channel(), event.target(), event.reason())
        {
            let nick = event.sender().nick().unwrap_or("?");
            self.logs
                .record(channel, &format!("{nick} kicks {target} (reason: {reason})"))
                .await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Connection;
    use banana_proto::Message;
    use tokio::sync::mpsc;

    fn event_for(line: &str) -> Event {
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection = Connection::detached("bot", tx);
        Event::new(Message::parse(line).unwrap(), connection)
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let logs = ChannelLogs::new(dir.path());

        logs.record("#chan", "<alice> hi").await;
        logs.record("#chan", "<bob> hello").await;

        let lines = logs.lines("#chan").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("<alice> hi"));
        assert!(lines[1].ends_with("<bob> hello"));
        assert!(logs.lines("#other").await.is_none());
    }

    #[tokio::test]
    async fn test_buffer_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let logs = ChannelLogs::new(dir.path());

        for i in 0..(LOG_LEN + 5) {
            logs.record("#chan", &format!("line {i}")).await;
        }
        let lines = logs.lines("#chan").await.unwrap();
        assert_eq!(lines.len(), LOG_LEN);
        assert!(lines[0].ends_with("line 5"));
    }

    #[tokio::test]
    async fn test_save_and_reseed() {
        let dir = tempfile::tempdir().unwrap();
        {
            let logs = ChannelLogs::new(dir.path());
            logs.record("#chan", "<alice> before restart").await;
            logs.save().await.unwrap();
        }

        let logs = ChannelLogs::new(dir.path());
        logs.record("#chan", "<bob> after restart").await;
        let lines = logs.lines("#chan").await.unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("<alice> before restart"));
        assert!(lines[1].ends_with("* Shutting down."));
        assert!(lines[2].ends_with("<bob> after restart"));
    }

    #[tokio::test]
    async fn test_privmsg_logger_format() {
        let dir = tempfile::tempdir().unwrap();
        let logs = ChannelLogs::new(dir.path());
        let logger = PrivmsgLogger::new(Arc::clone(&logs));

        logger
            .handle(event_for(":alice!a@h PRIVMSG #chan :hello there"))
            .await
            .unwrap();

        let lines = logs.lines("#chan").await.unwrap();
        assert!(lines[0].ends_with("<alice> hello there"));
    }

    #[tokio::test]
    async fn test_membership_and_kick_logger_formats() {
        let dir = tempfile::tempdir().unwrap();
        let logs = ChannelLogs::new(dir.path());

        MembershipLogger::new(Arc::clone(&logs))
            .handle(event_for(":alice!a@h JOIN #chan"))
            .await
            .unwrap();
        KickLogger::new(Arc::clone(&logs))
            .handle(event_for(":op!o@h KICK #chan alice :flooding"))
            .await
            .unwrap();

        let lines = logs.lines("#chan").await.unwrap();
        assert!(lines[0].ends_with("* alice joins"));
        assert!(lines[1].ends_with("op kicks alice (reason: flooding)"));
    }
}
