//! bananabot - an async IRC bot engine with concurrent handler dispatch.
//!
//! One connection, one reader task, fire-and-forget handler execution.

mod config;
mod error;
mod event;
mod handlers;
mod network;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::handlers::{
    ChannelLogs, CommandDispatcher, CommandRegistry, EvalCommand, Evaluator, HandlerRegistry,
    KickLogger, LogCommand, MembershipLogger, Param, PrivmsgLogger, SrcCommand, register_help,
};
use crate::network::{Connection, event_loop, handshake};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(
        nick = %config.connection.nick,
        host = %config.connection.host,
        channels = config.connection.channels.len(),
        "starting bananabot"
    );

    let handlers = HandlerRegistry::new();
    let commands = CommandRegistry::new();

    // The command dispatcher is itself an ordinary PRIVMSG handler.
    handlers.register("PRIVMSG", CommandDispatcher::new(Arc::clone(&commands)));

    // Channel logging collaborators.
    let logs = ChannelLogs::new(&config.logging.dir);
    handlers.register("PRIVMSG", PrivmsgLogger::new(Arc::clone(&logs)));
    for command in ["JOIN", "PART", "QUIT"] {
        handlers.register(command, MembershipLogger::new(Arc::clone(&logs)));
    }
    handlers.register("KICK", KickLogger::new(Arc::clone(&logs)));

    // Chat commands.
    commands.register(
        "!log",
        &[Param::optional("channel")],
        Some("Termbin the log of the channel."),
        LogCommand::new(Arc::clone(&logs)),
    );
    commands.register(
        "!src",
        &[],
        Some("Pastebin the source code for this bot."),
        SrcCommand::new(),
    );
    commands.register(
        "!eval",
        &[Param::required("language"), Param::required("code")],
        Some("Evaluate one token of code remotely."),
        EvalCommand::new(Evaluator::new(&config.eval.key_path)),
    );
    register_help(&commands, "!help");

    let (connection, mut lines) = Connection::open(&config.connection).await?;
    handshake::run(&connection, &mut lines, &config.connection).await?;

    let result = tokio::select! {
        result = event_loop::run(Arc::clone(&connection), &mut lines, Arc::clone(&handlers)) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted, shutting down");
            Ok(())
        }
    };

    if let Err(e) = logs.save().await {
        error!(error = %e, "failed to save channel logs");
    }

    result.map_err(Into::into)
}
