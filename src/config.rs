//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

/// Top-level bot configuration, loaded from a TOML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub eval: EvalConfig,
}

/// The connection surface: nick, channels, host, port.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    pub nick: String,
    /// Channels to join at startup, in order.
    pub channels: Vec<String>,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    6667
}

/// Where channel logs live.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("irclogs"),
        }
    }
}

/// Remote code evaluation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EvalConfig {
    /// File holding the eval API secret; eval is disabled when absent.
    pub key_path: PathBuf,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            key_path: PathBuf::from("replit-api-key.txt"),
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Config> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

        if config.connection.nick.is_empty() {
            anyhow::bail!("connection.nick must not be empty");
        }
        if config.connection.host.is_empty() {
            anyhow::bail!("connection.host must not be empty");
        }

        Ok(config)
    }
}
