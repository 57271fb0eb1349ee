//! Remote code evaluation via the repl.it eval API.
//!
//! The API authenticates with an HMAC-SHA256 token over the current epoch
//! milliseconds, base64-encoded and prefixed with the timestamp. Tokens are
//! cached and regenerated when they approach the five-day expiry.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::{HandlerError, HandlerResult};
use crate::event::Event;

use super::CommandHandler;

const EVAL_URL: &str = "https://api.repl.it/eval";
const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 5);

/// Eval API client with a cached, time-limited auth token.
///
/// The key file is read lazily on first use; when it is missing the feature
/// stays disabled with a warning instead of failing the command pipeline.
pub struct Evaluator {
    key_path: PathBuf,
    http: reqwest::Client,
    token: Mutex<Option<String>>,
}

impl Evaluator {
    pub fn new(key_path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            key_path: key_path.into(),
            http: reqwest::Client::new(),
            token: Mutex::new(None),
        })
    }

    fn epoch_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            * 1000
    }

    fn generate_token(key: &str) -> Result<String, HandlerError> {
        let now = Self::epoch_millis();
        let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
            .map_err(|e| HandlerError::invalid(format!("unusable API key: {e}")))?;
        mac.update(now.to_string().as_bytes());
        let sig = BASE64.encode(mac.finalize().into_bytes());
        Ok(format!("{now}:{sig}"))
    }

    fn is_stale(token: &str) -> bool {
        let millis: u64 = token
            .split(':')
            .next()
            .and_then(|stamp| stamp.parse().ok())
            .unwrap_or(0);
        let minted = UNIX_EPOCH + Duration::from_millis(millis);
        SystemTime::now()
            .duration_since(minted)
            .map(|age| age >= TOKEN_LIFETIME)
            .unwrap_or(true)
    }

    /// Current token, regenerated when missing or stale; `None` when the
    /// key file is unavailable.
    async fn token(&self) -> Result<Option<String>, HandlerError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if !Self::is_stale(token) {
                return Ok(Some(token.clone()));
            }
        }

        let key = match tokio::fs::read_to_string(&self.key_path).await {
            Ok(key) => key.trim().to_owned(),
            Err(_) => {
                warn!(
                    path = %self.key_path.display(),
                    "cannot read API key, code evaluation disabled"
                );
                return Ok(None);
            }
        };

        let token = Self::generate_token(&key)?;
        *cached = Some(token.clone());
        Ok(Some(token))
    }

    /// Run `code` remotely; `Ok(None)` means eval is disabled.
    pub async fn evaluate(
        &self,
        language: &str,
        code: &str,
    ) -> Result<Option<String>, HandlerError> {
        let Some(token) = self.token().await? else {
            return Ok(None);
        };

        let response: Vec<Value> = self
            .http
            .post(EVAL_URL)
            .form(&[
                ("auth", token.as_str()),
                ("language", language),
                ("code", code),
            ])
            .send()
            .await?
            .json()
            .await?;

        let mut output = String::new();
        let mut result = String::new();
        for item in &response {
            let data = item.get("data").and_then(Value::as_str).unwrap_or_default();
            match item.get("command").and_then(Value::as_str) {
                Some("output") => output.push_str(data),
                Some("result") => result.push_str(data),
                _ => {}
            }
        }
        Ok(Some(format!("{output}{result}")))
    }
}

/// `!eval LANGUAGE CODE`: run one token of code remotely.
pub struct EvalCommand {
    evaluator: Arc<Evaluator>,
}

impl EvalCommand {
    pub fn new(evaluator: Arc<Evaluator>) -> Arc<Self> {
        Arc::new(Self { evaluator })
    }
}

#[async_trait]
impl CommandHandler for EvalCommand {
    async fn invoke(&self, event: Event, args: Vec<String>) -> HandlerResult {
        let mut args = args.into_iter();
        let language = args.next().unwrap_or_default();
        let code = args.next().unwrap_or_default();

        match self.evaluator.evaluate(&language, &code).await? {
            Some(text) => {
                // One reply line; whitespace runs (including newlines in the
                // program's output) collapse to single spaces.
                let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if flat.is_empty() {
                    event.reply("(no output)")
                } else {
                    event.reply(&flat)
                }
            }
            None => event.reply("Code evaluation is disabled (no API key)."),
        }
    }
}
