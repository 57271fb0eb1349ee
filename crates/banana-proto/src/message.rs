//! IRC message parsing.
//!
//! One raw line becomes one [`Message`]: sender prefix, command verb, and
//! the exact parameter list the wire specified. The ` :`-delimited trailing
//! parameter is IRC's only way to embed spaces in a field, so it is kept as
//! a single element no matter how many spaces it contains.

use crate::error::MessageParseError;
use crate::prefix::Sender;

/// Convenience detail extracted for the verbs the engine cares about.
///
/// Everything else leaves `detail` unset; callers fall back to `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detail {
    /// JOIN, PART and QUIT carry a single channel-or-nick target.
    Membership {
        /// Channel (JOIN/PART) or quit target.
        target: String,
    },
    /// PRIVMSG: where the message went and what it said.
    Chat {
        /// Channel or nick the message was addressed to.
        target: String,
        /// Message body.
        text: String,
    },
    /// KICK: who was removed from where, and why.
    Kick {
        /// Channel the kick happened in.
        channel: String,
        /// Nick that was kicked.
        target: String,
        /// Kick reason.
        reason: String,
    },
}

/// One parsed inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Who sent the line.
    pub sender: Sender,
    /// Protocol verb, e.g. `PRIVMSG`, `JOIN`, or a numeric like `376`.
    pub command: String,
    /// Parameters exactly as the wire specified them.
    pub params: Vec<String>,
    /// Per-verb convenience detail; `None` for verbs outside the rule table.
    pub detail: Option<Detail>,
}

impl Message {
    /// Parse one raw line (trailing `\r\n` tolerated) into a message.
    pub fn parse(line: &str) -> Result<Message, MessageParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }

        let mut parts = line.splitn(3, ' ');
        let (Some(prefix), Some(command), Some(rest)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(MessageParseError::TruncatedMessage);
        };

        let prefix = prefix
            .strip_prefix(':')
            .ok_or(MessageParseError::MissingPrefix)?;
        let sender = Sender::parse(prefix)?;
        let params = split_params(rest);
        let detail = extract_detail(command, &params)?;

        Ok(Message {
            sender,
            command: command.to_owned(),
            params,
            detail,
        })
    }

    /// Channel or nick this message acts on (rule-table verbs only).
    pub fn target(&self) -> Option<&str> {
        match self.detail.as_ref()? {
            Detail::Membership { target }
            | Detail::Chat { target, .. }
            | Detail::Kick { target, .. } => Some(target),
        }
    }

    /// Message body (PRIVMSG only).
    pub fn text(&self) -> Option<&str> {
        match self.detail.as_ref()? {
            Detail::Chat { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Channel a kick happened in (KICK only).
    pub fn channel(&self) -> Option<&str> {
        match self.detail.as_ref()? {
            Detail::Kick { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Kick reason (KICK only).
    pub fn reason(&self) -> Option<&str> {
        match self.detail.as_ref()? {
            Detail::Kick { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Split the parameter string, honoring the ` :` trailing delimiter.
fn split_params(rest: &str) -> Vec<String> {
    match rest.split_once(" :") {
        Some((leading, trailing)) => {
            let mut params: Vec<String> = leading.split(' ').map(str::to_owned).collect();
            params.push(trailing.to_owned());
            params
        }
        None => rest.split(' ').map(str::to_owned).collect(),
    }
}

/// Apply the fixed rule table for convenience detail.
fn extract_detail(command: &str, params: &[String]) -> Result<Option<Detail>, MessageParseError> {
    let bad = |expected: usize| MessageParseError::BadParamCount {
        command: command.to_owned(),
        expected,
        got: params.len(),
    };

    let detail = match command {
        "JOIN" | "PART" | "QUIT" => match params {
            [target] => Detail::Membership {
                target: target.clone(),
            },
            _ => return Err(bad(1)),
        },
        "PRIVMSG" => match params {
            [target, text] => Detail::Chat {
                target: target.clone(),
                text: text.clone(),
            },
            _ => return Err(bad(2)),
        },
        "KICK" => match params {
            [channel, target, reason] => Detail::Kick {
                channel: channel.clone(),
                target: target.clone(),
                reason: reason.clone(),
            },
            _ => return Err(bad(3)),
        },
        _ => return Ok(None),
    };
    Ok(Some(detail))
}
