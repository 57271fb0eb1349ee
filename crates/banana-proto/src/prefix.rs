//! Sender prefixes: who a message came from.
//!
//! An inbound line starts with `:prefix`. A prefix containing `!` is a user
//! mask (`nick!user@host`); anything else is a server name.

use std::fmt;

use crate::error::MessageParseError;

/// The origin of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    /// A user, identified by the full `nick!user@host` mask.
    User {
        /// Nickname.
        nick: String,
        /// Username (ident).
        user: String,
        /// Hostname.
        host: String,
    },
    /// A server, identified by hostname alone.
    Server {
        /// Server hostname.
        host: String,
    },
}

impl Sender {
    /// Parse a prefix with the leading `:` already stripped.
    ///
    /// Splits once on `!`, then once on `@`. A prefix without `!` is a
    /// server; one with `!` but no `@` is malformed.
    pub fn parse(s: &str) -> Result<Self, MessageParseError> {
        match s.split_once('!') {
            Some((nick, rest)) => {
                let (user, host) = rest
                    .split_once('@')
                    .ok_or_else(|| MessageParseError::InvalidPrefix(s.to_owned()))?;
                Ok(Sender::User {
                    nick: nick.to_owned(),
                    user: user.to_owned(),
                    host: host.to_owned(),
                })
            }
            None => Ok(Sender::Server { host: s.to_owned() }),
        }
    }

    /// The nickname, if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Sender::User { nick, .. } => Some(nick),
            Sender::Server { .. } => None,
        }
    }

    /// The hostname, present for both prefix kinds.
    pub fn host(&self) -> &str {
        match self {
            Sender::User { host, .. } | Sender::Server { host } => host,
        }
    }

    /// Whether this prefix names a server rather than a user.
    pub fn is_server(&self) -> bool {
        matches!(self, Sender::Server { .. })
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User { nick, user, host } => write!(f, "{nick}!{user}@{host}"),
            Sender::Server { host } => write!(f, "{host}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_mask() {
        let sender = Sender::parse("nick!user@host.example.com").unwrap();
        assert_eq!(
            sender,
            Sender::User {
                nick: "nick".into(),
                user: "user".into(),
                host: "host.example.com".into(),
            }
        );
        assert_eq!(sender.nick(), Some("nick"));
        assert_eq!(sender.host(), "host.example.com");
        assert!(!sender.is_server());
    }

    #[test]
    fn test_parse_server() {
        let sender = Sender::parse("irc.example.com").unwrap();
        assert_eq!(
            sender,
            Sender::Server {
                host: "irc.example.com".into()
            }
        );
        assert_eq!(sender.nick(), None);
        assert!(sender.is_server());
    }

    #[test]
    fn test_parse_bang_without_at_is_malformed() {
        let err = Sender::parse("nick!user").unwrap_err();
        assert!(matches!(err, MessageParseError::InvalidPrefix(_)));
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(
            Sender::parse("a!b@c").unwrap().to_string(),
            "a!b@c".to_string()
        );
        assert_eq!(
            Sender::parse("irc.test").unwrap().to_string(),
            "irc.test".to_string()
        );
    }
}
