//! Error types for the wire protocol layer.

use thiserror::Error;

/// Convenience alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Stream-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error while reading or writing the connection.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line exceeded the framing limit.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    LineTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// A line could not be parsed into a message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The offending line.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Reasons a raw line cannot be parsed into a [`Message`](crate::Message).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Fewer than three space-separated top-level parts.
    #[error("truncated message: expected prefix, command and parameters")]
    TruncatedMessage,

    /// The sender prefix did not start with `:`.
    #[error("missing ':' before sender prefix")]
    MissingPrefix,

    /// The sender prefix had a `!` but no `@`, or was otherwise unusable.
    #[error("invalid sender prefix: {0}")]
    InvalidPrefix(String),

    /// A known command verb arrived with the wrong parameter count.
    ///
    /// The fixed rule table (JOIN/PART/QUIT, PRIVMSG, KICK) pins the arity of
    /// these verbs; a mismatch is a protocol invariant violation, not
    /// something a caller can recover the message from.
    #[error("{command} carries {got} parameters, expected {expected}")]
    BadParamCount {
        /// The command verb.
        command: String,
        /// Expected parameter count.
        expected: usize,
        /// Actual parameter count.
        got: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::LineTooLong {
            actual: 600,
            limit: 512,
        };
        assert_eq!(format!("{}", err), "line too long: 600 bytes (limit: 512)");

        let err = MessageParseError::BadParamCount {
            command: "PRIVMSG".into(),
            expected: 2,
            got: 1,
        };
        assert_eq!(
            format!("{}", err),
            "PRIVMSG carries 1 parameters, expected 2"
        );
    }

    #[test]
    fn test_error_source_chaining() {
        let err = ProtocolError::InvalidMessage {
            string: "garbage".into(),
            cause: MessageParseError::MissingPrefix,
        };
        let source = std::error::Error::source(&err).expect("source should be set");
        assert_eq!(source.to_string(), "missing ':' before sender prefix");
    }
}
