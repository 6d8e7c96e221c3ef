//! Protocol error types.

use thiserror::Error;

/// Errors produced while parsing or framing IRC messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The input line was empty after stripping line endings.
    #[error("empty message")]
    EmptyMessage,

    /// The line had a `:` prefix marker but no command after it.
    #[error("message has no command")]
    MissingCommand,

    /// A line exceeded the 512-byte protocol limit.
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// Underlying transport failure while framing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
