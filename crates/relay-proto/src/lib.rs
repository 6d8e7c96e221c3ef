//! IRC protocol library for relayd.
//!
//! Provides message parsing and serialization, the numeric response
//! catalog, RFC 1459 case mapping, and a line codec for framed transports.

pub mod casemap;
pub mod codec;
pub mod command;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;

pub use casemap::{irc_eq, irc_to_lower};
pub use codec::LineCodec;
pub use command::Command;
pub use error::ProtocolError;
pub use message::Message;
pub use prefix::Prefix;
pub use response::Response;

/// Maximum length of a raw IRC line, including the trailing CRLF.
pub const MAX_LINE_LEN: usize = 512;
