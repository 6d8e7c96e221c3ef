//! The IRC message type: an optional prefix plus a command.

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::error::ProtocolError;
use crate::prefix::Prefix;
use crate::response::Response;

/// A complete IRC message.
///
/// Serializes with `Display` (CRLF-terminated) and parses with `FromStr`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Message origin, present on server-to-client traffic.
    pub prefix: Option<Prefix>,
    /// The command carried by this message.
    pub command: Command,
}

impl Message {
    /// Attach a prefix, consuming self.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Message {
        self.prefix = Some(prefix);
        self
    }

    /// The numeric code, if this message is a server reply.
    pub fn response_code(&self) -> Option<u16> {
        match &self.command {
            Command::Response(resp, _) => Some(resp.code()),
            _ => None,
        }
    }

    /// Reply params, if this message is a server reply.
    pub fn response_args(&self) -> Option<&[String]> {
        match &self.command {
            Command::Response(_, args) => Some(args),
            _ => None,
        }
    }

    /// Nickname of the message origin, if it has a user prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Build a PRIVMSG.
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Message {
        Command::PRIVMSG(target.into(), text.into()).into()
    }

    /// Build a NOTICE.
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Message {
        Command::NOTICE(target.into(), text.into()).into()
    }

    /// Build a JOIN.
    pub fn join(channel: impl Into<String>) -> Message {
        Command::JOIN(channel.into()).into()
    }

    /// Build a PART.
    pub fn part(channel: impl Into<String>, reason: Option<String>) -> Message {
        Command::PART(channel.into(), reason).into()
    }

    /// Build a NICK.
    pub fn nick(nickname: impl Into<String>) -> Message {
        Command::NICK(nickname.into()).into()
    }

    /// Build an INVITE.
    pub fn invite(nickname: impl Into<String>, channel: impl Into<String>) -> Message {
        Command::INVITE(nickname.into(), channel.into()).into()
    }

    /// Build a QUIT.
    pub fn quit(reason: Option<String>) -> Message {
        Command::QUIT(reason).into()
    }

    /// Build a PONG answering the given origin.
    pub fn pong(origin: impl Into<String>) -> Message {
        Command::PONG(origin.into()).into()
    }

    /// Build a TOPIC change.
    pub fn topic(channel: impl Into<String>, text: impl Into<String>) -> Message {
        Command::TOPIC(channel.into(), Some(text.into())).into()
    }

    /// Build a MODE change or query.
    pub fn mode(target: impl Into<String>, modes: Option<String>) -> Message {
        Command::MODE(target.into(), modes).into()
    }

    /// Build a server ERROR, sent before closing a link.
    pub fn error(reason: impl Into<String>) -> Message {
        Command::ERROR(reason.into()).into()
    }
}

impl From<Command> for Message {
    fn from(command: Command) -> Message {
        Message {
            prefix: None,
            command,
        }
    }
}

impl From<Response> for Message {
    fn from(resp: Response) -> Message {
        Command::Response(resp, Vec::new()).into()
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return Err(ProtocolError::EmptyMessage);
        }

        let (prefix, rest) = match line.strip_prefix(':') {
            Some(rest) => {
                let (raw, rest) = rest
                    .split_once(' ')
                    .ok_or(ProtocolError::MissingCommand)?;
                (Some(Prefix::parse(raw)), rest.trim_start())
            }
            None => (None, line),
        };

        // Middle params never contain spaces, so the first " :" starts the
        // trailing param.
        let (head, trailing) = match rest.split_once(" :") {
            Some((head, trailing)) => (head, Some(trailing)),
            None => (rest, None),
        };

        let mut tokens = head.split_ascii_whitespace();
        let verb = tokens.next().ok_or(ProtocolError::MissingCommand)?;
        let mut args: Vec<String> = tokens.map(str::to_owned).collect();
        if let Some(trailing) = trailing {
            args.push(trailing.to_owned());
        }

        Ok(Message {
            prefix,
            command: Command::new(verb, args),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}\r\n", self.command)
    }
}
