//! IRC message prefix: the origin of a message.
//!
//! A prefix is either a server name or a user's `nick!user@host` mask.

use std::fmt;

/// Origin of an IRC message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Prefix {
    /// Server name (e.g. `irc.example.com`).
    ServerName(String),
    /// User mask: (nickname, username, hostname).
    Nickname(String, String, String),
}

impl Prefix {
    /// Shorthand for a full user mask prefix.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Lenient prefix parser.
    ///
    /// A bare name containing a dot is taken to be a server name; anything
    /// else is a user prefix, with `!` and `@` splitting off the user and
    /// host parts when present.
    pub fn parse(s: &str) -> Self {
        let (name, rest) = match s.split_once('!') {
            Some((n, r)) => (n, Some(r)),
            None => match s.split_once('@') {
                Some((n, h)) => return Prefix::Nickname(n.to_owned(), String::new(), h.to_owned()),
                None => (s, None),
            },
        };

        match rest {
            Some(rest) => {
                let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
                Prefix::Nickname(name.to_owned(), user.to_owned(), host.to_owned())
            }
            None if name.contains('.') => Prefix::ServerName(name.to_owned()),
            None => Prefix::Nickname(name.to_owned(), String::new(), String::new()),
        }
    }

    /// Nickname, if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Username, if this is a user prefix.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// Hostname: the server name, or the host part of a user mask.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::parse(s)
    }
}
