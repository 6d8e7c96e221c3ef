//! IRC client commands.
//!
//! `Command` is a closed enum over the commands this server understands.
//! Anything else (or a known command with the wrong shape) parses into
//! `Command::Raw`, letting the dispatch layer answer with a numeric instead
//! of dropping the line.

use std::fmt;

use crate::response::Response;

/// A parsed IRC command with its typed arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// NICK `<nickname>`
    NICK(String),
    /// USER `<username> <mode> * <realname>`
    USER(String, String, String),
    /// JOIN `<channel>`
    JOIN(String),
    /// PART `<channel> [reason]`
    PART(String, Option<String>),
    /// PRIVMSG `<target> <text>`
    PRIVMSG(String, String),
    /// NOTICE `<target> <text>`
    NOTICE(String, String),
    /// NAMES `[channel]`
    NAMES(Option<String>),
    /// MODE `<target> [modestring]`
    MODE(String, Option<String>),
    /// INVITE `<nickname> <channel>`
    INVITE(String, String),
    /// TOPIC `<channel> [topic]`
    TOPIC(String, Option<String>),
    /// QUIT `[reason]`
    QUIT(Option<String>),
    /// PING `<server1>`
    PING(String),
    /// PONG `<server1>`
    PONG(String),
    /// ERROR `<reason>` (server-to-client, on fatal close)
    ERROR(String),
    /// Numeric server reply.
    Response(Response, Vec<String>),
    /// Anything unrecognized, or a known verb with bad arity.
    Raw(String, Vec<String>),
}

impl Command {
    /// Build a command from a verb and its arguments.
    ///
    /// The verb is matched case-insensitively. Arity mismatches fall back to
    /// `Raw` rather than failing, so a malformed line never kills parsing.
    pub fn new(cmd: &str, args: Vec<String>) -> Command {
        let verb = cmd.to_uppercase();

        if let Ok(resp) = verb.parse::<Response>() {
            return Command::Response(resp, args);
        }

        let raw = |args: Vec<String>| Command::Raw(verb.clone(), args);

        match verb.as_str() {
            "NICK" => match args.len() {
                1 => Command::NICK(take1(args)),
                _ => raw(args),
            },
            "USER" => match args.len() {
                4 => {
                    let mut it = args.into_iter();
                    let user = it.next().unwrap_or_default();
                    let mode = it.next().unwrap_or_default();
                    let realname = it.nth(1).unwrap_or_default();
                    Command::USER(user, mode, realname)
                }
                _ => raw(args),
            },
            "JOIN" => match args.len() {
                // Key parameter accepted and ignored.
                1 | 2 => Command::JOIN(args.into_iter().next().unwrap_or_default()),
                _ => raw(args),
            },
            "PART" => match args.len() {
                1 => Command::PART(take1(args), None),
                2 => {
                    let mut it = args.into_iter();
                    let chan = it.next().unwrap_or_default();
                    Command::PART(chan, it.next())
                }
                _ => raw(args),
            },
            "PRIVMSG" => match args.len() {
                2 => {
                    let mut it = args.into_iter();
                    let target = it.next().unwrap_or_default();
                    Command::PRIVMSG(target, it.next().unwrap_or_default())
                }
                _ => raw(args),
            },
            "NOTICE" => match args.len() {
                2 => {
                    let mut it = args.into_iter();
                    let target = it.next().unwrap_or_default();
                    Command::NOTICE(target, it.next().unwrap_or_default())
                }
                _ => raw(args),
            },
            "NAMES" => match args.len() {
                0 => Command::NAMES(None),
                1 => Command::NAMES(Some(take1(args))),
                _ => raw(args),
            },
            "MODE" => match args.len() {
                1 => Command::MODE(take1(args), None),
                2 => {
                    let mut it = args.into_iter();
                    let target = it.next().unwrap_or_default();
                    Command::MODE(target, it.next())
                }
                _ => raw(args),
            },
            "INVITE" => match args.len() {
                2 => {
                    let mut it = args.into_iter();
                    let nick = it.next().unwrap_or_default();
                    Command::INVITE(nick, it.next().unwrap_or_default())
                }
                _ => raw(args),
            },
            "TOPIC" => match args.len() {
                1 => Command::TOPIC(take1(args), None),
                2 => {
                    let mut it = args.into_iter();
                    let chan = it.next().unwrap_or_default();
                    Command::TOPIC(chan, it.next())
                }
                _ => raw(args),
            },
            "QUIT" => match args.len() {
                0 => Command::QUIT(None),
                1 => Command::QUIT(Some(take1(args))),
                _ => raw(args),
            },
            "PING" => match args.len() {
                1 | 2 => Command::PING(args.into_iter().next().unwrap_or_default()),
                _ => raw(args),
            },
            "PONG" => match args.len() {
                1 | 2 => Command::PONG(args.into_iter().next().unwrap_or_default()),
                _ => raw(args),
            },
            "ERROR" => match args.len() {
                1 => Command::ERROR(take1(args)),
                _ => raw(args),
            },
            _ => raw(args),
        }
    }

    /// The command verb, as it appears on the wire.
    pub fn verb(&self) -> &str {
        match self {
            Command::NICK(..) => "NICK",
            Command::USER(..) => "USER",
            Command::JOIN(..) => "JOIN",
            Command::PART(..) => "PART",
            Command::PRIVMSG(..) => "PRIVMSG",
            Command::NOTICE(..) => "NOTICE",
            Command::NAMES(..) => "NAMES",
            Command::MODE(..) => "MODE",
            Command::INVITE(..) => "INVITE",
            Command::TOPIC(..) => "TOPIC",
            Command::QUIT(..) => "QUIT",
            Command::PING(..) => "PING",
            Command::PONG(..) => "PONG",
            Command::ERROR(..) => "ERROR",
            Command::Response(..) => "",
            Command::Raw(verb, _) => verb,
        }
    }
}

/// Check if a string must be colon-prefixed as a trailing argument.
fn needs_colon(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

fn take1(args: Vec<String>) -> String {
    args.into_iter().next().unwrap_or_default()
}

/// Write `cmd` plus args; the last arg gets a `:` only when it needs one.
fn write_cmd(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((trailing, middle)) = args.split_last() {
        for arg in middle {
            write!(f, " {arg}")?;
        }
        if needs_colon(trailing) {
            write!(f, " :{trailing}")?;
        } else {
            write!(f, " {trailing}")?;
        }
    }
    Ok(())
}

/// Write `cmd` plus args; the last arg is freeform and always gets a `:`.
fn write_cmd_freeform(f: &mut fmt::Formatter<'_>, cmd: &str, args: &[&str]) -> fmt::Result {
    f.write_str(cmd)?;
    if let Some((trailing, middle)) = args.split_last() {
        for arg in middle {
            write!(f, " {arg}")?;
        }
        write!(f, " :{trailing}")?;
    }
    Ok(())
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::NICK(nick) => write_cmd(f, "NICK", &[nick]),
            Command::USER(user, mode, realname) => {
                write_cmd_freeform(f, "USER", &[user, mode, "*", realname])
            }
            Command::JOIN(chan) => write_cmd(f, "JOIN", &[chan]),
            Command::PART(chan, None) => write_cmd(f, "PART", &[chan]),
            Command::PART(chan, Some(reason)) => write_cmd_freeform(f, "PART", &[chan, reason]),
            Command::PRIVMSG(target, text) => write_cmd_freeform(f, "PRIVMSG", &[target, text]),
            Command::NOTICE(target, text) => write_cmd_freeform(f, "NOTICE", &[target, text]),
            Command::NAMES(None) => write_cmd(f, "NAMES", &[]),
            Command::NAMES(Some(chan)) => write_cmd(f, "NAMES", &[chan]),
            Command::MODE(target, None) => write_cmd(f, "MODE", &[target]),
            Command::MODE(target, Some(modes)) => write_cmd(f, "MODE", &[target, modes]),
            Command::INVITE(nick, chan) => write_cmd(f, "INVITE", &[nick, chan]),
            Command::TOPIC(chan, None) => write_cmd(f, "TOPIC", &[chan]),
            Command::TOPIC(chan, Some(topic)) => write_cmd_freeform(f, "TOPIC", &[chan, topic]),
            Command::QUIT(None) => write_cmd(f, "QUIT", &[]),
            Command::QUIT(Some(reason)) => write_cmd_freeform(f, "QUIT", &[reason]),
            Command::PING(origin) => write_cmd(f, "PING", &[origin]),
            Command::PONG(origin) => write_cmd(f, "PONG", &[origin]),
            Command::ERROR(reason) => write_cmd_freeform(f, "ERROR", &[reason]),
            Command::Response(resp, args) => {
                let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                write!(f, "{resp}")?;
                if let Some((trailing, middle)) = refs.split_last() {
                    for arg in middle {
                        write!(f, " {arg}")?;
                    }
                    write!(f, " :{trailing}")?;
                }
                Ok(())
            }
            Command::Raw(verb, args) => {
                let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                write_cmd(f, verb, &refs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cmd: &str, args: &[&str]) -> Command {
        Command::new(cmd, args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn verb_is_case_insensitive() {
        assert_eq!(parse("nick", &["test"]), Command::NICK("test".into()));
        assert_eq!(
            parse("PrivMsg", &["#test", "hi"]),
            Command::PRIVMSG("#test".into(), "hi".into())
        );
    }

    #[test]
    fn user_takes_first_and_trailing() {
        assert_eq!(
            parse("USER", &["u", "0", "*", "Real Name"]),
            Command::USER("u".into(), "0".into(), "Real Name".into())
        );
    }

    #[test]
    fn arity_mismatch_falls_back_to_raw() {
        assert_eq!(
            parse("NICK", &[]),
            Command::Raw("NICK".into(), vec![])
        );
        assert_eq!(
            parse("INVITE", &["onlynick"]),
            Command::Raw("INVITE".into(), vec!["onlynick".into()])
        );
    }

    #[test]
    fn unknown_verb_is_raw() {
        assert_eq!(
            parse("WHOWAS", &["x"]),
            Command::Raw("WHOWAS".into(), vec!["x".into()])
        );
    }

    #[test]
    fn numeric_verb_parses_to_response() {
        assert_eq!(
            parse("433", &["*", "test", "Nickname is already in use"]),
            Command::Response(
                Response::ERR_NICKNAMEINUSE,
                vec!["*".into(), "test".into(), "Nickname is already in use".into()]
            )
        );
    }

    #[test]
    fn display_trailing_colon_rules() {
        assert_eq!(
            Command::PRIVMSG("#test".into(), "Hello World!".into()).to_string(),
            "PRIVMSG #test :Hello World!"
        );
        // Freeform trailing keeps the colon even for one word.
        assert_eq!(
            Command::PRIVMSG("test1".into(), "hi".into()).to_string(),
            "PRIVMSG test1 :hi"
        );
        assert_eq!(Command::JOIN("#test".into()).to_string(), "JOIN #test");
        assert_eq!(
            Command::Response(Response::RPL_ENDOFNAMES, vec![
                "test".into(),
                "#test".into(),
                "End of /NAMES list".into()
            ])
            .to_string(),
            "366 test #test :End of /NAMES list"
        );
    }
}
