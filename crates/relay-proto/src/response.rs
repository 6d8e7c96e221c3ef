//! IRC numeric response codes and reply constructors.
//!
//! The `Response` enum covers the numerics this server emits. Constructors
//! on `Response` build fully-formed reply `Message`s with the canonical
//! RFC 2812 text, which clients pattern-match on and which therefore must
//! not drift.

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

use crate::command::Command;
use crate::message::Message;

/// IRC server response code.
///
/// - 001-099: connection/registration
/// - 200-399: command replies
/// - 400-599: error replies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Response {
    /// 001 - Welcome to the IRC network
    RPL_WELCOME = 1,
    /// 002 - Your host is running version
    RPL_YOURHOST = 2,
    /// 003 - Server creation date
    RPL_CREATED = 3,
    /// 004 - Server info (name, version, user modes, channel modes)
    RPL_MYINFO = 4,
    /// 324 - Channel mode is
    RPL_CHANNELMODEIS = 324,
    /// 331 - No topic set
    RPL_NOTOPIC = 331,
    /// 332 - Channel topic
    RPL_TOPIC = 332,
    /// 341 - Invite confirmation
    RPL_INVITING = 341,
    /// 353 - Names reply
    RPL_NAMREPLY = 353,
    /// 366 - End of names list
    RPL_ENDOFNAMES = 366,
    /// 372 - MOTD line
    RPL_MOTD = 372,
    /// 375 - MOTD start
    RPL_MOTDSTART = 375,
    /// 376 - End of MOTD
    RPL_ENDOFMOTD = 376,
    /// 401 - No such nick/channel
    ERR_NOSUCHNICK = 401,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 404 - Cannot send to channel
    ERR_CANNOTSENDTOCHAN = 404,
    /// 409 - No origin specified (PING/PONG)
    ERR_NOORIGIN = 409,
    /// 421 - Unknown command
    ERR_UNKNOWNCOMMAND = 421,
    /// 431 - No nickname given
    ERR_NONICKNAMEGIVEN = 431,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 442 - Not on that channel
    ERR_NOTONCHANNEL = 442,
    /// 443 - User already on channel
    ERR_USERONCHANNEL = 443,
    /// 451 - Not registered
    ERR_NOTREGISTERED = 451,
    /// 461 - Not enough parameters
    ERR_NEEDMOREPARAMS = 461,
    /// 462 - Already registered
    ERR_ALREADYREGISTRED = 462,
    /// 473 - Invite-only channel
    ERR_INVITEONLYCHAN = 473,
    /// 482 - Channel operator privilege needed
    ERR_CHANOPRIVSNEEDED = 482,
}

impl Response {
    /// The numeric code as a plain integer.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Whether this numeric is in the error range.
    pub const fn is_error(self) -> bool {
        self.code() >= 400
    }

    /// Look up a response by its numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        use Response::*;
        let resp = match code {
            1 => RPL_WELCOME,
            2 => RPL_YOURHOST,
            3 => RPL_CREATED,
            4 => RPL_MYINFO,
            324 => RPL_CHANNELMODEIS,
            331 => RPL_NOTOPIC,
            332 => RPL_TOPIC,
            341 => RPL_INVITING,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            372 => RPL_MOTD,
            375 => RPL_MOTDSTART,
            376 => RPL_ENDOFMOTD,
            401 => ERR_NOSUCHNICK,
            403 => ERR_NOSUCHCHANNEL,
            404 => ERR_CANNOTSENDTOCHAN,
            409 => ERR_NOORIGIN,
            421 => ERR_UNKNOWNCOMMAND,
            431 => ERR_NONICKNAMEGIVEN,
            432 => ERR_ERRONEUSNICKNAME,
            433 => ERR_NICKNAMEINUSE,
            442 => ERR_NOTONCHANNEL,
            443 => ERR_USERONCHANNEL,
            451 => ERR_NOTREGISTERED,
            461 => ERR_NEEDMOREPARAMS,
            462 => ERR_ALREADYREGISTRED,
            473 => ERR_INVITEONLYCHAN,
            482 => ERR_CHANOPRIVSNEEDED,
            _ => return None,
        };
        Some(resp)
    }

    /// Build a reply message carrying this numeric and the given params.
    pub fn with_params(self, params: Vec<String>) -> Message {
        Message::from(Command::Response(self, params))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Error returned when a string is not a known three-digit numeric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResponseError;

impl fmt::Display for ParseResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not a known numeric response code")
    }
}

impl std::error::Error for ParseResponseError {}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 {
            return Err(ParseResponseError);
        }
        let code: u16 = s.parse().map_err(|_| ParseResponseError)?;
        Response::from_code(code).ok_or(ParseResponseError)
    }
}

macro_rules! impl_reply {
    (
        $(#[$meta:meta])*
        $name:ident, $resp:ident, $msg:literal
    ) => {
        $(#[$meta])*
        pub fn $name(client: &str) -> Message {
            Response::$resp.with_params(vec![client.to_owned(), $msg.to_owned()])
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident, $resp:ident, $arg:ident, $msg:literal
    ) => {
        $(#[$meta])*
        pub fn $name(client: &str, $arg: &str) -> Message {
            Response::$resp.with_params(vec![
                client.to_owned(),
                $arg.to_owned(),
                $msg.to_owned(),
            ])
        }
    };
}

impl Response {
    impl_reply!(
        /// 401 - `<nick> :No such nick/channel`
        err_nosuchnick, ERR_NOSUCHNICK, nickname, "No such nick/channel"
    );
    impl_reply!(
        /// 403 - `<channel> :No such channel`
        err_nosuchchannel, ERR_NOSUCHCHANNEL, channel, "No such channel"
    );
    impl_reply!(
        /// 404 - `<channel> :Cannot send to channel`
        err_cannotsendtochan, ERR_CANNOTSENDTOCHAN, channel, "Cannot send to channel"
    );
    impl_reply!(
        /// 409 - `:No origin specified`
        err_noorigin, ERR_NOORIGIN, "No origin specified"
    );
    impl_reply!(
        /// 421 - `<command> :Unknown command`
        err_unknowncommand, ERR_UNKNOWNCOMMAND, command, "Unknown command"
    );
    impl_reply!(
        /// 431 - `:No nickname given`
        err_nonicknamegiven, ERR_NONICKNAMEGIVEN, "No nickname given"
    );
    impl_reply!(
        /// 432 - `<nick> :Erroneous nickname`
        err_erroneusnickname, ERR_ERRONEUSNICKNAME, nickname, "Erroneous nickname"
    );
    impl_reply!(
        /// 433 - `<nick> :Nickname is already in use`
        err_nicknameinuse, ERR_NICKNAMEINUSE, nickname, "Nickname is already in use"
    );
    impl_reply!(
        /// 442 - `<channel> :You're not on that channel`
        err_notonchannel, ERR_NOTONCHANNEL, channel, "You're not on that channel"
    );
    impl_reply!(
        /// 451 - `:You have not registered`
        err_notregistered, ERR_NOTREGISTERED, "You have not registered"
    );
    impl_reply!(
        /// 462 - `:You may not reregister`
        err_alreadyregistred, ERR_ALREADYREGISTRED, "You may not reregister"
    );
    impl_reply!(
        /// 473 - `<channel> :Cannot join channel (+i)`
        err_inviteonlychan, ERR_INVITEONLYCHAN, channel, "Cannot join channel (+i)"
    );
    impl_reply!(
        /// 482 - `<channel> :You're not channel operator`
        err_chanoprivsneeded, ERR_CHANOPRIVSNEEDED, channel, "You're not channel operator"
    );

    /// 443 - `<nick> <channel> :is already on channel`
    pub fn err_useronchannel(client: &str, nick: &str, channel: &str) -> Message {
        Response::ERR_USERONCHANNEL.with_params(vec![
            client.to_owned(),
            nick.to_owned(),
            channel.to_owned(),
            "is already on channel".to_owned(),
        ])
    }

    /// 461 - `<command> :Not enough parameters`
    pub fn err_needmoreparams(client: &str, command: &str) -> Message {
        Response::ERR_NEEDMOREPARAMS.with_params(vec![
            client.to_owned(),
            command.to_owned(),
            "Not enough parameters".to_owned(),
        ])
    }
}
