//! IRC command handlers.
//!
//! Contains the Handler trait and the command registry that dispatches
//! incoming messages to the matching handler.

mod channel;
mod connection;
mod helpers;
mod messaging;

pub use channel::{InviteHandler, JoinHandler, ModeHandler, NamesHandler, PartHandler, TopicHandler};
pub use connection::{NickHandler, PingHandler, PongHandler, QuitHandler, UserHandler};
pub use messaging::{NoticeHandler, PrivmsgHandler};

use crate::state::{Hub, Uid};
use async_trait::async_trait;
use relay_proto::{Command, Message, Response};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Handler context passed to each command handler.
pub struct Context<'a> {
    /// The connection's unique ID.
    pub uid: Uid,
    /// Shared server state.
    pub hub: &'a Arc<Hub>,
    /// Sender for outgoing messages to this client.
    pub sender: &'a mpsc::Sender<Message>,
    /// Current handshake state.
    pub handshake: &'a mut HandshakeState,
    /// Remote address of the client.
    pub remote_addr: SocketAddr,
}

impl Context<'_> {
    /// This server's name, for reply prefixes.
    pub fn server_name(&self) -> &str {
        &self.hub.server_info.name
    }

    /// The client's nick for numeric replies, `*` before NICK is accepted.
    pub fn client_nick(&self) -> &str {
        self.handshake.nick.as_deref().unwrap_or("*")
    }

    /// Queue a reply to this client.
    ///
    /// Uses the same drop-on-full policy as Hub routing: a client that
    /// stops reading loses replies rather than wedging its own handler.
    pub async fn reply(&self, msg: Message) -> Result<(), HandlerError> {
        match self.sender.try_send(msg) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(uid = self.uid, "outbound queue full, dropping reply");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(msg)) => {
                Err(mpsc::error::SendError(msg).into())
            }
        }
    }

    /// Queue a numeric reply with this server's prefix.
    pub async fn numeric(&self, msg: Message) -> Result<(), HandlerError> {
        self.reply(msg.with_prefix(relay_proto::Prefix::ServerName(
            self.server_name().to_owned(),
        )))
        .await
    }

    /// This user's nick!user@host prefix for echoed commands.
    pub async fn origin_prefix(&self) -> relay_proto::Prefix {
        match self.hub.users.get(&self.uid).map(|u| Arc::clone(&u)) {
            Some(user_ref) => user_ref.read().await.prefix(),
            None => relay_proto::Prefix::new(self.client_nick(), "", ""),
        }
    }
}

/// State tracked during the client registration handshake.
#[derive(Debug, Default)]
pub struct HandshakeState {
    /// Nick provided by NICK.
    pub nick: Option<String>,
    /// Username provided by USER.
    pub user: Option<String>,
    /// Realname provided by USER.
    pub realname: Option<String>,
    /// Whether registration is complete.
    pub registered: bool,
}

impl HandshakeState {
    /// Check if we have both NICK and USER and can complete registration.
    pub fn can_register(&self) -> bool {
        self.nick.is_some() && self.user.is_some() && !self.registered
    }
}

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,
    #[error("not registered")]
    NotRegistered,
    #[error("send error: {0}")]
    Send(#[from] mpsc::error::SendError<Message>),
    #[error("client quit: {0:?}")]
    Quit(Option<String>),
}

impl HandlerError {
    /// Convert to the numeric reply owed to the client, if any.
    ///
    /// Quit and transport failures have no reply; the connection loop tears
    /// the session down instead.
    pub fn to_irc_reply(&self, server: &str, nick: &str, command: &str) -> Option<Message> {
        let reply = match self {
            HandlerError::NeedMoreParams => Response::err_needmoreparams(nick, command),
            HandlerError::NotRegistered => Response::err_notregistered(nick),
            HandlerError::Send(_) | HandlerError::Quit(_) => return None,
        };
        Some(reply.with_prefix(relay_proto::Prefix::ServerName(server.to_owned())))
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle an incoming message.
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult;
}

/// Commands accepted before registration completes.
const PRE_REGISTRATION: [&str; 5] = ["NICK", "USER", "QUIT", "PING", "PONG"];

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("USER", Box::new(UserHandler));
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("PONG", Box::new(PongHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("NAMES", Box::new(NamesHandler));
        handlers.insert("MODE", Box::new(ModeHandler));
        handlers.insert("INVITE", Box::new(InviteHandler));
        handlers.insert("TOPIC", Box::new(TopicHandler));

        // Messaging handlers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("NOTICE", Box::new(NoticeHandler));

        Self { handlers }
    }

    /// Dispatch a message to the appropriate handler.
    ///
    /// Non-handshake commands before registration draw ERR_NOTREGISTERED;
    /// unknown commands draw ERR_UNKNOWNCOMMAND. Numeric replies sent by a
    /// misbehaving client are dropped.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if matches!(msg.command, Command::Response(..)) {
            return Ok(());
        }

        let verb = msg.command.verb().to_owned();

        if !ctx.handshake.registered && !PRE_REGISTRATION.contains(&verb.as_str()) {
            return Err(HandlerError::NotRegistered);
        }

        match self.handlers.get(verb.as_str()) {
            Some(handler) => handler.handle(ctx, msg).await,
            None => {
                let nick = ctx.client_nick().to_owned();
                ctx.numeric(Response::err_unknowncommand(&nick, &verb)).await
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
