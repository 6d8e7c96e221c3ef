//! Connection and registration handlers: NICK, USER, PING, PONG, QUIT.

use super::helpers::is_valid_nick;
use super::{Context, Handler, HandlerError, HandlerResult};
use crate::state::User;
use async_trait::async_trait;
use relay_proto::{Command, Message, Prefix, Response};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// NICK - set or change nickname.
pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::NICK(nick) = &msg.command else {
            let client = ctx.client_nick().to_owned();
            return ctx.numeric(Response::err_nonicknamegiven(&client)).await;
        };

        let client = ctx.client_nick().to_owned();
        if !is_valid_nick(nick) {
            return ctx.numeric(Response::err_erroneusnickname(&client, nick)).await;
        }

        // Check-and-reserve is a single map operation: no two sessions can
        // pass this for the same normalized nick.
        if !ctx.hub.try_reserve_nick(nick, ctx.uid) {
            return ctx.numeric(Response::err_nicknameinuse(&client, nick)).await;
        }

        if ctx.handshake.registered {
            ctx.hub.rename_user(ctx.uid, nick).await;
            info!(uid = ctx.uid, from = %client, to = %nick, "nick changed");
            ctx.handshake.nick = Some(nick.clone());
            return Ok(());
        }

        // A pre-registration NICK may replace an earlier tentative one.
        if let Some(previous) = ctx.handshake.nick.take()
            && !relay_proto::irc_eq(&previous, nick)
        {
            ctx.hub.release_nick(&previous, ctx.uid);
        }
        ctx.handshake.nick = Some(nick.clone());

        if ctx.handshake.can_register() {
            complete_registration(ctx).await?;
        }
        Ok(())
    }
}

/// USER - supply username and realname during registration.
pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::USER(username, _mode, realname) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        if ctx.handshake.registered {
            let client = ctx.client_nick().to_owned();
            return ctx.numeric(Response::err_alreadyregistred(&client)).await;
        }

        ctx.handshake.user = Some(username.clone());
        ctx.handshake.realname = Some(realname.clone());

        if ctx.handshake.can_register() {
            complete_registration(ctx).await?;
        }
        Ok(())
    }
}

/// Promote the session to a registered user and send the welcome burst.
///
/// The nick is already reserved in the nick table at this point; this
/// creates the User entity under it and flips the handshake to registered.
async fn complete_registration(ctx: &mut Context<'_>) -> HandlerResult {
    let (Some(nick), Some(username)) = (ctx.handshake.nick.clone(), ctx.handshake.user.clone())
    else {
        return Ok(());
    };
    let realname = ctx.handshake.realname.clone().unwrap_or_default();
    let host = ctx.remote_addr.ip().to_string();

    let user = User {
        uid: ctx.uid,
        nick: nick.clone(),
        user: username.clone(),
        realname,
        host: host.clone(),
        channels: HashSet::new(),
    };
    ctx.hub.users.insert(ctx.uid, Arc::new(RwLock::new(user)));
    ctx.handshake.registered = true;

    info!(uid = ctx.uid, %nick, addr = %ctx.remote_addr, "user registered");
    send_welcome_burst(ctx, &nick, &username, &host).await
}

/// The 001-004 registration burst plus the MOTD block.
async fn send_welcome_burst(
    ctx: &Context<'_>,
    nick: &str,
    username: &str,
    host: &str,
) -> HandlerResult {
    let info = &ctx.hub.server_info;
    let server = info.name.clone();
    let version = concat!("relayd-", env!("CARGO_PKG_VERSION"));

    let burst = [
        Response::RPL_WELCOME.with_params(vec![
            nick.to_owned(),
            format!(
                "Welcome to the {} Internet Relay Network {}!{}@{}",
                info.network, nick, username, host
            ),
        ]),
        Response::RPL_YOURHOST.with_params(vec![
            nick.to_owned(),
            format!("Your host is {server}, running version {version}"),
        ]),
        Response::RPL_CREATED.with_params(vec![
            nick.to_owned(),
            format!("This server was created {}", info.created),
        ]),
        Response::RPL_MYINFO.with_params(vec![
            nick.to_owned(),
            server.clone(),
            version.to_owned(),
            "o".to_owned(),
            "in".to_owned(),
        ]),
        Response::RPL_MOTDSTART.with_params(vec![
            nick.to_owned(),
            format!("- {server} Message of the day -"),
        ]),
        Response::RPL_MOTD.with_params(vec![
            nick.to_owned(),
            format!("- Welcome to the {} network", info.network),
        ]),
        Response::RPL_ENDOFMOTD
            .with_params(vec![nick.to_owned(), "End of /MOTD command".to_owned()]),
    ];

    for reply in burst {
        ctx.numeric(reply).await?;
    }
    Ok(())
}

/// PING - liveness check; answered with PONG.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::PING(origin) = &msg.command else {
            let client = ctx.client_nick().to_owned();
            return ctx.numeric(Response::err_noorigin(&client)).await;
        };
        ctx.reply(
            Message::pong(origin.clone())
                .with_prefix(Prefix::ServerName(ctx.server_name().to_owned())),
        )
        .await
    }
}

/// PONG - reply to our PING; nothing to do.
pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if let Command::PONG(origin) = &msg.command {
            debug!(uid = ctx.uid, %origin, "pong received");
        }
        Ok(())
    }
}

/// QUIT - client-initiated disconnect.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let reason = match &msg.command {
            Command::QUIT(reason) => reason.clone(),
            _ => None,
        };
        Err(HandlerError::Quit(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{TestSession, test_hub};
    use super::super::{HandlerError, Registry};

    async fn register(session: &mut TestSession, registry: &Registry, nick: &str) {
        session
            .dispatch_line(registry, &format!("NICK {nick}"))
            .await
            .unwrap();
        session
            .dispatch_line(registry, "USER user 0 * :Real Name")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nick_then_user_completes_registration() {
        let registry = Registry::new();
        let mut session = TestSession::new(test_hub());

        register(&mut session, &registry, "test").await;
        assert!(session.handshake.registered);

        let replies = session.drain();
        assert_eq!(replies[0].response_code(), Some(1));
        let welcome = &replies[0].response_args().unwrap()[1];
        assert_eq!(
            welcome,
            "Welcome to the Test Internet Relay Network test!user@127.0.0.1"
        );
        // Burst ends with 376.
        assert_eq!(replies.last().unwrap().response_code(), Some(376));
    }

    #[tokio::test]
    async fn user_before_nick_also_registers() {
        let registry = Registry::new();
        let mut session = TestSession::new(test_hub());

        session
            .dispatch_line(&registry, "USER user 0 * :Real Name")
            .await
            .unwrap();
        assert!(!session.handshake.registered);
        session.dispatch_line(&registry, "NICK late").await.unwrap();
        assert!(session.handshake.registered);
    }

    #[tokio::test]
    async fn colliding_nick_gets_433() {
        let hub = test_hub();
        let registry = Registry::new();

        let mut first = TestSession::new(hub.clone());
        register(&mut first, &registry, "test").await;

        let mut second = TestSession::new(hub);
        second.dispatch_line(&registry, "NICK TEST").await.unwrap();
        let replies = second.drain();
        assert_eq!(replies[0].response_code(), Some(433));
        assert!(!second.handshake.registered);
    }

    #[tokio::test]
    async fn invalid_nick_gets_432() {
        let registry = Registry::new();
        let mut session = TestSession::new(test_hub());
        session
            .dispatch_line(&registry, "NICK 1bad")
            .await
            .unwrap();
        assert_eq!(session.drain()[0].response_code(), Some(432));
    }

    #[tokio::test]
    async fn reregistering_user_gets_462() {
        let registry = Registry::new();
        let mut session = TestSession::new(test_hub());
        register(&mut session, &registry, "test").await;
        session.drain();

        session
            .dispatch_line(&registry, "USER other 0 * :Other")
            .await
            .unwrap();
        assert_eq!(session.drain()[0].response_code(), Some(462));
    }

    #[tokio::test]
    async fn nick_change_after_registration_renames() {
        let registry = Registry::new();
        let hub = test_hub();
        let mut session = TestSession::new(hub.clone());
        register(&mut session, &registry, "before").await;
        hub.register_sender(session.uid, session.tx.clone());
        session.drain();

        session
            .dispatch_line(&registry, "NICK after")
            .await
            .unwrap();
        assert_eq!(hub.uid_for_nick("before"), None);
        assert_eq!(hub.uid_for_nick("after"), Some(session.uid));

        // The user hears their own NICK change.
        let replies = session.drain();
        assert_eq!(replies[0].source_nick(), Some("before"));
        assert_eq!(
            replies[0].command,
            relay_proto::Command::NICK("after".into())
        );
    }

    #[tokio::test]
    async fn abandoned_handshake_nick_is_released() {
        let registry = Registry::new();
        let hub = test_hub();
        let mut session = TestSession::new(hub.clone());
        session.dispatch_line(&registry, "NICK one").await.unwrap();
        session.dispatch_line(&registry, "NICK two").await.unwrap();
        assert_eq!(hub.uid_for_nick("one"), None);
        assert_eq!(hub.uid_for_nick("two"), Some(session.uid));
    }

    #[tokio::test]
    async fn ping_gets_pong_and_quit_errors_out() {
        let registry = Registry::new();
        let mut session = TestSession::new(test_hub());

        session
            .dispatch_line(&registry, "PING test")
            .await
            .unwrap();
        let replies = session.drain();
        assert_eq!(
            replies[0].command,
            relay_proto::Command::PONG("test".into())
        );

        let err = session
            .dispatch_line(&registry, "QUIT :bye")
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Quit(Some(reason)) if reason == "bye"));
    }
}
