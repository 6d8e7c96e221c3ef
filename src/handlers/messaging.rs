//! Messaging handlers: PRIVMSG and NOTICE.
//!
//! The two share routing logic; the difference is that NOTICE never
//! generates error replies.

use super::{Context, Handler, HandlerError, HandlerResult};
use async_trait::async_trait;
use relay_proto::{Command, Message, Response, irc_to_lower};
use std::sync::Arc;

/// PRIVMSG - send a message to a channel or user.
pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::PRIVMSG(target, text) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        route(ctx, target, text, false).await
    }
}

/// NOTICE - like PRIVMSG, but failures are silent.
pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::NOTICE(target, text) = &msg.command else {
            // NOTICE never draws an error reply.
            return Ok(());
        };
        route(ctx, target, text, true).await
    }
}

/// Deliver `text` to `target`, which is a channel or a nick.
///
/// The sender never receives their own channel message. With `silent`
/// (NOTICE semantics) every failure is swallowed instead of answered with
/// a numeric.
async fn route(ctx: &Context<'_>, target: &str, text: &str, silent: bool) -> HandlerResult {
    let client = ctx.client_nick().to_owned();
    let prefix = ctx.origin_prefix().await;
    let outbound = if silent {
        Message::notice(target.to_owned(), text.to_owned()).with_prefix(prefix)
    } else {
        Message::privmsg(target.to_owned(), text.to_owned()).with_prefix(prefix)
    };

    if target.starts_with(['#', '&']) {
        let lower = irc_to_lower(target);
        let Some(channel_ref) = ctx.hub.channels.get(&lower).map(|c| Arc::clone(&c)) else {
            if silent {
                return Ok(());
            }
            return ctx.numeric(Response::err_nosuchchannel(&client, target)).await;
        };

        let blocked = {
            let channel = channel_ref.read().await;
            channel.modes.no_external && !channel.is_member(ctx.uid)
        };
        if blocked {
            if silent {
                return Ok(());
            }
            return ctx
                .numeric(Response::err_cannotsendtochan(&client, target))
                .await;
        }

        ctx.hub
            .broadcast_to_channel(&lower, outbound, Some(ctx.uid))
            .await;
        return Ok(());
    }

    // A reserved nick whose owner never finished registering has no user
    // entity and nothing listening; it is no such nick, not a black hole.
    match ctx.hub.registered_uid_for_nick(target) {
        Some(target_uid) => {
            ctx.hub.send_to_user(target_uid, outbound);
            Ok(())
        }
        None if silent => Ok(()),
        None => ctx.numeric(Response::err_nosuchnick(&client, target)).await,
    }
}
