//! Channel handlers: JOIN, PART, NAMES, MODE, INVITE.

use super::helpers::is_valid_channel;
use super::{Context, Handler, HandlerError, HandlerResult};
use crate::state::MemberModes;
use async_trait::async_trait;
use relay_proto::{Command, Message, Response, irc_to_lower};
use std::sync::Arc;
use tracing::debug;

/// JOIN - enter a channel, creating it on first join.
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::JOIN(channel_name) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        let client = ctx.client_nick().to_owned();
        if !is_valid_channel(channel_name) {
            return ctx
                .numeric(Response::err_nosuchchannel(&client, channel_name))
                .await;
        }

        let lower = irc_to_lower(channel_name);
        let nick_lower = irc_to_lower(&client);

        // Lookup and creation are one atomic map operation; the membership
        // decision happens under the channel's own lock. A channel that was
        // retired between the two steps is marked closed under the lock that
        // emptied it, so the join discards the stale handle and starts over.
        let (channel_ref, denied) = loop {
            let channel_ref = ctx.hub.channel_entry(&lower, channel_name);
            let mut channel = channel_ref.write().await;
            if channel.closed {
                drop(channel);
                ctx.hub.discard_channel(&lower, &channel_ref);
                continue;
            }
            if channel.is_member(ctx.uid) {
                return Ok(());
            }
            // An invitation is spent by the join that uses it.
            let denied = if channel.modes.invite_only && !channel.invites.remove(&nick_lower) {
                true
            } else {
                let first = channel.members.is_empty();
                channel.members.insert(
                    ctx.uid,
                    MemberModes {
                        op: first,
                        voice: false,
                    },
                );
                false
            };
            drop(channel);
            break (channel_ref, denied);
        };

        if denied {
            return ctx
                .numeric(Response::err_inviteonlychan(&client, channel_name))
                .await;
        }

        if let Some(user_ref) = ctx.hub.users.get(&ctx.uid).map(|u| Arc::clone(&u)) {
            user_ref.write().await.channels.insert(lower.clone());
        }

        debug!(uid = ctx.uid, channel = %channel_name, "joined channel");

        let join = Message::join(channel_name.clone()).with_prefix(ctx.origin_prefix().await);
        ctx.reply(join.clone()).await?;
        ctx.hub
            .broadcast_to_channel(&lower, join, Some(ctx.uid))
            .await;

        let topic = channel_ref.read().await.topic.clone();
        if let Some(text) = topic {
            ctx.numeric(Response::RPL_TOPIC.with_params(vec![
                client.clone(),
                channel_name.clone(),
                text,
            ]))
            .await?;
        }

        send_names(ctx, &client, channel_name, &lower).await
    }
}

/// PART - leave a channel.
pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::PART(channel_name, reason) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        let client = ctx.client_nick().to_owned();
        let lower = irc_to_lower(channel_name);
        let Some(channel_ref) = ctx.hub.channels.get(&lower).map(|c| Arc::clone(&c)) else {
            return ctx
                .numeric(Response::err_nosuchchannel(&client, channel_name))
                .await;
        };

        if !channel_ref.read().await.is_member(ctx.uid) {
            return ctx
                .numeric(Response::err_notonchannel(&client, channel_name))
                .await;
        }

        let part = Message::part(channel_name.clone(), reason.clone())
            .with_prefix(ctx.origin_prefix().await);
        ctx.reply(part.clone()).await?;
        ctx.hub
            .broadcast_to_channel(&lower, part, Some(ctx.uid))
            .await;

        ctx.hub.drop_member(&lower, &channel_ref, ctx.uid).await;
        if let Some(user_ref) = ctx.hub.users.get(&ctx.uid).map(|u| Arc::clone(&u)) {
            user_ref.write().await.channels.remove(&lower);
        }
        Ok(())
    }
}

/// NAMES - list channel membership.
pub struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::NAMES(target) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };
        let client = ctx.client_nick().to_owned();
        match target {
            Some(channel_name) => {
                send_names(ctx, &client, channel_name, &irc_to_lower(channel_name)).await
            }
            // NAMES with no argument: just the terminator, like most small ircds.
            None => end_of_names(ctx, &client, "*").await,
        }
    }
}

/// Send 353/366 for a channel to the invoking client.
///
/// `channel_name` is the spelling the client used; an unknown channel is
/// echoed back in that spelling, not the normalized key.
async fn send_names(
    ctx: &Context<'_>,
    client: &str,
    channel_name: &str,
    lower: &str,
) -> HandlerResult {
    let Some(channel_ref) = ctx.hub.channels.get(lower).map(|c| Arc::clone(&c)) else {
        return end_of_names(ctx, client, channel_name).await;
    };

    let (display, names) = {
        let channel = channel_ref.read().await;
        let mut names = Vec::with_capacity(channel.members.len());
        for (&uid, member) in &channel.members {
            let Some(user_ref) = ctx.hub.users.get(&uid).map(|u| Arc::clone(&u)) else {
                continue;
            };
            let nick = user_ref.read().await.nick.clone();
            names.push(match member.prefix_char() {
                Some(prefix) => format!("{prefix}{nick}"),
                None => nick,
            });
        }
        (channel.name.clone(), names)
    };

    ctx.numeric(Response::RPL_NAMREPLY.with_params(vec![
        client.to_owned(),
        "=".to_owned(),
        display.clone(),
        names.join(" "),
    ]))
    .await?;
    end_of_names(ctx, client, &display).await
}

async fn end_of_names(ctx: &Context<'_>, client: &str, channel: &str) -> HandlerResult {
    ctx.numeric(Response::RPL_ENDOFNAMES.with_params(vec![
        client.to_owned(),
        channel.to_owned(),
        "End of /NAMES list".to_owned(),
    ]))
    .await
}

/// MODE - query or change channel modes (+i, +n).
pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::MODE(target, modestring) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        if !target.starts_with(['#', '&']) {
            // User modes are out of scope; quietly accepted.
            return Ok(());
        }

        let client = ctx.client_nick().to_owned();
        let lower = irc_to_lower(target);
        let Some(channel_ref) = ctx.hub.channels.get(&lower).map(|c| Arc::clone(&c)) else {
            return ctx.numeric(Response::err_nosuchchannel(&client, target)).await;
        };

        let Some(modestring) = modestring else {
            let (display, modes) = {
                let channel = channel_ref.read().await;
                (channel.name.clone(), channel.modes.as_mode_string())
            };
            return ctx
                .numeric(Response::RPL_CHANNELMODEIS.with_params(vec![client, display, modes]))
                .await;
        };

        {
            let channel = channel_ref.read().await;
            if !channel.is_member(ctx.uid) {
                drop(channel);
                return ctx.numeric(Response::err_notonchannel(&client, target)).await;
            }
            if !channel.is_op(ctx.uid) {
                drop(channel);
                return ctx
                    .numeric(Response::err_chanoprivsneeded(&client, target))
                    .await;
            }
        }

        let chan_name = {
            let mut channel = channel_ref.write().await;
            let mut adding = true;
            for c in modestring.chars() {
                match c {
                    '+' => adding = true,
                    '-' => adding = false,
                    'i' => channel.modes.invite_only = adding,
                    'n' => channel.modes.no_external = adding,
                    // Unsupported mode letters are ignored.
                    _ => {}
                }
            }
            channel.name.clone()
        };

        debug!(uid = ctx.uid, channel = %chan_name, modes = %modestring, "channel mode change");

        let change = Message::mode(chan_name, Some(modestring.clone()))
            .with_prefix(ctx.origin_prefix().await);
        ctx.reply(change.clone()).await?;
        ctx.hub
            .broadcast_to_channel(&lower, change, Some(ctx.uid))
            .await;
        Ok(())
    }
}

/// TOPIC - query or set a channel topic.
pub struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::TOPIC(channel_name, text) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        let client = ctx.client_nick().to_owned();
        let lower = irc_to_lower(channel_name);
        let Some(channel_ref) = ctx.hub.channels.get(&lower).map(|c| Arc::clone(&c)) else {
            return ctx
                .numeric(Response::err_nosuchchannel(&client, channel_name))
                .await;
        };

        let Some(text) = text else {
            let (display, topic) = {
                let channel = channel_ref.read().await;
                (channel.name.clone(), channel.topic.clone())
            };
            return match topic {
                Some(topic) => {
                    ctx.numeric(Response::RPL_TOPIC.with_params(vec![client, display, topic]))
                        .await
                }
                None => {
                    ctx.numeric(Response::RPL_NOTOPIC.with_params(vec![
                        client,
                        display,
                        "No topic is set".to_owned(),
                    ]))
                    .await
                }
            };
        };

        {
            let mut channel = channel_ref.write().await;
            if !channel.is_member(ctx.uid) {
                drop(channel);
                return ctx
                    .numeric(Response::err_notonchannel(&client, channel_name))
                    .await;
            }
            channel.topic = if text.is_empty() {
                None
            } else {
                Some(text.clone())
            };
        }

        debug!(uid = ctx.uid, channel = %channel_name, "topic changed");

        let change = Message::topic(channel_name.clone(), text.clone())
            .with_prefix(ctx.origin_prefix().await);
        ctx.reply(change.clone()).await?;
        ctx.hub
            .broadcast_to_channel(&lower, change, Some(ctx.uid))
            .await;
        Ok(())
    }
}

/// INVITE - invite a user to a channel.
pub struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Command::INVITE(target_nick, channel_name) = &msg.command else {
            return Err(HandlerError::NeedMoreParams);
        };

        let client = ctx.client_nick().to_owned();
        // Nicks reserved by sessions that never finished registering are
        // not inviteable targets.
        let Some(target_uid) = ctx.hub.registered_uid_for_nick(target_nick) else {
            return ctx
                .numeric(Response::err_nosuchnick(&client, target_nick))
                .await;
        };

        let lower = irc_to_lower(channel_name);
        let Some(channel_ref) = ctx.hub.channels.get(&lower).map(|c| Arc::clone(&c)) else {
            return ctx
                .numeric(Response::err_nosuchchannel(&client, channel_name))
                .await;
        };

        {
            let channel = channel_ref.read().await;
            if !channel.is_member(ctx.uid) {
                drop(channel);
                return ctx
                    .numeric(Response::err_notonchannel(&client, channel_name))
                    .await;
            }
            if channel.is_member(target_uid) {
                drop(channel);
                return ctx
                    .numeric(Response::err_useronchannel(&client, target_nick, channel_name))
                    .await;
            }
            if channel.modes.invite_only && !channel.is_op(ctx.uid) {
                drop(channel);
                return ctx
                    .numeric(Response::err_chanoprivsneeded(&client, channel_name))
                    .await;
            }
        }

        channel_ref
            .write()
            .await
            .invites
            .insert(irc_to_lower(target_nick));

        debug!(uid = ctx.uid, target = %target_nick, channel = %channel_name, "invite recorded");

        let invite = Message::invite(target_nick.clone(), channel_name.clone())
            .with_prefix(ctx.origin_prefix().await);
        ctx.hub.send_to_user(target_uid, invite);

        ctx.numeric(Response::RPL_INVITING.with_params(vec![
            client,
            target_nick.clone(),
            channel_name.clone(),
        ]))
        .await
    }
}
