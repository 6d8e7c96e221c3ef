//! The Hub - central shared state for the IRC server.
//!
//! The Hub holds all users, channels, and server identity in concurrent
//! data structures accessible from any connection task.

use crate::config::Config;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_proto::{Message, Prefix, irc_to_lower};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Notify, RwLock, mpsc};
use tracing::debug;

/// Unique connection identifier, assigned at accept time.
pub type Uid = u64;

/// Depth of a session's outbound queue. A client that stops reading has
/// its deliveries dropped once the queue fills, so one stuck client never
/// stalls a channel broadcast.
pub const OUTBOUND_QUEUE: usize = 32;

/// Central shared state container.
///
/// Holds all users, channels, and routing state in thread-safe concurrent
/// collections. Nick and channel keys are always stored in their
/// case-normalized form.
pub struct Hub {
    /// All registered users, indexed by UID.
    pub users: DashMap<Uid, Arc<RwLock<User>>>,

    /// All channels, indexed by lowercase name.
    pub channels: DashMap<String, Arc<RwLock<Channel>>>,

    /// Lowercase nick to UID mapping. Doubles as the nick reservation
    /// table: an entry here means the nick is taken, registered or not.
    pub nicks: DashMap<String, Uid>,

    /// UID to message sender mapping for routing.
    pub senders: DashMap<Uid, mpsc::Sender<Message>>,

    /// This server's identity.
    pub server_info: ServerInfo,

    /// Shutdown signal observed by the gateway and every session.
    pub shutdown: Notify,

    stopping: AtomicBool,
    next_uid: AtomicU64,
}

/// This server's identity information.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub network: String,
    pub description: String,
    /// Startup time, shown in the registration burst.
    pub created: String,
}

/// A registered user.
#[derive(Debug)]
pub struct User {
    pub uid: Uid,
    pub nick: String,
    pub user: String,
    pub realname: String,
    pub host: String,
    /// Channels this user is in (lowercase names).
    pub channels: HashSet<String>,
}

impl User {
    /// The user's nick!user@host mask as a message prefix.
    pub fn prefix(&self) -> Prefix {
        Prefix::new(self.nick.clone(), self.user.clone(), self.host.clone())
    }
}

/// An IRC channel.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    /// Members: UID -> MemberModes
    pub members: HashMap<Uid, MemberModes>,
    /// Channel modes.
    pub modes: ChannelModes,
    /// Set under the write lock that empties the member map. A closed
    /// channel is on its way out of the channel table; joins that still
    /// hold its Arc must discard it and start over.
    pub closed: bool,
    /// Current topic, if one has been set.
    pub topic: Option<String>,
    /// Lowercase nicks invited while +i is (or may become) active.
    /// Entries are consumed by the JOIN that uses them.
    pub invites: HashSet<String>,
}

impl Channel {
    /// Create a new, empty channel.
    pub fn new(name: String) -> Self {
        Self {
            name,
            members: HashMap::new(),
            modes: ChannelModes::default(),
            closed: false,
            topic: None,
            invites: HashSet::new(),
        }
    }

    /// Check if a user is a member.
    pub fn is_member(&self, uid: Uid) -> bool {
        self.members.contains_key(&uid)
    }

    /// Check if a user has op.
    pub fn is_op(&self, uid: Uid) -> bool {
        self.members.get(&uid).is_some_and(|m| m.op)
    }
}

/// Channel modes.
#[derive(Debug, Default, Clone)]
pub struct ChannelModes {
    pub invite_only: bool, // +i
    pub no_external: bool, // +n
}

impl ChannelModes {
    /// Convert modes to a string like "+in".
    pub fn as_mode_string(&self) -> String {
        let mut s = String::from("+");
        if self.invite_only {
            s.push('i');
        }
        if self.no_external {
            s.push('n');
        }
        s
    }
}

/// Member modes (op, voice).
#[derive(Debug, Default, Clone)]
pub struct MemberModes {
    pub op: bool,    // +o
    pub voice: bool, // +v
}

impl MemberModes {
    /// Get the highest prefix character for this member.
    pub fn prefix_char(&self) -> Option<char> {
        if self.op {
            Some('@')
        } else if self.voice {
            Some('+')
        } else {
            None
        }
    }
}

impl Hub {
    /// Create a new Hub from the server configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            users: DashMap::new(),
            channels: DashMap::new(),
            nicks: DashMap::new(),
            senders: DashMap::new(),
            server_info: ServerInfo {
                name: config.server.name.clone(),
                network: config.server.network.clone(),
                description: config.server.description.clone(),
                created: chrono::Utc::now().to_rfc2822(),
            },
            shutdown: Notify::new(),
            stopping: AtomicBool::new(false),
            next_uid: AtomicU64::new(1),
        }
    }

    /// Allocate a UID for a newly accepted connection.
    pub fn next_uid(&self) -> Uid {
        self.next_uid.fetch_add(1, Ordering::Relaxed)
    }

    /// Signal the gateway and all sessions to shut down.
    pub fn begin_shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    /// Whether shutdown has been requested.
    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Atomically reserve a nick for a UID.
    ///
    /// Returns false if the (normalized) nick belongs to a different
    /// connection. Re-reserving one's own nick succeeds.
    pub fn try_reserve_nick(&self, nick: &str, uid: Uid) -> bool {
        match self.nicks.entry(irc_to_lower(nick)) {
            Entry::Occupied(e) => *e.get() == uid,
            Entry::Vacant(e) => {
                e.insert(uid);
                true
            }
        }
    }

    /// Release a nick reservation, but only if it is still held by `uid`.
    pub fn release_nick(&self, nick: &str, uid: Uid) {
        self.nicks
            .remove_if(&irc_to_lower(nick), |_, owner| *owner == uid);
    }

    /// Look up the UID currently holding a nick.
    pub fn uid_for_nick(&self, nick: &str) -> Option<Uid> {
        self.nicks.get(&irc_to_lower(nick)).map(|r| *r.value())
    }

    /// Resolve a nick to the UID of a fully registered user.
    ///
    /// A nick can sit in the reservation table before its owner finishes
    /// the NICK/USER exchange; such nicks have no user entity and do not
    /// resolve here.
    pub fn registered_uid_for_nick(&self, nick: &str) -> Option<Uid> {
        let uid = self.uid_for_nick(nick)?;
        self.users.contains_key(&uid).then_some(uid)
    }

    /// Register a user's message sender for routing.
    pub fn register_sender(&self, uid: Uid, sender: mpsc::Sender<Message>) {
        self.senders.insert(uid, sender);
    }

    /// Unregister a user's message sender.
    pub fn unregister_sender(&self, uid: Uid) {
        self.senders.remove(&uid);
    }

    /// Send a message to a specific user by UID.
    ///
    /// Delivery is best-effort: a missing, closed, or full outbound queue
    /// drops the message rather than blocking the caller.
    pub fn send_to_user(&self, uid: Uid, msg: Message) -> bool {
        let Some(sender) = self.senders.get(&uid) else {
            return false;
        };
        match sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(uid, "outbound queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Broadcast a message to all members of a channel, optionally
    /// excluding one UID (usually the sender).
    ///
    /// `channel_name` must already be lowercased by the caller.
    pub async fn broadcast_to_channel(&self, channel_name: &str, msg: Message, exclude: Option<Uid>) {
        let Some(channel) = self.channels.get(channel_name).map(|c| Arc::clone(&c)) else {
            return;
        };
        let channel = channel.read().await;
        for &uid in channel.members.keys() {
            if exclude == Some(uid) {
                continue;
            }
            self.send_to_user(uid, msg.clone());
        }
    }

    /// Broadcast a message to every connected user.
    pub fn broadcast(&self, msg: Message) {
        for entry in self.senders.iter() {
            self.send_to_user(*entry.key(), msg.clone());
        }
    }

    /// Get-or-create a channel under its normalized name.
    ///
    /// Creation is atomic with the lookup, so two concurrent first joins
    /// cannot race into two channels.
    pub fn channel_entry(&self, lower_name: &str, display_name: &str) -> Arc<RwLock<Channel>> {
        Arc::clone(
            &self
                .channels
                .entry(lower_name.to_owned())
                .or_insert_with(|| Arc::new(RwLock::new(Channel::new(display_name.to_owned())))),
        )
    }

    /// Remove a member from a channel, retiring the channel if that
    /// empties it. Returns `true` when the channel was destroyed.
    ///
    /// Emptying and retirement happen under one write lock: the channel is
    /// marked closed before it leaves the map, so a join that already
    /// holds the Arc sees the mark, discards the handle, and starts over.
    pub async fn drop_member(
        &self,
        lower_name: &str,
        channel_ref: &Arc<RwLock<Channel>>,
        uid: Uid,
    ) -> bool {
        let retired = {
            let mut channel = channel_ref.write().await;
            channel.members.remove(&uid);
            if channel.members.is_empty() {
                channel.closed = true;
            }
            channel.closed
        };
        if retired {
            self.discard_channel(lower_name, channel_ref);
        }
        retired
    }

    /// Drop a retired channel from the map. Matches by identity, so a
    /// fresh channel recreated under the same name is never evicted by a
    /// task still holding the old handle.
    pub fn discard_channel(&self, lower_name: &str, channel_ref: &Arc<RwLock<Channel>>) {
        self.channels
            .remove_if(lower_name, |_, ch| Arc::ptr_eq(ch, channel_ref));
    }

    /// Disconnect a user from the server.
    ///
    /// The single teardown path: removes the user from every channel
    /// (broadcasting QUIT to remaining members and destroying channels that
    /// become empty), frees the nick, and drops the routing sender. Safe to
    /// call for UIDs that never registered.
    pub async fn disconnect_user(&self, uid: Uid, quit_reason: &str) -> Vec<String> {
        let (prefix, user_channels) = {
            let Some(user_ref) = self.users.get(&uid).map(|u| Arc::clone(&u)) else {
                self.unregister_sender(uid);
                return Vec::new();
            };
            let user = user_ref.read().await;
            (user.prefix(), user.channels.iter().cloned().collect::<Vec<_>>())
        };

        let quit_msg = Message::quit(Some(quit_reason.to_owned())).with_prefix(prefix.clone());

        for channel_name in &user_channels {
            let Some(channel_ref) = self.channels.get(channel_name).map(|c| Arc::clone(&c)) else {
                continue;
            };
            let (remaining, retired) = {
                let mut channel = channel_ref.write().await;
                channel.members.remove(&uid);
                if channel.members.is_empty() {
                    channel.closed = true;
                }
                (channel.members.keys().copied().collect::<Vec<_>>(), channel.closed)
            };
            for member in remaining {
                self.send_to_user(member, quit_msg.clone());
            }
            if retired {
                self.discard_channel(channel_name, &channel_ref);
            }
        }

        if let Some(nick) = prefix.nick() {
            self.release_nick(nick, uid);
        }
        self.users.remove(&uid);
        self.unregister_sender(uid);

        user_channels
    }

    /// Atomically rename a registered user.
    ///
    /// The caller must have already reserved `new_nick` via
    /// [`Hub::try_reserve_nick`]. Updates the user entity, releases the old
    /// reservation, and broadcasts the NICK change to every channel the user
    /// is on (and to the user themselves).
    pub async fn rename_user(&self, uid: Uid, new_nick: &str) {
        let Some(user_ref) = self.users.get(&uid).map(|u| Arc::clone(&u)) else {
            return;
        };

        let (old_prefix, channels) = {
            let mut user = user_ref.write().await;
            let old_prefix = user.prefix();
            user.nick = new_nick.to_owned();
            (old_prefix, user.channels.iter().cloned().collect::<Vec<_>>())
        };

        let old_nick = old_prefix.nick().unwrap_or_default().to_owned();
        let change = Message::nick(new_nick.to_owned()).with_prefix(old_prefix);

        let mut notified: HashSet<Uid> = HashSet::new();
        notified.insert(uid);
        self.send_to_user(uid, change.clone());
        for channel_name in &channels {
            let Some(channel_ref) = self.channels.get(channel_name).map(|c| Arc::clone(&c)) else {
                continue;
            };
            let channel = channel_ref.read().await;
            for &member in channel.members.keys() {
                if notified.insert(member) {
                    self.send_to_user(member, change.clone());
                }
            }
        }

        if !relay_proto::irc_eq(&old_nick, new_nick) {
            self.release_nick(&old_nick, uid);
        }
    }

    /// Count of currently registered users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}
