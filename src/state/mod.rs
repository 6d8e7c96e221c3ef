//! State management module.
//!
//! Contains the Hub (shared server state) and related entities.

mod hub;

pub use hub::{Channel, ChannelModes, Hub, MemberModes, OUTBOUND_QUEUE, ServerInfo, Uid, User};
