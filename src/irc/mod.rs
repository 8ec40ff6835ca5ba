//! IRC side of the bridge.
//!
//! The bridge drives a host-provided network through `IrcNetwork`. Every
//! call is synchronous and is only made from the bridge event loop.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::common::types::{ChannelHandle, LineKind};

pub use memory::MemoryNetwork;

/// A user on the IRC side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcUser {
    pub nick: String,
    pub real_name: Option<String>,
}

/// One line to print into a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintLine {
    pub handle: ChannelHandle,
    pub sender: String,
    pub text: String,
    pub kind: LineKind,
    pub time: DateTime<Utc>,
}

/// What the display layer made of a printed line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintOutcome {
    /// The host's own highlight rules matched.
    pub highlighted: bool,
}

/// Bridge-side network endpoint for one connection.
pub trait IrcNetwork: Send {
    fn nickname(&self) -> &str;

    fn set_nickname(&mut self, nick: &str);

    /// Look up a channel by name, e.g. `#general`.
    fn find_channel(&self, name: &str) -> Option<ChannelHandle>;

    /// Look up a channel by name, creating it when missing.
    fn find_or_create_channel(&mut self, name: &str) -> ChannelHandle;

    fn channel_name(&self, handle: ChannelHandle) -> Option<&str>;

    /// Replace the channel topic.
    fn set_topic(&mut self, handle: ChannelHandle, topic: &str);

    /// Mark the channel joined and visible.
    fn activate(&mut self, handle: ChannelHandle);

    fn print(&mut self, line: PrintLine) -> PrintOutcome;

    fn set_unread(&mut self, handle: ChannelHandle, highlight: bool);

    fn is_unread(&self, handle: ChannelHandle) -> bool;

    /// Nicknames currently in the channel.
    fn members(&self, handle: ChannelHandle) -> Vec<String>;

    /// Register a user, or refresh its details when it already exists.
    fn find_or_create_user(&mut self, user: &IrcUser);

    fn add_member(&mut self, handle: ChannelHandle, nick: &str);

    fn remove_member(&mut self, handle: ChannelHandle, nick: &str);

    /// Print a notice into a channel, or the connection console for `None`.
    fn notice(&mut self, handle: Option<ChannelHandle>, text: &str);

    /// Show the channel in the host. Clears its unread state.
    fn select_channel(&mut self, handle: ChannelHandle);
}
