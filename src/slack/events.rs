//! Decoded Slack RTM events.
//!
//! The transport hands these over already parsed; the shapes follow the
//! Slack JSON payloads so a transport can deserialize straight into them.

use serde::Deserialize;

use crate::slack::workspace::{ChannelInfo, UserInfo};

/// An event received on a Slack connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    /// Connection (re)established.
    Hello,
    /// Chat message.
    Message(MessageEvent),
    /// File shared into a channel.
    FileShared(MessageEvent),
    /// Server-side error report.
    Error {
        #[serde(default)]
        error: ErrorDetail,
    },
    /// A user's profile changed.
    UserChange { user: UserInfo },
    /// A new user joined the team.
    TeamJoin { user: UserInfo },
    /// A user joined a channel.
    MemberJoinedChannel { user: String, channel: String },
    /// A user left a channel.
    MemberLeftChannel { user: String, channel: String },
    /// The bot joined a channel.
    ChannelJoined { channel: ChannelInfo },
    /// A channel was renamed.
    ChannelRename { channel: RenamedChannel },
    /// Anything the bridge does not handle.
    #[serde(other)]
    Unknown,
}

/// Body of an `error` event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetail {
    pub code: Option<i64>,
    pub msg: Option<String>,
}

/// Payload of a `channel_rename` event.
#[derive(Debug, Clone, Deserialize)]
pub struct RenamedChannel {
    pub id: String,
    pub name: String,
}

/// A message or file-share event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    pub subtype: Option<String>,
    pub channel: Option<String>,
    pub user: Option<String>,
    pub bot_id: Option<String>,
    /// Display name some bot messages carry.
    pub username: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,
    pub edited: Option<Edited>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

/// Edit marker carried by edited messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Edited {
    pub user: Option<String>,
    pub ts: Option<String>,
}

/// Message attachment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Attachment {
    pub fallback: Option<String>,
    pub text: Option<String>,
    pub image_url: Option<String>,
}

/// Shared file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileInfo {
    pub title: Option<String>,
    pub permalink: Option<String>,
}

impl MessageEvent {
    pub fn is_edited(&self) -> bool {
        self.edited.is_some()
    }

    /// `/me` messages.
    pub fn is_action(&self) -> bool {
        self.subtype.as_deref() == Some("me_message")
    }

    /// The user ID, or the bot ID for bot messages.
    pub fn sender_id(&self) -> Option<&str> {
        self.user.as_deref().or(self.bot_id.as_deref())
    }
}
