//! Workspace directory for one Slack connection.
//!
//! Seeded from the `connect()` snapshot and kept current by user and
//! channel events. Everything the bridge knows about names lives here.

use std::collections::HashMap;

use serde::Deserialize;

use crate::slack::resolver::NameLookup;

/// The authenticated user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelfInfo {
    pub id: String,
    pub name: String,
}

/// Team the connection belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    pub real_name: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    pub profile: Option<Profile>,
}

impl UserInfo {
    pub fn real_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.real_name.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
}

/// Kind of Slack conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Public,
    Private,
    /// One-to-one direct message.
    Direct,
    /// Multi-party direct message.
    MultiParty,
}

/// A Slack conversation as reported by the API.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_member: bool,
    #[serde(default)]
    pub is_im: bool,
    #[serde(default)]
    pub is_mpim: bool,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub is_private: bool,
    /// Peer user of a direct message.
    pub user: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

impl ChannelInfo {
    pub fn kind(&self) -> ChannelKind {
        if self.is_im {
            ChannelKind::Direct
        } else if self.is_mpim {
            ChannelKind::MultiParty
        } else if self.is_group || self.is_private {
            ChannelKind::Private
        } else {
            ChannelKind::Public
        }
    }

    /// Whether the authenticated user takes part in this conversation.
    pub fn is_joined(&self) -> bool {
        self.is_member || self.is_im || self.is_mpim
    }
}

/// Workspace state returned by a successful connect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(rename = "self")]
    pub self_info: SelfInfo,
    pub team: Option<Team>,
    #[serde(default)]
    pub users: Vec<UserInfo>,
    #[serde(default)]
    pub bots: Vec<BotInfo>,
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
}

/// Live directory of users, bots and channels.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    self_info: SelfInfo,
    team: Option<Team>,
    users: HashMap<String, UserInfo>,
    bots: HashMap<String, BotInfo>,
    channels: HashMap<String, ChannelInfo>,
}

impl Workspace {
    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Self {
        Self {
            self_info: snapshot.self_info,
            team: snapshot.team,
            users: snapshot
                .users
                .into_iter()
                .map(|u| (u.id.clone(), u))
                .collect(),
            bots: snapshot
                .bots
                .into_iter()
                .map(|b| (b.id.clone(), b))
                .collect(),
            channels: snapshot
                .channels
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    pub fn self_id(&self) -> &str {
        &self.self_info.id
    }

    pub fn self_name(&self) -> &str {
        &self.self_info.name
    }

    pub fn team_id(&self) -> Option<&str> {
        self.team.as_ref().map(|t| t.id.as_str())
    }

    pub fn user(&self, id: &str) -> Option<&UserInfo> {
        self.users.get(id)
    }

    pub fn channel(&self, id: &str) -> Option<&ChannelInfo> {
        self.channels.get(id)
    }

    /// Kind of a channel, guessed from the ID prefix when the channel is
    /// not in the directory.
    pub fn channel_kind(&self, id: &str) -> ChannelKind {
        match self.channels.get(id) {
            Some(channel) => channel.kind(),
            None if id.starts_with('D') => ChannelKind::Direct,
            None if id.starts_with('G') => ChannelKind::Private,
            None => ChannelKind::Public,
        }
    }

    /// Channels the authenticated user is part of, in ID order.
    pub fn joined_channels(&self) -> Vec<&ChannelInfo> {
        let mut joined: Vec<&ChannelInfo> =
            self.channels.values().filter(|c| c.is_joined()).collect();
        joined.sort_by(|a, b| a.id.cmp(&b.id));
        joined
    }

    /// Name used for the bridge-side channel.
    ///
    /// Direct messages are named after the peer user. Falls back to the ID.
    pub fn channel_name(&self, id: &str) -> String {
        let Some(channel) = self.channels.get(id) else {
            return id.to_string();
        };
        if channel.kind() == ChannelKind::Direct {
            if let Some(peer) = channel.user.as_deref().and_then(|u| self.users.get(u)) {
                return peer.name.clone();
            }
        }
        channel
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| id.to_string())
    }

    /// Member IDs of a channel.
    ///
    /// Direct messages without an explicit member list consist of the peer
    /// and the authenticated user.
    pub fn members_of(&self, id: &str) -> Vec<String> {
        let Some(channel) = self.channels.get(id) else {
            return Vec::new();
        };
        if !channel.members.is_empty() {
            return channel.members.clone();
        }
        match (channel.kind(), channel.user.as_ref()) {
            (ChannelKind::Direct, Some(peer)) => {
                vec![peer.clone(), self.self_info.id.clone()]
            }
            _ => Vec::new(),
        }
    }

    /// Insert or replace a user. Returns `true` when the authenticated user
    /// changed name.
    pub fn upsert_user(&mut self, user: UserInfo) -> bool {
        let renamed_self = user.id == self.self_info.id && user.name != self.self_info.name;
        if renamed_self {
            self.self_info.name = user.name.clone();
        }
        self.users.insert(user.id.clone(), user);
        renamed_self
    }

    /// Insert or replace a channel, keeping the known member list when the
    /// update carries none.
    pub fn upsert_channel(&mut self, mut channel: ChannelInfo) {
        if channel.members.is_empty() {
            if let Some(existing) = self.channels.get(&channel.id) {
                channel.members = existing.members.clone();
            }
        }
        self.channels.insert(channel.id.clone(), channel);
    }

    /// Returns `false` when the channel is unknown.
    pub fn rename_channel(&mut self, id: &str, name: &str) -> bool {
        match self.channels.get_mut(id) {
            Some(channel) => {
                channel.name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    pub fn add_member(&mut self, channel_id: &str, user_id: &str) {
        let channel = self
            .channels
            .entry(channel_id.to_string())
            .or_insert_with(|| ChannelInfo {
                id: channel_id.to_string(),
                ..Default::default()
            });
        if !channel.members.iter().any(|m| m == user_id) {
            channel.members.push(user_id.to_string());
        }
        if user_id == self.self_info.id {
            channel.is_member = true;
        }
    }

    pub fn remove_member(&mut self, channel_id: &str, user_id: &str) {
        if let Some(channel) = self.channels.get_mut(channel_id) {
            channel.members.retain(|m| m != user_id);
            if user_id == self.self_info.id {
                channel.is_member = false;
            }
        }
    }
}

impl NameLookup for Workspace {
    fn mention_name(&self, id: &str) -> Option<&str> {
        self.users
            .get(id)
            .map(|u| u.name.as_str())
            .or_else(|| self.bots.get(id).map(|b| b.name.as_str()))
    }
}
