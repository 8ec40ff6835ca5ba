//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for everything that
//! travels through the bridge event queue: inbound Slack events, host
//! signals from the IRC side, outbound Slack requests and their completions.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::common::error::ApiError;
use crate::common::types::{redact_token, ChannelHandle};
use crate::slack::api::{MarkReadKind, SlackApi};
use crate::slack::events::SlackEvent;
use crate::slack::workspace::{ChannelInfo, WorkspaceSnapshot};

/// Message to send to Slack on behalf of the IRC user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// IRC channel the input came from (errors are reported there).
    pub handle: ChannelHandle,
    /// Slack channel ID.
    pub channel_id: String,
    /// Message text.
    pub text: String,
    /// Post as the authenticated user rather than as a bot.
    pub as_user: bool,
}

/// Request for the Slack API, executed off the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackRequest {
    /// Post a message.
    Send(OutboundMessage),
    /// Acknowledge messages up to `ts`.
    MarkRead {
        kind: MarkReadKind,
        channel_id: String,
        ts: String,
    },
    /// Refresh the channel list.
    ListChannels,
}

/// Result of a `SlackRequest`, delivered back onto the event loop.
#[derive(Debug, Clone)]
pub enum Completion {
    Sent {
        message: OutboundMessage,
        result: Result<(), ApiError>,
    },
    MarkedRead {
        channel_id: String,
        ts: String,
        result: Result<(), ApiError>,
    },
    ChannelsListed {
        result: Result<Vec<ChannelInfo>, ApiError>,
    },
}

/// What the host should do with a line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDisposition {
    /// Not a bridged channel; handle the input normally.
    PassThrough(String),
    /// Sent to Slack; the host must not echo it.
    Consumed,
}

/// Request to bring a token online.
///
/// An existing connection for the token is reused together with its channel
/// mappings; `name` and `api` are only used when the token is new.
#[derive(Clone)]
pub struct ConnectRequest {
    pub token: String,
    pub name: String,
    pub api: Arc<dyn SlackApi>,
}

impl fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("token", &redact_token(&self.token))
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Event marshaled onto the bridge's single execution context.
#[derive(Debug)]
pub enum BridgeEvent {
    /// Decoded event from a Slack connection.
    Slack { token: String, event: SlackEvent },
    /// Text typed into an IRC channel.
    UserInput {
        token: String,
        channel: String,
        text: String,
        reply: Option<oneshot::Sender<InputDisposition>>,
    },
    /// The host selected an IRC channel.
    ChannelSelected { token: String, channel: String },
    /// The host application became active.
    AppActivated,
    /// A Slack request finished.
    Completed { token: String, completion: Completion },
    /// Connect a token, registering it first if needed.
    Connect(ConnectRequest),
    /// A connect attempt finished, after any retries.
    Connected {
        token: String,
        result: Result<WorkspaceSnapshot, ApiError>,
    },
    /// Take a connection offline. Its channel mappings are kept for the
    /// next connect.
    Disconnect { token: String },
    /// Stop the event loop once in-flight requests have completed.
    Shutdown,
}
