//! Slack API surface the bridge needs from a transport.

use async_trait::async_trait;

use crate::common::error::ApiResult;
use crate::common::messages::{Completion, SlackRequest};
use crate::slack::workspace::{ChannelInfo, ChannelKind, WorkspaceSnapshot};

/// Which mark-read endpoint a channel uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadKind {
    Direct,
    MultiParty,
    Channel,
}

impl MarkReadKind {
    pub fn for_kind(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Direct => MarkReadKind::Direct,
            ChannelKind::MultiParty => MarkReadKind::MultiParty,
            ChannelKind::Public | ChannelKind::Private => MarkReadKind::Channel,
        }
    }

    /// API method name.
    pub fn method(self) -> &'static str {
        match self {
            MarkReadKind::Direct => "im.mark",
            MarkReadKind::MultiParty => "mpim.mark",
            MarkReadKind::Channel => "channels.mark",
        }
    }
}

/// Calls against one Slack workspace, bound to one token.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Authenticate and fetch the workspace state.
    async fn connect(&self) -> ApiResult<WorkspaceSnapshot>;

    async fn list_channels(&self) -> ApiResult<Vec<ChannelInfo>>;

    async fn send_message(&self, channel_id: &str, text: &str, as_user: bool) -> ApiResult<()>;

    async fn mark_read(&self, kind: MarkReadKind, channel_id: &str, ts: &str) -> ApiResult<()>;
}

/// Run a request and package its outcome for the event loop.
pub async fn execute(api: &dyn SlackApi, request: SlackRequest) -> Completion {
    match request {
        SlackRequest::Send(message) => {
            let result = api
                .send_message(&message.channel_id, &message.text, message.as_user)
                .await;
            Completion::Sent { message, result }
        }
        SlackRequest::MarkRead {
            kind,
            channel_id,
            ts,
        } => {
            let result = api.mark_read(kind, &channel_id, &ts).await;
            Completion::MarkedRead {
                channel_id,
                ts,
                result,
            }
        }
        SlackRequest::ListChannels => Completion::ChannelsListed {
            result: api.list_channels().await,
        },
    }
}
