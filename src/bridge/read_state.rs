//! Read-state tracking and mark-read policy.

use std::cmp::Ordering;

use tracing::debug;

use crate::bridge::registry::ChannelRegistry;
use crate::common::messages::SlackRequest;
use crate::common::types::compare_ts;
use crate::irc::IrcNetwork;

/// Last seen versus last acknowledged message of one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadState {
    last_message_ts: Option<String>,
    last_acknowledged_ts: Option<String>,
    /// Timestamp of a mark-read request that has not completed yet.
    pending_ack: Option<String>,
}

impl ReadState {
    pub fn last_message_ts(&self) -> Option<&str> {
        self.last_message_ts.as_deref()
    }

    pub fn last_acknowledged_ts(&self) -> Option<&str> {
        self.last_acknowledged_ts.as_deref()
    }

    pub fn pending_ack(&self) -> Option<&str> {
        self.pending_ack.as_deref()
    }

    /// Record a message timestamp. Older timestamps are ignored.
    ///
    /// Returns whether the last message timestamp advanced.
    pub fn record(&mut self, ts: &str) -> bool {
        if let Some(current) = &self.last_message_ts {
            if compare_ts(ts, current) != Ordering::Greater {
                return false;
            }
        }
        self.last_message_ts = Some(ts.to_string());
        true
    }

    pub fn needs_mark(&self) -> bool {
        self.last_message_ts.is_some() && self.last_message_ts != self.last_acknowledged_ts
    }

    /// Start an acknowledgement of the latest message.
    ///
    /// Returns the timestamp to send, or `None` when nothing needs marking
    /// or a request is already in flight.
    pub fn begin_ack(&mut self) -> Option<String> {
        if self.pending_ack.is_some() || !self.needs_mark() {
            return None;
        }
        self.pending_ack = self.last_message_ts.clone();
        self.pending_ack.clone()
    }

    /// The server confirmed messages up to `ts` as read.
    pub fn ack_succeeded(&mut self, ts: &str) {
        self.last_acknowledged_ts = Some(ts.to_string());
        self.clear_pending(ts);
    }

    pub fn ack_failed(&mut self, ts: &str) {
        self.clear_pending(ts);
    }

    fn clear_pending(&mut self, ts: &str) {
        if self.pending_ack.as_deref() == Some(ts) {
            self.pending_ack = None;
        }
    }
}

/// Build mark-read requests for every channel that is read on the IRC side
/// but not yet acknowledged on Slack.
pub fn ensure_channels_marked<N: IrcNetwork + ?Sized>(
    registry: &mut ChannelRegistry,
    network: &N,
) -> Vec<SlackRequest> {
    let mut requests = Vec::new();

    for mapping in registry.mappings_mut() {
        if network.is_unread(mapping.handle) {
            continue;
        }
        if let Some(ts) = mapping.read.begin_ack() {
            debug!(channel = %mapping.source_channel_id, ts = %ts, "Marking channel read");
            requests.push(SlackRequest::MarkRead {
                kind: mapping.mark_read,
                channel_id: mapping.source_channel_id.clone(),
                ts,
            });
        }
    }

    requests
}
