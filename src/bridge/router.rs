//! Event routing between Slack and the IRC side.
//!
//! Every handler runs on the bridge event loop with exclusive access to one
//! connection and returns the Slack requests it wants executed.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::bridge::connection::Connection;
use crate::bridge::membership;
use crate::bridge::read_state::ensure_channels_marked;
use crate::common::messages::{Completion, InputDisposition, OutboundMessage, SlackRequest};
use crate::common::types::{redact_token, ts_to_datetime, ChannelHandle, LineKind};
use crate::config::types::Config;
use crate::irc::{IrcNetwork, PrintLine};
use crate::slack::api::MarkReadKind;
use crate::slack::events::{MessageEvent, SlackEvent};
use crate::slack::resolver::{is_broadcast, MessageResolver, NameLookup};

/// Sender name used when a message's author cannot be resolved.
pub const UNKNOWN_SENDER: &str = "unknown";

/// Routes inbound Slack events and IRC input for all connections.
#[derive(Debug, Clone)]
pub struct EventRouter {
    resolver: MessageResolver,
    as_user: bool,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(MessageResolver::default(), true)
    }
}

impl EventRouter {
    pub fn new(resolver: MessageResolver, as_user: bool) -> Self {
        Self { resolver, as_user }
    }

    pub fn from_config(config: &Config) -> Self {
        if !config.bridge.as_user {
            info!("Messages will be posted as the app, not the user");
        }
        Self::new(
            MessageResolver::new(config.bridge.edited_marker.clone()),
            config.bridge.as_user,
        )
    }

    pub fn handle_slack_event<N: IrcNetwork>(
        &self,
        conn: &mut Connection<N>,
        event: SlackEvent,
    ) -> Vec<SlackRequest> {
        match event {
            SlackEvent::Hello => return self.on_hello(conn),
            SlackEvent::Message(message) | SlackEvent::FileShared(message) => {
                self.on_message(conn, message)
            }
            SlackEvent::Error { error } => {
                let text = error.msg.unwrap_or_else(|| "unknown error".to_string());
                warn!(token = %redact_token(conn.token()), code = ?error.code, "Slack error: {}", text);
                conn.network.notice(None, &format!("Slack error: {}", text));
            }
            SlackEvent::UserChange { user } | SlackEvent::TeamJoin { user } => {
                let user_id = user.id.clone();
                if conn.workspace.upsert_user(user) {
                    let nick = conn.workspace.self_name().to_string();
                    info!(token = %redact_token(conn.token()), nick = %nick, "Own Slack name changed");
                    conn.network.set_nickname(&nick);
                }
                for channel_id in conn.registry.source_ids() {
                    if conn.workspace.members_of(&channel_id).contains(&user_id) {
                        reconcile_channel(conn, &channel_id);
                    }
                }
            }
            SlackEvent::MemberJoinedChannel { user, channel } => {
                conn.workspace.add_member(&channel, &user);
                reconcile_channel(conn, &channel);
            }
            SlackEvent::MemberLeftChannel { user, channel } => {
                conn.workspace.remove_member(&channel, &user);
                reconcile_channel(conn, &channel);
            }
            SlackEvent::ChannelJoined { channel } => {
                let channel_id = channel.id.clone();
                conn.workspace.upsert_channel(channel);
                resolve_channel(conn, &channel_id);
                reconcile_channel(conn, &channel_id);
            }
            SlackEvent::ChannelRename { channel } => {
                if conn.workspace.rename_channel(&channel.id, &channel.name)
                    && conn.registry.get(&channel.id).is_some()
                {
                    resolve_channel(conn, &channel.id);
                }
            }
            SlackEvent::Unknown => debug!("Ignoring unhandled Slack event"),
        }
        Vec::new()
    }

    fn on_hello<N: IrcNetwork>(&self, conn: &mut Connection<N>) -> Vec<SlackRequest> {
        for channel_id in conn.registry.source_ids() {
            resolve_channel(conn, &channel_id);
            reconcile_channel(conn, &channel_id);
        }
        let text = format!("Connected to Slack as {}", conn.workspace.self_name());
        conn.network.notice(None, &text);
        info!(
            token = %redact_token(conn.token()),
            channels = conn.registry.len(),
            "Slack connection ready"
        );
        vec![SlackRequest::ListChannels]
    }

    fn on_message<N: IrcNetwork>(&self, conn: &mut Connection<N>, message: MessageEvent) {
        let (Some(channel_id), Some(sender_id), Some(text)) = (
            message.channel.as_deref(),
            message.sender_id(),
            message.text.as_deref(),
        ) else {
            debug!(subtype = ?message.subtype, "Dropping message without channel, sender or text");
            return;
        };

        let handle = resolve_channel(conn, channel_id);
        let sender = conn
            .workspace
            .mention_name(sender_id)
            .map(str::to_string)
            .or_else(|| message.username.clone())
            .unwrap_or_else(|| UNKNOWN_SENDER.to_string());
        let rendered = self.resolver.render(&message, &conn.workspace);
        let time = message
            .ts
            .as_deref()
            .and_then(ts_to_datetime)
            .unwrap_or_else(Utc::now);
        let kind = if message.is_action() {
            LineKind::Action
        } else {
            LineKind::Message
        };

        let outcome = conn.network.print(PrintLine {
            handle,
            sender: sender.clone(),
            text: rendered,
            kind,
            time,
        });

        if sender == conn.network.nickname() {
            debug!(channel = channel_id, "Own message, not marking unread");
        } else {
            let highlight = is_broadcast(text) || outcome.highlighted;
            conn.network.set_unread(handle, highlight);
        }

        if let Some(ts) = message.ts.as_deref() {
            if let Some(mapping) = conn.registry.get_mut(channel_id) {
                mapping.read.record(ts);
            }
        }

        reconcile_channel(conn, channel_id);
    }

    /// Translate text typed into an IRC channel.
    ///
    /// Input in a bridged channel is sent to Slack and consumed; the visible
    /// copy arrives later as Slack's echo of the message. Nothing is sent
    /// while the connection is down.
    pub fn handle_user_input<N: IrcNetwork>(
        &self,
        conn: &mut Connection<N>,
        channel: &str,
        text: String,
    ) -> (InputDisposition, Vec<SlackRequest>) {
        if !conn.is_connected() {
            return (InputDisposition::PassThrough(text), Vec::new());
        }
        let mapping = conn
            .network
            .find_channel(channel)
            .and_then(|handle| conn.registry.channel_for(handle));
        let Some(mapping) = mapping else {
            return (InputDisposition::PassThrough(text), Vec::new());
        };
        let handle = mapping.handle;
        let channel_id = mapping.source_channel_id.clone();

        let request = SlackRequest::Send(OutboundMessage {
            handle,
            channel_id,
            text,
            as_user: self.as_user,
        });
        (InputDisposition::Consumed, vec![request])
    }

    pub fn handle_channel_selected<N: IrcNetwork>(
        &self,
        conn: &mut Connection<N>,
        channel: &str,
    ) -> Vec<SlackRequest> {
        if let Some(handle) = conn.network.find_channel(channel) {
            conn.network.select_channel(handle);
        }
        ensure_channels_marked(&mut conn.registry, &conn.network)
    }

    pub fn handle_app_activated<N: IrcNetwork>(&self, conn: &mut Connection<N>) -> Vec<SlackRequest> {
        ensure_channels_marked(&mut conn.registry, &conn.network)
    }

    pub fn handle_completion<N: IrcNetwork>(
        &self,
        conn: &mut Connection<N>,
        completion: Completion,
    ) -> Vec<SlackRequest> {
        match completion {
            Completion::Sent { message, result } => match result {
                Ok(()) => debug!(channel = %message.channel_id, "Message sent"),
                Err(e) => {
                    warn!(channel = %message.channel_id, "Failed to send message: {}", e);
                    conn.network.notice(
                        Some(message.handle),
                        &format!("Failed to send \"{}\": {}", message.text, e),
                    );
                }
            },
            Completion::MarkedRead {
                channel_id,
                ts,
                result,
            } => {
                let Some(mapping) = conn.registry.get_mut(&channel_id) else {
                    return Vec::new();
                };
                match result {
                    Ok(()) => {
                        debug!(channel = %channel_id, ts = %ts, "Channel marked read");
                        mapping.read.ack_succeeded(&ts);
                    }
                    Err(e) => {
                        mapping.read.ack_failed(&ts);
                        warn!(channel = %channel_id, "Failed to mark channel read: {}", e);
                        conn.network.notice(
                            Some(mapping.handle),
                            &format!("Failed to mark channel read: {}", e),
                        );
                    }
                }
            }
            Completion::ChannelsListed { result } => match result {
                Ok(channels) => {
                    let mut joined = Vec::new();
                    for channel in channels {
                        if channel.is_joined() {
                            joined.push(channel.id.clone());
                        }
                        conn.workspace.upsert_channel(channel);
                    }
                    for channel_id in &joined {
                        resolve_channel(conn, channel_id);
                        reconcile_channel(conn, channel_id);
                    }
                    info!(
                        token = %redact_token(conn.token()),
                        joined = joined.len(),
                        "Channel list synchronized"
                    );
                }
                Err(e) => {
                    warn!(token = %redact_token(conn.token()), "Channel list sync failed: {}", e);
                    conn.network
                        .notice(None, &format!("Failed to list channels: {}", e));
                }
            },
        }
        Vec::new()
    }
}

/// Map a Slack channel to its IRC channel, refreshing the topic.
fn resolve_channel<N: IrcNetwork>(conn: &mut Connection<N>, channel_id: &str) -> ChannelHandle {
    let name = conn.workspace.channel_name(channel_id);
    let kind = MarkReadKind::for_kind(conn.workspace.channel_kind(channel_id));
    conn.registry.resolve_or_create(
        &mut conn.network,
        channel_id,
        &name,
        conn.workspace.team_id(),
        kind,
    )
}

/// Reconcile a mapped channel whose member list is known.
fn reconcile_channel<N: IrcNetwork>(conn: &mut Connection<N>, channel_id: &str) {
    let Some(handle) = conn.registry.get(channel_id).map(|m| m.handle) else {
        return;
    };
    if conn.workspace.channel(channel_id).is_none() {
        debug!(channel = channel_id, "Member list unknown, skipping reconcile");
        return;
    }
    let members = conn.workspace.members_of(channel_id);
    membership::reconcile(&mut conn.network, handle, &members, &conn.workspace);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::common::error::{ApiError, ApiResult};
    use crate::irc::MemoryNetwork;
    use crate::slack::api::SlackApi;
    use crate::slack::workspace::{ChannelInfo, WorkspaceSnapshot};

    struct NullApi;

    #[async_trait]
    impl SlackApi for NullApi {
        async fn connect(&self) -> ApiResult<WorkspaceSnapshot> {
            Ok(WorkspaceSnapshot::default())
        }

        async fn list_channels(&self) -> ApiResult<Vec<ChannelInfo>> {
            Ok(Vec::new())
        }

        async fn send_message(&self, _: &str, _: &str, _: bool) -> ApiResult<()> {
            Ok(())
        }

        async fn mark_read(&self, _: MarkReadKind, _: &str, _: &str) -> ApiResult<()> {
            Ok(())
        }
    }

    fn connection() -> Connection<MemoryNetwork> {
        let mut conn = Connection::new("xoxb-test", "Work", Arc::new(NullApi), MemoryNetwork::new(""));
        let snapshot: WorkspaceSnapshot = serde_json::from_str(
            r#"{
                "self": {"id": "U0", "name": "me"},
                "team": {"id": "T1"},
                "users": [
                    {"id": "U0", "name": "me"},
                    {"id": "U1", "name": "alice"},
                    {"id": "U2", "name": "bob"},
                    {"id": "U3", "name": "carol"}
                ],
                "bots": [{"id": "B1", "name": "deploybot"}],
                "channels": [
                    {"id": "C1", "name": "general", "is_member": true, "members": ["U0", "U1", "U2"]},
                    {"id": "D1", "is_im": true, "user": "U1"}
                ]
            }"#,
        )
        .unwrap();
        conn.attach(snapshot);
        conn
    }

    fn message(channel: &str, user: &str, text: &str, ts: &str) -> SlackEvent {
        SlackEvent::Message(MessageEvent {
            channel: Some(channel.to_string()),
            user: Some(user.to_string()),
            text: Some(text.to_string()),
            ts: Some(ts.to_string()),
            ..Default::default()
        })
    }

    fn handle_of(conn: &Connection<MemoryNetwork>, channel_id: &str) -> ChannelHandle {
        conn.registry().get(channel_id).unwrap().handle
    }

    #[test]
    fn test_message_is_printed_and_tracked() {
        let router = EventRouter::default();
        let mut conn = connection();

        let requests = router.handle_slack_event(
            &mut conn,
            message("C1", "U1", "hi <@U2> :smile:", "1525000000.000100"),
        );
        assert!(requests.is_empty());

        let handle = handle_of(&conn, "C1");
        let net = conn.network();
        assert_eq!(net.channel_name(handle), Some("#general"));
        assert_eq!(net.topic(handle), Some("slack://channel?team=T1&id=C1"));

        let line = &net.lines(handle)[0];
        assert_eq!(line.sender, "alice");
        assert_eq!(line.text, "hi bob 😄");
        assert_eq!(line.kind, LineKind::Message);
        assert_eq!(line.time.timestamp(), 1_525_000_000);

        assert!(net.is_unread(handle));
        assert!(!net.is_highlighted(handle));
        let read = &conn.registry().get("C1").unwrap().read;
        assert_eq!(read.last_message_ts(), Some("1525000000.000100"));
        assert_eq!(net.members(handle), vec!["me", "alice", "bob"]);
    }

    #[test]
    fn test_own_message_does_not_mark_unread() {
        let router = EventRouter::default();
        let mut conn = connection();

        router.handle_slack_event(&mut conn, message("C1", "U0", "hello <!here>", "100"));

        let handle = handle_of(&conn, "C1");
        assert_eq!(conn.network().lines(handle)[0].sender, "me");
        assert!(!conn.network().is_unread(handle));
        assert!(!conn.network().is_highlighted(handle));
        assert_eq!(
            conn.registry().get("C1").unwrap().read.last_message_ts(),
            Some("100")
        );
    }

    #[test]
    fn test_highlights() {
        let router = EventRouter::default();
        let mut conn = connection();

        router.handle_slack_event(&mut conn, message("C1", "U1", "<!channel> standup", "100"));
        let handle = handle_of(&conn, "C1");
        assert!(conn.network().is_highlighted(handle));

        conn.network_mut().select_channel(handle);
        router.handle_slack_event(&mut conn, message("D1", "U1", "ping <@U0>", "101"));
        let direct = handle_of(&conn, "D1");
        assert_eq!(conn.network().channel_name(direct), Some("#alice"));
        // Rendered as "ping me", which matches the own-nick highlight rule
        assert!(conn.network().is_highlighted(direct));
    }

    #[test]
    fn test_malformed_messages_dropped() {
        let router = EventRouter::default();
        let mut conn = connection();

        let no_channel = SlackEvent::Message(MessageEvent {
            user: Some("U1".to_string()),
            text: Some("x".to_string()),
            ..Default::default()
        });
        let no_sender = SlackEvent::Message(MessageEvent {
            channel: Some("C1".to_string()),
            text: Some("x".to_string()),
            ..Default::default()
        });
        let no_text = SlackEvent::Message(MessageEvent {
            channel: Some("C1".to_string()),
            user: Some("U1".to_string()),
            ..Default::default()
        });
        for event in [no_channel, no_sender, no_text] {
            router.handle_slack_event(&mut conn, event);
        }

        assert!(conn.registry().is_empty());
        assert_eq!(conn.network().channel_count(), 0);
    }

    #[test]
    fn test_senders() {
        let router = EventRouter::default();
        let mut conn = connection();

        router.handle_slack_event(
            &mut conn,
            SlackEvent::Message(MessageEvent {
                channel: Some("C1".to_string()),
                bot_id: Some("B1".to_string()),
                text: Some("deployed".to_string()),
                ..Default::default()
            }),
        );
        router.handle_slack_event(
            &mut conn,
            SlackEvent::Message(MessageEvent {
                channel: Some("C1".to_string()),
                bot_id: Some("B9".to_string()),
                username: Some("webhook".to_string()),
                text: Some("ping".to_string()),
                ..Default::default()
            }),
        );
        router.handle_slack_event(&mut conn, message("C1", "U404", "who am i", "100"));
        router.handle_slack_event(
            &mut conn,
            SlackEvent::Message(MessageEvent {
                subtype: Some("me_message".to_string()),
                ..match message("C1", "U1", "waves", "101") {
                    SlackEvent::Message(m) => m,
                    _ => unreachable!(),
                }
            }),
        );

        let handle = handle_of(&conn, "C1");
        let lines = conn.network().lines(handle);
        let senders: Vec<&str> = lines.iter().map(|l| l.sender.as_str()).collect();
        assert_eq!(senders, vec!["deploybot", "webhook", "unknown", "alice"]);
        assert_eq!(lines[3].kind, LineKind::Action);
    }

    #[test]
    fn test_hello_requests_channel_list() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");
        conn.network_mut().add_member(handle, "carol");

        let requests = router.handle_slack_event(&mut conn, SlackEvent::Hello);

        assert_eq!(requests, vec![SlackRequest::ListChannels]);
        assert_eq!(conn.network().console(), ["Connected to Slack as me".to_string()]);
        assert_eq!(conn.network().members(handle), vec!["me", "alice", "bob"]);
    }

    #[test]
    fn test_error_event_posts_notice() {
        let router = EventRouter::default();
        let mut conn = connection();

        let event: SlackEvent =
            serde_json::from_str(r#"{"type": "error", "error": {"code": 1, "msg": "socket URL has expired"}}"#)
                .unwrap();
        router.handle_slack_event(&mut conn, event);

        assert_eq!(
            conn.network().console(),
            ["Slack error: socket URL has expired".to_string()]
        );
    }

    #[test]
    fn test_user_input() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");

        let (disposition, requests) =
            router.handle_user_input(&mut conn, "#general", "hello there".to_string());
        assert_eq!(disposition, InputDisposition::Consumed);
        assert_eq!(
            requests,
            vec![SlackRequest::Send(OutboundMessage {
                handle,
                channel_id: "C1".to_string(),
                text: "hello there".to_string(),
                as_user: true,
            })]
        );
        // No local echo
        assert_eq!(conn.network().lines(handle).len(), 1);

        let (disposition, requests) =
            router.handle_user_input(&mut conn, "#elsewhere", "not bridged".to_string());
        assert_eq!(
            disposition,
            InputDisposition::PassThrough("not bridged".to_string())
        );
        assert!(requests.is_empty());
    }

    #[test]
    fn test_send_as_app() {
        let router = EventRouter::new(MessageResolver::default(), false);
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));

        let (disposition, requests) =
            router.handle_user_input(&mut conn, "#general", "from the app".to_string());
        assert_eq!(disposition, InputDisposition::Consumed);
        match requests.as_slice() {
            [SlackRequest::Send(message)] => {
                assert!(!message.as_user);
                assert_eq!(message.text, "from the app");
            }
            other => panic!("unexpected requests: {:?}", other),
        }
    }

    #[test]
    fn test_mark_read_cycle() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));

        // Still unread on the IRC side
        assert!(router.handle_app_activated(&mut conn).is_empty());

        let requests = router.handle_channel_selected(&mut conn, "#general");
        assert_eq!(
            requests,
            vec![SlackRequest::MarkRead {
                kind: MarkReadKind::Channel,
                channel_id: "C1".to_string(),
                ts: "100".to_string(),
            }]
        );
        assert!(router.handle_app_activated(&mut conn).is_empty());

        router.handle_completion(
            &mut conn,
            Completion::MarkedRead {
                channel_id: "C1".to_string(),
                ts: "100".to_string(),
                result: Ok(()),
            },
        );
        let read = &conn.registry().get("C1").unwrap().read;
        assert!(!read.needs_mark());
        assert!(router.handle_app_activated(&mut conn).is_empty());
    }

    #[test]
    fn test_mark_read_failure_is_reported() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let requests = router.handle_channel_selected(&mut conn, "#general");
        assert_eq!(requests.len(), 1);

        router.handle_completion(
            &mut conn,
            Completion::MarkedRead {
                channel_id: "C1".to_string(),
                ts: "100".to_string(),
                result: Err(ApiError::RateLimited),
            },
        );

        let handle = handle_of(&conn, "C1");
        let last = conn.network().lines(handle).last().unwrap();
        assert_eq!(last.text, "Failed to mark channel read: Rate limited");
        // No automatic retry, but the next trigger tries again
        assert_eq!(router.handle_app_activated(&mut conn).len(), 1);
    }

    #[test]
    fn test_send_failure_quotes_text() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");

        router.handle_completion(
            &mut conn,
            Completion::Sent {
                message: OutboundMessage {
                    handle,
                    channel_id: "C1".to_string(),
                    text: "lost words".to_string(),
                    as_user: true,
                },
                result: Err(ApiError::NotConnected),
            },
        );

        let last = conn.network().lines(handle).last().unwrap();
        assert_eq!(last.kind, LineKind::Notice);
        assert_eq!(last.text, "Failed to send \"lost words\": Not connected");
    }

    #[test]
    fn test_channel_list_sync() {
        let router = EventRouter::default();
        let mut conn = connection();

        let channels: Vec<ChannelInfo> = serde_json::from_str(
            r#"[
                {"id": "C1", "name": "general", "is_member": true},
                {"id": "C2", "name": "random", "is_member": false},
                {"id": "C3", "name": "dev", "is_member": true, "members": ["U0", "U3"]}
            ]"#,
        )
        .unwrap();
        router.handle_completion(
            &mut conn,
            Completion::ChannelsListed {
                result: Ok(channels),
            },
        );

        assert_eq!(conn.registry().source_ids(), vec!["C1", "C3"]);
        let general = handle_of(&conn, "C1");
        let dev = handle_of(&conn, "C3");
        // Member list of C1 kept from the snapshot
        assert_eq!(conn.network().members(general), vec!["me", "alice", "bob"]);
        assert_eq!(conn.network().members(dev), vec!["me", "carol"]);
    }

    #[test]
    fn test_membership_events() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");

        router.handle_slack_event(
            &mut conn,
            SlackEvent::MemberJoinedChannel {
                user: "U3".to_string(),
                channel: "C1".to_string(),
            },
        );
        assert_eq!(conn.network().members(handle), vec!["me", "alice", "bob", "carol"]);

        router.handle_slack_event(
            &mut conn,
            SlackEvent::MemberLeftChannel {
                user: "U1".to_string(),
                channel: "C1".to_string(),
            },
        );
        assert_eq!(conn.network().members(handle), vec!["me", "bob", "carol"]);
    }

    #[test]
    fn test_user_rename_updates_members() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");

        let event: SlackEvent = serde_json::from_str(
            r#"{"type": "user_change", "user": {"id": "U2", "name": "robert"}}"#,
        )
        .unwrap();
        router.handle_slack_event(&mut conn, event);

        assert_eq!(conn.network().members(handle), vec!["me", "alice", "robert"]);
    }

    #[test]
    fn test_own_rename_keeps_echo_suppressed() {
        let router = EventRouter::default();
        let mut conn = connection();
        router.handle_slack_event(&mut conn, message("C1", "U1", "hi", "100"));
        let handle = handle_of(&conn, "C1");
        conn.network_mut().select_channel(handle);
        router.handle_slack_event(&mut conn, message("D1", "U1", "psst", "100"));
        let direct = handle_of(&conn, "D1");
        conn.network_mut().select_channel(direct);
        assert!(!conn.network().is_unread(handle));

        let event: SlackEvent =
            serde_json::from_str(r#"{"type": "user_change", "user": {"id": "U0", "name": "me2"}}"#)
                .unwrap();
        router.handle_slack_event(&mut conn, event);
        assert_eq!(conn.network().nickname(), "me2");
        assert_eq!(conn.workspace().self_name(), "me2");

        router.handle_slack_event(&mut conn, message("C1", "U0", "still me", "101"));

        let net = conn.network();
        assert_eq!(net.lines(handle).last().unwrap().sender, "me2");
        assert!(!net.is_unread(handle));
        assert!(!net.is_highlighted(handle));
        assert_eq!(net.members(handle), vec!["me2", "alice", "bob"]);
        assert_eq!(
            conn.registry().get("C1").unwrap().read.last_message_ts(),
            Some("101")
        );
    }

    #[test]
    fn test_channel_joined_and_renamed() {
        let router = EventRouter::default();
        let mut conn = connection();

        let event: SlackEvent = serde_json::from_str(
            r#"{"type": "channel_joined", "channel": {"id": "C7", "name": "ops", "is_member": true, "members": ["U0", "U2"]}}"#,
        )
        .unwrap();
        router.handle_slack_event(&mut conn, event);
        let handle = handle_of(&conn, "C7");
        assert_eq!(conn.network().channel_name(handle), Some("#ops"));
        assert_eq!(conn.network().members(handle), vec!["me", "bob"]);

        let event: SlackEvent = serde_json::from_str(
            r#"{"type": "channel_rename", "channel": {"id": "C7", "name": "operations"}}"#,
        )
        .unwrap();
        router.handle_slack_event(&mut conn, event);

        assert_eq!(handle_of(&conn, "C7"), handle);
        assert_eq!(conn.workspace().channel_name("C7"), "operations");
        assert_eq!(conn.network().topic(handle), Some("slack://channel?team=T1&id=C7"));
    }
}
