//! Replay host.
//!
//! Drives the bridge from a JSON-lines file instead of a live Slack
//! connection. Each line is one entry:
//!
//! ```text
//! {"kind": "workspace", "self": {"id": "U0", "name": "me"}, "channels": [...]}
//! {"kind": "event", "event": {"type": "message", "channel": "C1", "user": "U1", "text": "hi", "ts": "100"}}
//! {"kind": "input", "channel": "#general", "text": "hello"}
//! {"kind": "select", "channel": "#general"}
//! {"kind": "activate"}
//! ```
//!
//! Workspace entries must come first. Messages sent to Slack are echoed back
//! as messages from the authenticated user, the way Slack does.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::bridge::{connect_backoff, BridgeHandle, BridgeRuntime, EventRouter};
use crate::common::error::ApiResult;
use crate::common::messages::InputDisposition;
use crate::config::types::{BotConfig, Config};
use crate::irc::MemoryNetwork;
use crate::slack::api::{MarkReadKind, SlackApi};
use crate::slack::events::{MessageEvent, SlackEvent};
use crate::slack::workspace::{ChannelInfo, WorkspaceSnapshot};

/// How long to wait for the echo of a consumed input line.
const ECHO_TIMEOUT: Duration = Duration::from_millis(500);

/// Name shown for messages posted as the app rather than the user.
const APP_SENDER: &str = "slackline";

/// One line of a replay file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayEntry {
    Workspace(WorkspaceSnapshot),
    Event { event: SlackEvent },
    Input { channel: String, text: String },
    Select { channel: String },
    Activate,
}

/// Parse a replay file. Blank lines are skipped.
pub fn parse_entries(content: &str) -> Result<Vec<ReplayEntry>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid replay entry on line {}", i + 1))
        })
        .collect()
}

/// Slack API backed by a workspace snapshot.
pub struct ReplayApi {
    token: String,
    snapshot: WorkspaceSnapshot,
    handle: BridgeHandle,
    sent: Notify,
}

impl ReplayApi {
    pub fn new(token: &str, snapshot: WorkspaceSnapshot, handle: BridgeHandle) -> Self {
        Self {
            token: token.to_string(),
            snapshot,
            handle,
            sent: Notify::new(),
        }
    }

    /// Wait until a sent message has been echoed back.
    async fn echoed(&self) -> bool {
        tokio::time::timeout(ECHO_TIMEOUT, self.sent.notified())
            .await
            .is_ok()
    }
}

#[async_trait]
impl SlackApi for ReplayApi {
    async fn connect(&self) -> ApiResult<WorkspaceSnapshot> {
        Ok(self.snapshot.clone())
    }

    async fn list_channels(&self) -> ApiResult<Vec<ChannelInfo>> {
        Ok(self.snapshot.channels.clone())
    }

    async fn send_message(&self, channel_id: &str, text: &str, as_user: bool) -> ApiResult<()> {
        let now = Utc::now();
        let mut echo = MessageEvent {
            channel: Some(channel_id.to_string()),
            text: Some(text.to_string()),
            ts: Some(format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())),
            ..Default::default()
        };
        if as_user {
            echo.user = Some(self.snapshot.self_info.id.clone());
        } else {
            echo.bot_id = Some("B0".to_string());
            echo.username = Some(APP_SENDER.to_string());
        }
        self.handle.slack_event(&self.token, SlackEvent::Message(echo));
        self.sent.notify_one();
        Ok(())
    }

    async fn mark_read(&self, kind: MarkReadKind, channel_id: &str, ts: &str) -> ApiResult<()> {
        info!(channel = channel_id, ts = ts, "{}", kind.method());
        Ok(())
    }
}

/// Replay a file against the first bot configured to autoconnect.
pub async fn replay_file(config: &Config, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read replay file '{}'", path.display()))?;
    let entries = parse_entries(&content)?;

    let mut bots = config.autoconnect_bots();
    let bot = bots
        .next()
        .context("No bot is configured to autoconnect")?;
    if bots.next().is_some() {
        warn!("Replay drives a single connection; only '{}' is used", bot.name);
    }

    let network = MemoryNetwork::new(bot.name.as_str()).with_echo();
    replay(config, bot, entries, network).await?;
    Ok(())
}

/// Run entries through a fresh runtime and return it after shutdown.
pub async fn replay(
    config: &Config,
    bot: &BotConfig,
    entries: Vec<ReplayEntry>,
    network: MemoryNetwork,
) -> Result<BridgeRuntime<MemoryNetwork>> {
    let mut snapshot = WorkspaceSnapshot::default();
    let mut feed = Vec::new();
    for entry in entries {
        match entry {
            ReplayEntry::Workspace(s) if feed.is_empty() => snapshot = s,
            ReplayEntry::Workspace(_) => warn!("Ignoring workspace entry after the first event"),
            other => feed.push(other),
        }
    }

    let mut runtime = BridgeRuntime::new(
        EventRouter::from_config(config),
        connect_backoff(config.bridge.connect_attempts),
    );
    let handle = runtime.handle();
    let api = Arc::new(ReplayApi::new(&bot.token, snapshot, handle.clone()));
    runtime.add_connection(&bot.token, &bot.name, api.clone(), network);
    runtime.connect(&bot.token).await?;

    let task = tokio::spawn(runtime.run());
    info!(entries = feed.len(), "Replaying");

    for entry in feed {
        match entry {
            ReplayEntry::Event { event } => {
                handle.slack_event(&bot.token, event);
            }
            ReplayEntry::Input { channel, text } => {
                let reply = handle.user_input(&bot.token, &channel, &text);
                match reply.await {
                    Ok(InputDisposition::Consumed) => {
                        if !api.echoed().await {
                            warn!(channel = %channel, "No echo for sent message");
                        }
                    }
                    Ok(InputDisposition::PassThrough(text)) => {
                        info!(channel = %channel, "Not bridged, kept local: {}", text);
                    }
                    Err(_) => warn!("Bridge stopped before answering input"),
                }
            }
            ReplayEntry::Select { channel } => {
                handle.select_channel(&bot.token, &channel);
            }
            ReplayEntry::Activate => {
                handle.app_activated();
            }
            ReplayEntry::Workspace(_) => {}
        }
    }

    handle.shutdown();
    let runtime = task.await.context("Bridge event loop failed")?;
    Ok(runtime)
}
