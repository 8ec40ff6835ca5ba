//! One bridged Slack workspace.

use std::sync::Arc;

use tracing::info;

use crate::bridge::registry::ChannelRegistry;
use crate::common::types::redact_token;
use crate::irc::IrcNetwork;
use crate::slack::api::SlackApi;
use crate::slack::workspace::{Workspace, WorkspaceSnapshot};

/// State owned for one Slack token: the API client, the workspace
/// directory, the channel mappings and the IRC network they are bridged to.
pub struct Connection<N: IrcNetwork> {
    token: String,
    name: String,
    api: Arc<dyn SlackApi>,
    connected: bool,
    pub(crate) workspace: Workspace,
    pub(crate) registry: ChannelRegistry,
    pub(crate) network: N,
}

impl<N: IrcNetwork> Connection<N> {
    pub fn new(
        token: impl Into<String>,
        name: impl Into<String>,
        api: Arc<dyn SlackApi>,
        network: N,
    ) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            api,
            connected: false,
            workspace: Workspace::default(),
            registry: ChannelRegistry::new(),
            network,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn api(&self) -> Arc<dyn SlackApi> {
        Arc::clone(&self.api)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// Install a fresh workspace snapshot after a successful connect.
    ///
    /// Existing channel mappings are kept.
    pub fn attach(&mut self, snapshot: WorkspaceSnapshot) {
        self.workspace = Workspace::from_snapshot(snapshot);
        let nick = self.workspace.self_name().to_string();
        if !nick.is_empty() {
            self.network.set_nickname(&nick);
        }
        self.connected = true;
        info!(
            token = %redact_token(&self.token),
            name = %self.name,
            nick = %nick,
            channels = self.registry.len(),
            "Slack workspace attached"
        );
    }

    pub fn detach(&mut self) {
        if self.connected {
            self.connected = false;
            self.network.notice(None, "Disconnected from Slack");
            info!(token = %redact_token(&self.token), "Slack connection closed");
        }
    }
}
