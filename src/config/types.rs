//! Configuration type definitions.

use serde::Deserialize;

use crate::slack::resolver::EDITED_MARKER;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bots: Vec<BotConfig>,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// One Slack credential.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    /// Display name of the connection on the IRC side.
    pub name: String,
    #[serde(default)]
    pub autoconnect: bool,
}

/// Bridge behaviour settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Prefix for edited messages
    #[serde(default = "default_edited_marker")]
    pub edited_marker: String,
    /// Post outbound messages as the authenticated user
    #[serde(default = "default_as_user")]
    pub as_user: bool,
    /// Connect attempts before giving up on a token
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            edited_marker: default_edited_marker(),
            as_user: default_as_user(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

fn default_edited_marker() -> String {
    EDITED_MARKER.to_string()
}

fn default_as_user() -> bool {
    true
}

fn default_connect_attempts() -> usize {
    5
}

impl Config {
    /// Bots to connect at startup.
    pub fn autoconnect_bots(&self) -> impl Iterator<Item = &BotConfig> {
        self.bots.iter().filter(|bot| bot.autoconnect)
    }
}
