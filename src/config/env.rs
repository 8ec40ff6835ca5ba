//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `SLACKLINE_CONFIG` - Config file path
//! - `SLACKLINE_TOKEN` - Token of the first bot
//! - `SLACKLINE_NAME` - Name of the first bot

use std::env;

use crate::config::types::{BotConfig, Config};

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "SLACKLINE";

/// Name given to a bot that only exists through `SLACKLINE_TOKEN`.
const DEFAULT_BOT_NAME: &str = "Slack";

/// Apply environment variable overrides to a config.
///
/// This allows the token to be provided via the environment instead of the
/// config file.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_bot_overrides(
        config,
        env::var(format!("{}_TOKEN", ENV_PREFIX)).ok(),
        env::var(format!("{}_NAME", ENV_PREFIX)).ok(),
    )
}

/// Override the first bot's token and name.
///
/// A token with no configured bot adds one that connects at startup.
fn apply_bot_overrides(mut config: Config, token: Option<String>, name: Option<String>) -> Config {
    if config.bots.is_empty() {
        if let Some(token) = token {
            config.bots.push(BotConfig {
                token,
                name: name.unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
                autoconnect: true,
            });
        }
        return config;
    }

    if let Some(token) = token {
        config.bots[0].token = token;
    }
    if let Some(name) = name {
        config.bots[0].name = name;
    }

    config
}

/// Check if any override variables are set but empty.
///
/// Returns a list of variable names that are set but empty.
pub fn check_empty_env_vars() -> Vec<String> {
    let vars = [
        format!("{}_TOKEN", ENV_PREFIX),
        format!("{}_NAME", ENV_PREFIX),
    ];

    vars.into_iter()
        .filter(|var| env::var(var).map(|v| v.is_empty()).unwrap_or(false))
        .collect()
}

/// Get the config file path from environment or use default.
///
/// Checks `SLACKLINE_CONFIG` environment variable, otherwise returns "slackline.json".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "slackline.json".to_string())
}
