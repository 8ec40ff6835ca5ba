//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use std::collections::HashSet;

use crate::common::error::ConfigError;
use crate::config::types::Config;

const PLACEHOLDER_TOKEN: &str = "YOUR_SLACK_TOKEN_HERE";

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.bots.is_empty() {
        errors.push("bots is empty - no Slack connection configured".to_string());
    }

    let mut seen = HashSet::new();
    for (i, bot) in config.bots.iter().enumerate() {
        if bot.token.is_empty() {
            errors.push(format!("bots[{}].token is required", i));
        } else if bot.token == PLACEHOLDER_TOKEN {
            errors.push(format!(
                "bots[{}].token has not been configured (still using placeholder)",
                i
            ));
        } else if !seen.insert(bot.token.as_str()) {
            errors.push(format!("bots[{}].token is used by another bot", i));
        }
        if bot.name.trim().is_empty() {
            errors.push(format!("bots[{}].name is required", i));
        }
    }

    if config.bridge.connect_attempts == 0 {
        errors.push("bridge.connect_attempts must be non-zero".to_string());
    }

    if config.bridge.edited_marker.trim().is_empty() {
        errors.push("bridge.edited_marker must not be blank".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}
