//! Slackline - Slack-IRC bridge engine
//!
//! Runs the bridge against a replay file of Slack events and IRC input,
//! printing the IRC side to the console.

use std::env;

use anyhow::{bail, Result};
use tokio::signal;
use tracing::{error, info, warn};

use slackline::config::env::{check_empty_env_vars, get_config_path};
use slackline::config::load_and_validate;
use slackline::replay;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Slackline v{} starting...", env!("CARGO_PKG_VERSION"));

    for var in check_empty_env_vars() {
        warn!("{} is set but empty", var);
    }

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    for bot in &config.bots {
        info!("  Bot: {} (autoconnect: {})", bot.name, bot.autoconnect);
    }

    let Some(replay_path) = env::args()
        .nth(1)
        .or_else(|| env::var("SLACKLINE_REPLAY").ok())
    else {
        bail!("Usage: slackline <replay-file> (or set SLACKLINE_REPLAY)");
    };

    tokio::select! {
        result = replay::replay_file(&config, &replay_path) => result?,
        _ = shutdown_signal() => info!("Shutdown signal received - stopping replay"),
    }

    info!("Exiting...");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
