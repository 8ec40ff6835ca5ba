//! Slackline - Slack-IRC bridge engine
//!
//! Maps Slack channels and users onto an IRC-style network, renders Slack
//! messages for display, keeps channel membership in sync and acknowledges
//! read messages back to Slack.

pub mod bridge;
pub mod common;
pub mod config;
pub mod irc;
pub mod replay;
pub mod slack;
