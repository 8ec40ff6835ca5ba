//! Common utilities and types shared across the application.

pub mod error;
pub mod messages;
pub mod types;

// Re-export message types from messages module
pub use messages::{
    BridgeEvent, Completion, ConnectRequest, InputDisposition, OutboundMessage, SlackRequest,
};

pub use types::{ChannelHandle, LineKind};
