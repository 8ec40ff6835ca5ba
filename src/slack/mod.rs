//! Slack side of the bridge.
//!
//! Decoded events, the workspace directory, the API seam used for outbound
//! calls and the message renderer.

pub mod api;
pub mod events;
pub mod resolver;
pub mod workspace;

pub use api::{MarkReadKind, SlackApi};
pub use events::{MessageEvent, SlackEvent};
pub use resolver::{MessageResolver, NameLookup};
pub use workspace::{ChannelInfo, ChannelKind, Workspace, WorkspaceSnapshot};
