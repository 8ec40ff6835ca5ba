//! Bridge translation engine.
//!
//! ## Module Structure
//!
//! - `registry`: Slack channel <-> IRC channel mappings
//! - `membership`: channel member reconciliation
//! - `read_state`: read tracking and mark-read policy
//! - `connection`: per-token state (`Connection`)
//! - `router`: event handling (`EventRouter`)
//! - `runtime`: the event loop (`BridgeRuntime`, `BridgeHandle`)

pub mod connection;
pub mod membership;
pub mod read_state;
pub mod registry;
pub mod router;
pub mod runtime;

// Re-export main types for convenience
pub use connection::Connection;
pub use membership::{reconcile, MemberDirectory, MembershipDiff};
pub use read_state::{ensure_channels_marked, ReadState};
pub use registry::{ChannelMapping, ChannelRegistry};
pub use router::EventRouter;
pub use runtime::{connect_backoff, BridgeHandle, BridgeRuntime};
