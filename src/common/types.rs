//! Shared types used across the application.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};

/// Opaque identifier for a channel on the IRC side.
///
/// Issued by the bridge-side network when the channel is created and stable
/// for the lifetime of that network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle(pub u64);

impl fmt::Display for ChannelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Kind of line printed into a bridge-side channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Regular chat message.
    Message,
    /// `/me` style action.
    Action,
    /// Bridge-generated notice (errors, connection state).
    Notice,
}

/// Parse a Slack timestamp token ("1525000000.000100") into a sortable key.
///
/// Returns (seconds, microseconds). The fractional part is read as decimal
/// digits, padded or truncated to six places.
pub fn ts_key(ts: &str) -> Option<(i64, u32)> {
    let (secs, frac) = match ts.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (ts, ""),
    };
    let secs: i64 = secs.parse().ok()?;
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut micros: u32 = 0;
    for digit in frac.chars().chain(std::iter::repeat('0')).take(6) {
        micros = micros * 10 + digit.to_digit(10).unwrap_or(0);
    }
    Some((secs, micros))
}

/// Compare two Slack timestamps numerically, falling back to string order
/// when either side is not a decimal timestamp.
pub fn compare_ts(a: &str, b: &str) -> Ordering {
    match (ts_key(a), ts_key(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Convert a Slack timestamp (decimal seconds since the epoch) to a time.
pub fn ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, micros) = ts_key(ts)?;
    DateTime::from_timestamp(secs, micros * 1_000)
}

/// Shorten a token for log output.
pub fn redact_token(token: &str) -> String {
    let visible: String = token.chars().take(9).collect();
    if visible.len() < token.len() {
        format!("{}…", visible)
    } else {
        visible
    }
}
