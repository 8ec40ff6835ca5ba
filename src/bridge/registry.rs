//! Slack channel <-> IRC channel mappings.
//!
//! One registry per connection. Mappings are created lazily and never
//! removed while the connection lives; each Slack channel ID maps to exactly
//! one IRC channel handle and vice versa.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::bridge::read_state::ReadState;
use crate::common::types::ChannelHandle;
use crate::irc::IrcNetwork;
use crate::slack::api::MarkReadKind;

/// A Slack channel bridged to an IRC channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapping {
    pub source_channel_id: String,
    pub handle: ChannelHandle,
    pub mark_read: MarkReadKind,
    pub read: ReadState,
}

/// Bidirectional channel mapping table.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    by_source: BTreeMap<String, ChannelMapping>,
    by_handle: HashMap<ChannelHandle, String>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the IRC channel for a Slack channel, creating it if needed.
    ///
    /// An unmapped Slack channel first adopts an existing IRC channel named
    /// `#name`, so reconnects do not create duplicates. If that channel
    /// already belongs to another Slack channel, `#name-<id>` is used
    /// instead. The topic is rewritten to the channel's deep link on every
    /// call.
    pub fn resolve_or_create<N: IrcNetwork + ?Sized>(
        &mut self,
        network: &mut N,
        source_channel_id: &str,
        source_channel_name: &str,
        team_id: Option<&str>,
        kind: MarkReadKind,
    ) -> ChannelHandle {
        let handle = match self.by_source.get(source_channel_id) {
            Some(mapping) => mapping.handle,
            None => {
                let handle = self.unclaimed_channel(network, source_channel_id, source_channel_name);
                network.activate(handle);
                self.by_handle
                    .insert(handle, source_channel_id.to_string());
                self.by_source.insert(
                    source_channel_id.to_string(),
                    ChannelMapping {
                        source_channel_id: source_channel_id.to_string(),
                        handle,
                        mark_read: kind,
                        read: ReadState::default(),
                    },
                );
                info!(
                    channel = source_channel_id,
                    %handle,
                    "Mapped Slack channel to {}",
                    network.channel_name(handle).unwrap_or("?")
                );
                handle
            }
        };

        network.set_topic(handle, &deep_link(team_id, source_channel_id));
        handle
    }

    fn unclaimed_channel<N: IrcNetwork + ?Sized>(
        &self,
        network: &mut N,
        source_channel_id: &str,
        source_channel_name: &str,
    ) -> ChannelHandle {
        let primary = format!("#{}", source_channel_name);
        match network.find_channel(&primary) {
            None => return network.find_or_create_channel(&primary),
            Some(existing) if !self.by_handle.contains_key(&existing) => return existing,
            Some(_) => {}
        }

        let base = format!(
            "#{}-{}",
            source_channel_name,
            source_channel_id.to_lowercase()
        );
        debug!(
            channel = source_channel_id,
            "{} is taken, using {}", primary, base
        );
        let mut candidate = base.clone();
        let mut suffix = 2;
        loop {
            match network.find_channel(&candidate) {
                None => return network.find_or_create_channel(&candidate),
                Some(existing) if !self.by_handle.contains_key(&existing) => return existing,
                Some(_) => {
                    candidate = format!("{}-{}", base, suffix);
                    suffix += 1;
                }
            }
        }
    }

    pub fn get(&self, source_channel_id: &str) -> Option<&ChannelMapping> {
        self.by_source.get(source_channel_id)
    }

    pub fn get_mut(&mut self, source_channel_id: &str) -> Option<&mut ChannelMapping> {
        self.by_source.get_mut(source_channel_id)
    }

    /// Reverse lookup from an IRC channel.
    pub fn channel_for(&self, handle: ChannelHandle) -> Option<&ChannelMapping> {
        self.by_handle
            .get(&handle)
            .and_then(|id| self.by_source.get(id))
    }

    /// Mappings in Slack channel ID order.
    pub fn mappings(&self) -> impl Iterator<Item = &ChannelMapping> {
        self.by_source.values()
    }

    pub fn mappings_mut(&mut self) -> impl Iterator<Item = &mut ChannelMapping> {
        self.by_source.values_mut()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.by_source.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}

/// Link that opens a channel in the Slack client.
pub fn deep_link(team_id: Option<&str>, channel_id: &str) -> String {
    match team_id {
        Some(team) => format!("slack://channel?team={}&id={}", team, channel_id),
        None => format!("slack://channel?id={}", channel_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::MemoryNetwork;

    #[test]
    fn test_resolve_is_idempotent() {
        let mut net = MemoryNetwork::new("me");
        let mut registry = ChannelRegistry::new();

        let a = registry.resolve_or_create(&mut net, "C1", "general", Some("T1"), MarkReadKind::Channel);
        let b = registry.resolve_or_create(&mut net, "C1", "general", Some("T1"), MarkReadKind::Channel);

        assert_eq!(a, b);
        assert_eq!(net.channel_count(), 1);
        assert_eq!(registry.len(), 1);
        assert!(net.is_active(a));
        assert_eq!(net.topic(a), Some("slack://channel?team=T1&id=C1"));
    }

    #[test]
    fn test_adopts_existing_channel_by_name() {
        let mut net = MemoryNetwork::new("me");
        let existing = net.find_or_create_channel("#general");
        let mut registry = ChannelRegistry::new();

        let handle = registry.resolve_or_create(&mut net, "C1", "general", None, MarkReadKind::Channel);

        assert_eq!(handle, existing);
        assert_eq!(net.channel_count(), 1);
        assert_eq!(net.topic(handle), Some("slack://channel?id=C1"));
    }

    #[test]
    fn test_mapping_survives_registry_rebuild_through_name() {
        let mut net = MemoryNetwork::new("me");
        let first = ChannelRegistry::new().resolve_or_create(
            &mut net,
            "C1",
            "general",
            None,
            MarkReadKind::Channel,
        );
        let second = ChannelRegistry::new().resolve_or_create(
            &mut net,
            "C1",
            "general",
            None,
            MarkReadKind::Channel,
        );
        assert_eq!(first, second);
        assert_eq!(net.channel_count(), 1);
    }

    #[test]
    fn test_name_collision_keeps_bijection() {
        let mut net = MemoryNetwork::new("me");
        let mut registry = ChannelRegistry::new();

        let a = registry.resolve_or_create(&mut net, "C1", "general", None, MarkReadKind::Channel);
        let b = registry.resolve_or_create(&mut net, "C2", "general", None, MarkReadKind::Channel);

        assert_ne!(a, b);
        assert_eq!(net.channel_name(b), Some("#general-c2"));
        assert_eq!(registry.channel_for(a).unwrap().source_channel_id, "C1");
        assert_eq!(registry.channel_for(b).unwrap().source_channel_id, "C2");
    }

    #[test]
    fn test_bijection_over_many_channels() {
        let mut net = MemoryNetwork::new("me");
        let mut registry = ChannelRegistry::new();
        let channels = [
            ("C1", "general"),
            ("C2", "random"),
            ("C3", "general"),
            ("D1", "alice"),
            ("C4", "general-c3"),
        ];

        for (id, name) in channels {
            registry.resolve_or_create(&mut net, id, name, None, MarkReadKind::Channel);
        }
        for (id, name) in channels {
            registry.resolve_or_create(&mut net, id, name, None, MarkReadKind::Channel);
        }

        assert_eq!(registry.len(), channels.len());
        let mut handles: Vec<ChannelHandle> = registry.mappings().map(|m| m.handle).collect();
        handles.sort();
        handles.dedup();
        assert_eq!(handles.len(), channels.len());
        for mapping in registry.mappings() {
            let back = registry.channel_for(mapping.handle).unwrap();
            assert_eq!(back.source_channel_id, mapping.source_channel_id);
        }
    }

    #[test]
    fn test_topic_refreshed_not_appended() {
        let mut net = MemoryNetwork::new("me");
        let mut registry = ChannelRegistry::new();

        let handle = registry.resolve_or_create(&mut net, "C1", "general", None, MarkReadKind::Channel);
        registry.resolve_or_create(&mut net, "C1", "general", Some("T9"), MarkReadKind::Channel);

        assert_eq!(net.topic(handle), Some("slack://channel?team=T9&id=C1"));
    }

    #[test]
    fn test_unknown_handle() {
        let registry = ChannelRegistry::new();
        assert!(registry.channel_for(ChannelHandle(42)).is_none());
        assert!(registry.is_empty());
    }
}
