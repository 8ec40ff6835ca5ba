//! Channel membership reconciliation.
//!
//! Slack is the source of truth for who is in a channel. Each pass
//! computes the full desired member set and applies the difference to the
//! IRC channel.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::common::types::ChannelHandle;
use crate::irc::{IrcNetwork, IrcUser};
use crate::slack::workspace::Workspace;

/// Resolves Slack member IDs to IRC users.
pub trait MemberDirectory {
    /// `None` for unknown or deleted members.
    fn member_identity(&self, id: &str) -> Option<IrcUser>;
}

impl MemberDirectory for Workspace {
    fn member_identity(&self, id: &str) -> Option<IrcUser> {
        let user = self.user(id).filter(|u| !u.deleted)?;
        Some(IrcUser {
            nick: user.name.clone(),
            real_name: user.real_name().map(str::to_string),
        })
    }
}

impl MemberDirectory for HashMap<String, String> {
    fn member_identity(&self, id: &str) -> Option<IrcUser> {
        self.get(id).map(|nick| IrcUser {
            nick: nick.clone(),
            real_name: None,
        })
    }
}

/// Members added to and removed from a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Compute the changes that turn `current` into `desired`.
///
/// `own_nick` is never removed.
pub fn diff_members(current: &[String], desired: &[String], own_nick: &str) -> MembershipDiff {
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();
    let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let mut added = Vec::new();
    for nick in desired {
        if !current_set.contains(nick.as_str()) && !added.contains(nick) {
            added.push(nick.clone());
        }
    }

    let removed = current
        .iter()
        .filter(|nick| nick.as_str() != own_nick && !desired_set.contains(nick.as_str()))
        .cloned()
        .collect();

    MembershipDiff { added, removed }
}

/// Bring the members of an IRC channel in line with its Slack members.
///
/// Unresolvable members are skipped. The network's own nickname stays in the
/// channel regardless of the Slack member list.
pub fn reconcile<N, D>(
    network: &mut N,
    handle: ChannelHandle,
    source_member_ids: &[String],
    directory: &D,
) -> MembershipDiff
where
    N: IrcNetwork + ?Sized,
    D: MemberDirectory + ?Sized,
{
    let mut identities: Vec<IrcUser> = Vec::new();
    for id in source_member_ids {
        match directory.member_identity(id) {
            Some(user) if !identities.iter().any(|u| u.nick == user.nick) => identities.push(user),
            Some(_) => {}
            None => debug!(member = %id, "Skipping unresolved member"),
        }
    }

    let desired: Vec<String> = identities.iter().map(|u| u.nick.clone()).collect();
    let current = network.members(handle);
    let diff = diff_members(&current, &desired, network.nickname());

    for nick in &diff.added {
        if let Some(user) = identities.iter().find(|u| &u.nick == nick) {
            network.find_or_create_user(user);
        }
        network.add_member(handle, nick);
    }
    for nick in &diff.removed {
        network.remove_member(handle, nick);
    }

    if !diff.is_empty() {
        debug!(
            %handle,
            added = diff.added.len(),
            removed = diff.removed.len(),
            "Reconciled channel members"
        );
    }
    diff
}
