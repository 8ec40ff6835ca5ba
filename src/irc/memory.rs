//! In-memory IRC network.
//!
//! Keeps channels, members and printed lines in process. Used by the replay
//! host (with console echo) and as the network in tests.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;

use crate::common::types::{ChannelHandle, LineKind};
use crate::irc::{IrcNetwork, IrcUser, PrintLine, PrintOutcome};

#[derive(Debug, Clone, Default)]
struct MemoryChannel {
    name: String,
    topic: Option<String>,
    active: bool,
    unread: bool,
    highlighted: bool,
    members: Vec<String>,
    lines: Vec<PrintLine>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryNetwork {
    nickname: String,
    next_handle: u64,
    channels: BTreeMap<ChannelHandle, MemoryChannel>,
    /// Lowercased channel name -> handle.
    by_name: HashMap<String, ChannelHandle>,
    users: HashMap<String, IrcUser>,
    console: Vec<String>,
    selected: Option<ChannelHandle>,
    echo: bool,
}

impl MemoryNetwork {
    pub fn new(nickname: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            next_handle: 1,
            ..Default::default()
        }
    }

    /// Also write every printed line and notice to stdout.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn topic(&self, handle: ChannelHandle) -> Option<&str> {
        self.channels.get(&handle)?.topic.as_deref()
    }

    pub fn is_active(&self, handle: ChannelHandle) -> bool {
        self.channels.get(&handle).is_some_and(|c| c.active)
    }

    pub fn is_highlighted(&self, handle: ChannelHandle) -> bool {
        self.channels.get(&handle).is_some_and(|c| c.highlighted)
    }

    pub fn lines(&self, handle: ChannelHandle) -> &[PrintLine] {
        self.channels
            .get(&handle)
            .map(|c| c.lines.as_slice())
            .unwrap_or(&[])
    }

    pub fn console(&self) -> &[String] {
        &self.console
    }

    pub fn selected(&self) -> Option<ChannelHandle> {
        self.selected
    }

    pub fn user(&self, nick: &str) -> Option<&IrcUser> {
        self.users.get(nick)
    }

    fn name_of(&self, handle: ChannelHandle) -> &str {
        self.channels
            .get(&handle)
            .map(|c| c.name.as_str())
            .unwrap_or("?")
    }

    fn highlight_rule(&self, text: &str) -> bool {
        !self.nickname.is_empty() && text.to_lowercase().contains(&self.nickname.to_lowercase())
    }
}

impl IrcNetwork for MemoryNetwork {
    fn nickname(&self) -> &str {
        &self.nickname
    }

    fn set_nickname(&mut self, nick: &str) {
        let old = std::mem::replace(&mut self.nickname, nick.to_string());
        for channel in self.channels.values_mut() {
            for member in channel.members.iter_mut() {
                if *member == old {
                    *member = nick.to_string();
                }
            }
        }
    }

    fn find_channel(&self, name: &str) -> Option<ChannelHandle> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    fn find_or_create_channel(&mut self, name: &str) -> ChannelHandle {
        if let Some(handle) = self.find_channel(name) {
            return handle;
        }
        let handle = ChannelHandle(self.next_handle);
        self.next_handle += 1;
        let mut members = Vec::new();
        if !self.nickname.is_empty() {
            members.push(self.nickname.clone());
        }
        self.channels.insert(
            handle,
            MemoryChannel {
                name: name.to_string(),
                members,
                ..Default::default()
            },
        );
        self.by_name.insert(name.to_lowercase(), handle);
        handle
    }

    fn channel_name(&self, handle: ChannelHandle) -> Option<&str> {
        self.channels.get(&handle).map(|c| c.name.as_str())
    }

    fn set_topic(&mut self, handle: ChannelHandle, topic: &str) {
        if let Some(channel) = self.channels.get_mut(&handle) {
            channel.topic = Some(topic.to_string());
        }
    }

    fn activate(&mut self, handle: ChannelHandle) {
        if let Some(channel) = self.channels.get_mut(&handle) {
            channel.active = true;
        }
    }

    fn print(&mut self, line: PrintLine) -> PrintOutcome {
        let outcome = PrintOutcome {
            highlighted: line.sender != self.nickname && self.highlight_rule(&line.text),
        };
        if self.echo {
            let stamp = line.time.format("%H:%M:%S");
            let name = self.name_of(line.handle);
            match line.kind {
                LineKind::Message => {
                    println!("[{}] {} <{}> {}", stamp, name, line.sender, line.text)
                }
                LineKind::Action => println!("[{}] {} * {} {}", stamp, name, line.sender, line.text),
                LineKind::Notice => println!("[{}] {} -!- {}", stamp, name, line.text),
            }
        }
        if let Some(channel) = self.channels.get_mut(&line.handle) {
            channel.lines.push(line);
        }
        outcome
    }

    fn set_unread(&mut self, handle: ChannelHandle, highlight: bool) {
        if self.selected == Some(handle) {
            return;
        }
        if let Some(channel) = self.channels.get_mut(&handle) {
            channel.unread = true;
            channel.highlighted |= highlight;
        }
    }

    fn is_unread(&self, handle: ChannelHandle) -> bool {
        self.channels.get(&handle).is_some_and(|c| c.unread)
    }

    fn members(&self, handle: ChannelHandle) -> Vec<String> {
        self.channels
            .get(&handle)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    fn find_or_create_user(&mut self, user: &IrcUser) {
        self.users.insert(user.nick.clone(), user.clone());
    }

    fn add_member(&mut self, handle: ChannelHandle, nick: &str) {
        if let Some(channel) = self.channels.get_mut(&handle) {
            if !channel.members.iter().any(|m| m == nick) {
                channel.members.push(nick.to_string());
            }
        }
    }

    fn remove_member(&mut self, handle: ChannelHandle, nick: &str) {
        if let Some(channel) = self.channels.get_mut(&handle) {
            channel.members.retain(|m| m != nick);
        }
    }

    fn notice(&mut self, handle: Option<ChannelHandle>, text: &str) {
        match handle {
            Some(handle) => {
                self.print(PrintLine {
                    handle,
                    sender: String::new(),
                    text: text.to_string(),
                    kind: LineKind::Notice,
                    time: Utc::now(),
                });
            }
            None => {
                if self.echo {
                    println!("-!- {}", text);
                }
                self.console.push(text.to_string());
            }
        }
    }

    fn select_channel(&mut self, handle: ChannelHandle) {
        if let Some(channel) = self.channels.get_mut(&handle) {
            channel.unread = false;
            channel.highlighted = false;
            self.selected = Some(handle);
        }
    }
}
