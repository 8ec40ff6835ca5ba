//! Slack message rendering.
//!
//! Turns a raw Slack message into the single line shown on the IRC side:
//! edit marker, mention and emoji resolution, then attachments and files.

use fancy_regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::slack::events::MessageEvent;

/// Default prefix for edited messages.
pub const EDITED_MARKER: &str = "(edited) ";

/// Markers that notify everyone in a channel.
const BROADCAST_MARKERS: [&str; 3] = ["<!here", "<!channel", "<!everyone"];

/// Resolves user and bot IDs to display names.
pub trait NameLookup {
    fn mention_name(&self, id: &str) -> Option<&str>;
}

impl NameLookup for HashMap<String, String> {
    fn mention_name(&self, id: &str) -> Option<&str> {
        self.get(id).map(String::as_str)
    }
}

/// Message resolver for Slack -> IRC rendering.
#[derive(Debug, Clone)]
pub struct MessageResolver {
    /// Mentions (`<@U123>`, `<@U123|label>`) and emoji shortcodes (`:smile:`).
    token_pattern: Regex,
    /// Prefix for edited messages.
    edited_marker: String,
}

impl Default for MessageResolver {
    fn default() -> Self {
        Self::new(EDITED_MARKER)
    }
}

impl MessageResolver {
    pub fn new(edited_marker: impl Into<String>) -> Self {
        Self {
            token_pattern: Regex::new(
                r"<@(?P<user>[UWB][A-Z0-9]+)(?:\|[^>]*)?>|:(?P<emoji>[a-z0-9_+\-]+):",
            )
            .unwrap(),
            edited_marker: edited_marker.into(),
        }
    }

    /// Render a message for display.
    pub fn render<L: NameLookup + ?Sized>(&self, message: &MessageEvent, names: &L) -> String {
        let mut rendered = self.resolve_tokens(message.text.as_deref().unwrap_or(""), names);

        for attachment in &message.attachments {
            append_part(&mut rendered, attachment.fallback.as_deref());
            append_part(&mut rendered, attachment.text.as_deref());
            append_part(&mut rendered, attachment.image_url.as_deref());
        }

        for file in &message.files {
            append_part(&mut rendered, file.title.as_deref());
            if let Some(link) = file.permalink.as_deref().filter(|l| !l.is_empty()) {
                append_part(&mut rendered, Some(&format!("File link: {}", link)));
            }
        }

        if message.is_edited() {
            if rendered.is_empty() {
                rendered.push_str(self.edited_marker.trim_end());
            } else {
                rendered.insert_str(0, &self.edited_marker);
            }
        }
        rendered
    }

    /// Replace mentions and emoji shortcodes in place.
    ///
    /// Tokens without a known replacement are left as they are. Match ranges
    /// refer to the original text, so each splice shifts the following ranges
    /// by the byte length difference accumulated so far.
    pub fn resolve_tokens<L: NameLookup + ?Sized>(&self, text: &str, names: &L) -> String {
        let mut result = text.to_string();
        let mut offset: isize = 0;

        for caps in self.token_pattern.captures_iter(text) {
            let caps = match caps {
                Ok(caps) => caps,
                Err(e) => {
                    warn!("Token scan aborted: {}", e);
                    break;
                }
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let replacement = if let Some(user) = caps.name("user") {
                names.mention_name(user.as_str())
            } else if let Some(code) = caps.name("emoji") {
                emojis::get_by_shortcode(code.as_str()).map(|e| e.as_str())
            } else {
                None
            };
            let Some(replacement) = replacement else {
                continue;
            };

            let start = (whole.start() as isize + offset) as usize;
            let end = (whole.end() as isize + offset) as usize;
            debug_assert!(result.is_char_boundary(start) && result.is_char_boundary(end));
            result.replace_range(start..end, replacement);
            offset += replacement.len() as isize - whole.as_str().len() as isize;
        }

        result
    }
}

/// Whether the raw text notifies the whole channel.
pub fn is_broadcast(text: &str) -> bool {
    BROADCAST_MARKERS.iter().any(|marker| text.contains(marker))
}

fn append_part(rendered: &mut String, part: Option<&str>) {
    let Some(part) = part.filter(|p| !p.is_empty()) else {
        return;
    };
    if !rendered.is_empty() {
        rendered.push(' ');
    }
    rendered.push_str(part);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slack::events::{Attachment, Edited, FileInfo};

    fn names() -> HashMap<String, String> {
        HashMap::from([
            ("U1".to_string(), "alice".to_string()),
            ("U2".to_string(), "bob".to_string()),
            ("B1".to_string(), "deploybot-with-a-long-name".to_string()),
        ])
    }

    fn message(text: &str) -> MessageEvent {
        MessageEvent {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_emoji_table() {
        assert_eq!(emojis::get_by_shortcode("smile").unwrap().as_str(), "😄");
        assert!(emojis::get_by_shortcode("not_an_emoji_at_all").is_none());
    }

    #[test]
    fn test_mentions_and_emoji_with_offsets() {
        let resolver = MessageResolver::default();
        assert_eq!(
            resolver.resolve_tokens("hi <@U1> :smile: <@U2>", &names()),
            "hi alice 😄 bob"
        );
    }

    #[test]
    fn test_astral_glyphs_shift_later_matches() {
        let resolver = MessageResolver::default();
        // Each glyph is four bytes against a seven-byte token
        assert_eq!(
            resolver.resolve_tokens(":smile::smile::smile: <@U1>!", &names()),
            "😄😄😄 alice!"
        );
        // Non-ASCII text ahead of the first token
        assert_eq!(
            resolver.resolve_tokens("🎉 <@U2> :smile:", &names()),
            "🎉 bob 😄"
        );
    }

    #[test]
    fn test_replacement_longer_than_token() {
        let resolver = MessageResolver::default();
        assert_eq!(
            resolver.resolve_tokens("<@B1> ran :smile: for <@U1>", &names()),
            "deploybot-with-a-long-name ran 😄 for alice"
        );
    }

    #[test]
    fn test_mention_with_label() {
        let resolver = MessageResolver::default();
        assert_eq!(
            resolver.resolve_tokens("ping <@U1|alice.old>", &names()),
            "ping alice"
        );
    }

    #[test]
    fn test_unknown_tokens_left_unchanged() {
        let resolver = MessageResolver::default();
        assert_eq!(
            resolver.resolve_tokens("<@U9> :nope_nothing: <@U1> at 10:30:45", &names()),
            "<@U9> :nope_nothing: alice at 10:30:45"
        );
    }

    #[test]
    fn test_edited_prefix() {
        let resolver = MessageResolver::default();
        let mut msg = message("fixed <@U1>");
        msg.edited = Some(Edited::default());
        assert_eq!(resolver.render(&msg, &names()), "(edited) fixed alice");

        let resolver = MessageResolver::new("[e] ");
        assert_eq!(resolver.render(&msg, &names()), "[e] fixed alice");
    }

    #[test]
    fn test_edited_without_text_has_single_separator() {
        let resolver = MessageResolver::default();
        let mut msg = message("");
        msg.edited = Some(Edited::default());
        msg.attachments.push(Attachment {
            fallback: Some("F".to_string()),
            text: None,
            image_url: None,
        });
        assert_eq!(resolver.render(&msg, &names()), "(edited) F");

        msg.attachments.clear();
        assert_eq!(resolver.render(&msg, &names()), "(edited)");
    }

    #[test]
    fn test_attachment_and_file_ordering() {
        let resolver = MessageResolver::default();
        let mut msg = message("hi");
        msg.attachments.push(Attachment {
            fallback: Some("F".to_string()),
            text: None,
            image_url: Some("http://x".to_string()),
        });
        msg.files.push(FileInfo {
            title: Some("T".to_string()),
            permalink: Some("http://y".to_string()),
        });
        assert_eq!(
            resolver.render(&msg, &names()),
            "hi F http://x T File link: http://y"
        );
    }

    #[test]
    fn test_empty_parts_skipped() {
        let resolver = MessageResolver::default();
        let mut msg = message("");
        msg.attachments.push(Attachment {
            fallback: Some(String::new()),
            text: Some("body".to_string()),
            image_url: None,
        });
        msg.files.push(FileInfo {
            title: None,
            permalink: Some("http://y".to_string()),
        });
        assert_eq!(resolver.render(&msg, &names()), "body File link: http://y");
    }

    #[test]
    fn test_broadcast_markers() {
        assert!(is_broadcast("<!here> deploy done"));
        assert!(is_broadcast("hey <!channel|channel>"));
        assert!(is_broadcast("<!everyone>"));
        assert!(!is_broadcast("here and there"));
    }
}
