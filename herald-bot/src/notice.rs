use anyhow::Result;
use herald_core::transport::{ChannelId, ChatTransport, EmbedSpec, MessageHandle};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Embed palette.
pub mod colors {
    pub const PRIMARY: u32 = 0x7289DA;
    pub const SUCCESS: u32 = 0x2ECC71;
    pub const ERROR: u32 = 0xE74C3C;
    pub const WARN: u32 = 0xF1C40F;
    pub const MERGED_PULL_REQUEST: u32 = 0x9B59B6;
}

/// How long transient notices stay up before self-deleting.
pub const TRANSIENT_DELAY: Duration = Duration::from_secs(5);

pub async fn error(
    transport: &dyn ChatTransport,
    channel: ChannelId,
    description: &str,
) -> Result<MessageHandle> {
    let embed = EmbedSpec {
        description: Some(description.to_string()),
        color: Some(colors::ERROR),
        ..EmbedSpec::default()
    };
    transport.send_message(channel, embed.into()).await
}

pub async fn success(
    transport: &dyn ChatTransport,
    channel: ChannelId,
    description: &str,
) -> Result<MessageHandle> {
    let embed = EmbedSpec {
        description: Some(description.to_string()),
        color: Some(colors::SUCCESS),
        ..EmbedSpec::default()
    };
    transport.send_message(channel, embed.into()).await
}

/// Truncate to at most `max` characters (embeds have hard length caps).
pub fn flatten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect()
}

/// Issue bodies arrive full of template boilerplate in HTML comments;
/// strip those, and substitute `default` for an empty or missing body.
pub fn clean_body(body: Option<&str>, default: &str) -> String {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    let body = match body {
        Some(body) if !body.is_empty() => body,
        _ => return default.to_string(),
    };
    let comment = COMMENT.get_or_init(|| Regex::new(r"<!--.*?-->").unwrap());
    comment.replace_all(body, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_truncates_on_char_boundaries() {
        assert_eq!(flatten("abcdef", 4), "abcd");
        assert_eq!(flatten("abc", 4), "abc");
        assert_eq!(flatten("ééééé", 3), "ééé");
    }

    #[test]
    fn clean_body_strips_comments_and_defaults() {
        assert_eq!(clean_body(None, "No Description"), "No Description");
        assert_eq!(clean_body(Some(""), "No Description"), "No Description");
        assert_eq!(
            clean_body(Some("before <!-- template hint --> after"), "-"),
            "before  after"
        );
    }
}
