use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ─── Identities ───────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Enough identity to edit, delete, or react to a message we sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub id: MessageId,
    pub channel: ChannelId,
}

// ─── Inbound events ───────────────────────────────────────────

/// An inbound chat message as delivered by the transport.
#[derive(Clone, Debug)]
pub struct MessageRef {
    pub id: MessageId,
    pub channel: ChannelId,
    pub author: UserId,
    pub author_is_bot: bool,
    pub content: String,
}

/// A reaction added to some message. Re-enters the approval workflow
/// directly, bypassing the dispatcher.
#[derive(Clone, Debug)]
pub struct ReactionEvent {
    pub message: MessageId,
    pub channel: ChannelId,
    pub emoji: String,
    pub actor: UserId,
    pub actor_is_bot: bool,
}

// ─── Outbound content ─────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-agnostic embed description. The transport owns the wire format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedSpec {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
}

impl EmbedSpec {
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundContent {
    Text(String),
    Embed(EmbedSpec),
}

impl From<&str> for OutboundContent {
    fn from(text: &str) -> Self {
        OutboundContent::Text(text.to_string())
    }
}

impl From<String> for OutboundContent {
    fn from(text: String) -> Self {
        OutboundContent::Text(text)
    }
}

impl From<EmbedSpec> for OutboundContent {
    fn from(embed: EmbedSpec) -> Self {
        OutboundContent::Embed(embed)
    }
}

// ─── Transport trait ──────────────────────────────────────────

/// Narrow seam to the chat platform. The core suspends only on these calls;
/// everything else in dispatch is synchronous.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        channel: ChannelId,
        content: OutboundContent,
    ) -> Result<MessageHandle>;

    async fn edit_message(&self, target: MessageHandle, content: OutboundContent) -> Result<()>;

    async fn delete_message(&self, target: MessageHandle) -> Result<()>;

    /// Add a reaction affordance (approve/reject button) to a message.
    async fn add_reaction(&self, target: MessageHandle, emoji: &str) -> Result<()>;

    /// Send to the user's private channel.
    async fn send_private(&self, user: UserId, content: OutboundContent) -> Result<MessageHandle>;
}
