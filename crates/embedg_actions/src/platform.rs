//! Messaging platform abstraction.
//!
//! The dispatcher, unparser and exporter only talk to Discord through the
//! [`Platform`] trait so that tests can substitute a recording fake.

use async_trait::async_trait;
use embedg_core::{ActionEmbed, ActionRow, ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};
use embedg_error::PlatformResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum length of a reply's text content.
pub const MAX_CONTENT_LEN: usize = 2000;

/// Maximum number of embeds in one reply.
pub const MAX_EMBEDS: usize = 10;

/// Credentials needed to answer an interaction.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_new::new)]
pub struct InteractionHandle {
    /// Interaction id
    id: InteractionId,
    /// Interaction token, valid for 15 minutes
    token: String,
}

/// Message sent in answer to an interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct Reply {
    /// Text content
    #[setters(into, strip_option)]
    content: Option<String>,
    /// Embeds
    embeds: Vec<ActionEmbed>,
    /// Only visible to the invoking user
    ephemeral: bool,
}

impl Reply {
    /// Text reply visible only to the invoking user.
    pub fn ephemeral_text(content: impl Into<String>) -> Self {
        Self::default().with_content(content).with_ephemeral(true)
    }

    /// Text reply visible to the channel.
    pub fn public_text(content: impl Into<String>) -> Self {
        Self::default().with_content(content)
    }

    /// Embed reply.
    pub fn embed(embed: ActionEmbed, ephemeral: bool) -> Self {
        Self::default()
            .with_embeds(vec![embed])
            .with_ephemeral(ephemeral)
    }

    /// Whether there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().is_none_or(str::is_empty) && self.embeds.is_empty()
    }

    /// Clamp the reply to Discord's message limits.
    pub fn truncated(mut self) -> Self {
        if let Some(content) = self.content.as_mut() {
            truncate_chars(content, MAX_CONTENT_LEN);
        }
        self.embeds.truncate(MAX_EMBEDS);
        self
    }
}

fn truncate_chars(text: &mut String, max: usize) {
    if let Some((cut, _)) = text.char_indices().nth(max) {
        text.truncate(cut);
    }
}

/// Role positions of a guild, as seen by the bot.
///
/// Higher positions outrank lower ones. The `@everyone` role sits at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_getters::Getters, derive_new::new)]
pub struct RoleHierarchy {
    /// Position of every role in the guild
    positions: HashMap<RoleId, u16>,
    /// Position of the bot's highest role
    bot_top: u16,
}

impl RoleHierarchy {
    /// Position of `role`, if it exists.
    pub fn position(&self, role: RoleId) -> Option<u16> {
        self.positions.get(&role).copied()
    }

    /// Highest position among `roles`; unknown roles are ignored.
    pub fn highest<'a>(&self, roles: impl IntoIterator<Item = &'a RoleId>) -> u16 {
        roles
            .into_iter()
            .filter_map(|role| self.position(*role))
            .max()
            .unwrap_or(0)
    }

    /// Whether the bot may manage `role`.
    pub fn bot_outranks(&self, position: u16) -> bool {
        position < self.bot_top
    }
}

/// A message as fetched from the platform.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters, derive_new::new,
)]
pub struct PlatformMessage {
    /// Message id
    id: MessageId,
    /// Channel the message lives in
    channel_id: ChannelId,
    /// Author (or webhook) name
    username: String,
    /// Author avatar
    avatar_url: Option<String>,
    /// Text content
    content: String,
    /// Raw embed objects
    embeds: Vec<serde_json::Value>,
    /// Component rows
    components: Vec<ActionRow>,
}

/// Operations the action subsystem needs from Discord.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Add a role to a guild member.
    ///
    /// # Errors
    ///
    /// Returns error if the role cannot be added.
    async fn add_member_role(&self, guild: GuildId, user: UserId, role: RoleId) -> PlatformResult<()>;

    /// Remove a role from a guild member.
    ///
    /// # Errors
    ///
    /// Returns error if the role cannot be removed.
    async fn remove_member_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> PlatformResult<()>;

    /// Role positions of a guild and the bot's highest position.
    ///
    /// # Errors
    ///
    /// Returns error if the guild roles cannot be listed.
    async fn role_hierarchy(&self, guild: GuildId) -> PlatformResult<RoleHierarchy>;

    /// Fetch a message with its components.
    ///
    /// # Errors
    ///
    /// Returns error if the message does not exist or is not visible.
    async fn fetch_message(&self, channel: ChannelId, message: MessageId) -> PlatformResult<PlatformMessage>;

    /// Replace the component rows of a message.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be edited.
    async fn edit_message_components(
        &self,
        channel: ChannelId,
        message: MessageId,
        components: &[ActionRow],
    ) -> PlatformResult<()>;

    /// Send the initial interaction response.
    ///
    /// # Errors
    ///
    /// Returns error if the interaction has expired or the request fails.
    async fn respond(&self, interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()>;

    /// Send a follow-up message after the initial response.
    ///
    /// # Errors
    ///
    /// Returns error if the interaction has expired or the request fails.
    async fn follow_up(&self, interaction: &InteractionHandle, reply: &Reply) -> PlatformResult<()>;

    /// Get platform name.
    fn platform_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncates_on_char_boundary() {
        let reply = Reply::public_text("é".repeat(MAX_CONTENT_LEN + 5)).truncated();
        assert_eq!(reply.content().as_deref().map(|c| c.chars().count()), Some(MAX_CONTENT_LEN));
    }

    #[test]
    fn test_empty_reply() {
        assert!(Reply::default().is_empty());
        assert!(Reply::ephemeral_text("").is_empty());
        assert!(!Reply::embed(ActionEmbed::new(), false).is_empty());
    }

    #[test]
    fn test_hierarchy() {
        let hierarchy = RoleHierarchy::new(
            HashMap::from([(RoleId::new(1), 1), (RoleId::new(2), 5), (RoleId::new(3), 9)]),
            5,
        );
        assert_eq!(hierarchy.highest(&[RoleId::new(1), RoleId::new(3)]), 9);
        assert_eq!(hierarchy.highest(&[RoleId::new(42)]), 0);
        assert!(hierarchy.bot_outranks(1));
        assert!(!hierarchy.bot_outranks(5));
    }
}
