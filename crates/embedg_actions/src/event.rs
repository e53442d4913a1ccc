//! Inbound component interaction.

use crate::InteractionHandle;
use embedg_core::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::collections::BTreeSet;

/// Kind of component that produced an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ComponentKind {
    /// Button click
    #[default]
    Button,
    /// Select menu submission
    SelectMenu,
}

/// A user clicked a button or submitted a select menu.
#[derive(Debug, Clone, derive_builder::Builder, derive_getters::Getters)]
#[builder(setter(into))]
pub struct ComponentEvent {
    /// Handle used to answer the interaction
    interaction: InteractionHandle,
    /// Component kind
    #[builder(default)]
    kind: ComponentKind,
    /// Identifier of the component that was used
    custom_id: String,
    /// Selected option values, in selection order (select menus only)
    #[builder(default)]
    values: Vec<String>,
    /// Invoking user
    user_id: UserId,
    /// Roles the invoking member held when clicking
    #[builder(default)]
    member_roles: BTreeSet<RoleId>,
    /// Guild the message lives in; `None` in direct messages
    #[builder(default)]
    guild_id: Option<GuildId>,
    /// Channel the message lives in
    channel_id: ChannelId,
    /// Message carrying the component
    message_id: MessageId,
}

impl ComponentEvent {
    /// Start building an event.
    pub fn builder() -> ComponentEventBuilder {
        ComponentEventBuilder::default()
    }

    /// Whether the event came from a select menu.
    pub fn is_select(&self) -> bool {
        self.kind == ComponentKind::SelectMenu
    }
}
