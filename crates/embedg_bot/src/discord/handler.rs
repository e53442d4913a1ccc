//! Gateway event handler feeding component interactions to the dispatcher.

use async_trait::async_trait;
use embedg_actions::{
    ComponentEvent, ComponentEventBuilderError, ComponentKind, Dispatcher, InteractionHandle,
};
use embedg_core::{ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};
use serenity::all::{
    ComponentInteraction, ComponentInteractionDataKind, Context, EventHandler, Interaction, Ready,
};
use serenity::model::id as discord;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Serenity event handler running the component dispatcher.
#[derive(Debug, Clone, derive_new::new)]
pub struct InteractionHandler {
    dispatcher: Arc<Dispatcher>,
}

#[async_trait]
impl EventHandler for InteractionHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot = %ready.user.name,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        match component_event(&component) {
            Ok(event) => self.dispatcher.handle(&event).await,
            Err(e) => warn!(error = %e, "Dropping component interaction"),
        }
    }
}

/// Convert a serenity component interaction into a [`ComponentEvent`].
///
/// # Errors
///
/// Returns the builder error if a required field is missing.
pub fn component_event(
    interaction: &ComponentInteraction,
) -> Result<ComponentEvent, ComponentEventBuilderError> {
    let (kind, values) = match &interaction.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => {
            (ComponentKind::SelectMenu, values.clone())
        }
        _ => (ComponentKind::Button, Vec::new()),
    };
    let roles = interaction
        .member
        .as_ref()
        .map(|member| member_roles(&member.roles))
        .unwrap_or_default();

    ComponentEvent::builder()
        .interaction(InteractionHandle::new(
            InteractionId::new(interaction.id.get()),
            interaction.token.clone(),
        ))
        .kind(kind)
        .custom_id(interaction.data.custom_id.clone())
        .values(values)
        .user_id(UserId::new(interaction.user.id.get()))
        .member_roles(roles)
        .guild_id(interaction.guild_id.map(|guild| GuildId::new(guild.get())))
        .channel_id(ChannelId::new(interaction.channel_id.get()))
        .message_id(MessageId::new(interaction.message.id.get()))
        .build()
}

fn member_roles(roles: &[discord::RoleId]) -> BTreeSet<RoleId> {
    roles.iter().map(|role| RoleId::new(role.get())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_roles_are_deduplicated_and_ordered() {
        let roles = [discord::RoleId::new(9), discord::RoleId::new(3), discord::RoleId::new(9)];
        assert_eq!(
            member_roles(&roles),
            BTreeSet::from([RoleId::new(3), RoleId::new(9)])
        );
    }
}
