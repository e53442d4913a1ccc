//! Test utilities for action runtime tests.
//!
//! This module provides a recording platform fake and fixture helpers.

#![allow(dead_code)]

pub mod mock_platform;

pub use mock_platform::{MockPlatform, PlatformCall};

use embedg_actions::{ActionSetStore, ComponentEvent, InteractionHandle, MemoryStore};
use embedg_core::{
    Action, ActionSet, ChannelId, GuildId, InteractionId, MessageId, RoleId, SetId, UserId,
};
use std::sync::Arc;

pub const GUILD: GuildId = GuildId::new(100);
pub const CHANNEL: ChannelId = ChannelId::new(200);
pub const MESSAGE: MessageId = MessageId::new(300);
pub const USER: UserId = UserId::new(400);

/// Fresh in-memory action set store.
pub fn memory_store() -> ActionSetStore {
    ActionSetStore::new(Arc::new(MemoryStore::new()))
}

/// Set id from a literal.
pub fn set_id(id: &str) -> SetId {
    SetId::new(id).expect("valid set id")
}

/// Save `actions` as set `id` of the test message.
pub async fn save_set(store: &ActionSetStore, id: &str, actions: Vec<Action>) -> SetId {
    let set_id = set_id(id);
    store
        .save(&ActionSet::new(MESSAGE, set_id.clone(), actions))
        .await
        .expect("save action set");
    set_id
}

/// Button click on the test message.
pub fn click(custom_id: &str) -> ComponentEvent {
    click_with_roles(custom_id, &[])
}

/// Button click by a member holding `roles`.
pub fn click_with_roles(custom_id: &str, roles: &[u64]) -> ComponentEvent {
    ComponentEvent::builder()
        .interaction(InteractionHandle::new(InteractionId::new(1), "token".to_string()))
        .custom_id(custom_id)
        .user_id(USER)
        .member_roles(roles.iter().copied().map(RoleId::new).collect::<std::collections::BTreeSet<_>>())
        .guild_id(GUILD)
        .channel_id(CHANNEL)
        .message_id(MESSAGE)
        .build()
        .expect("Failed to build test event")
}
