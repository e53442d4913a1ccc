//! Core types for interactive message components.
//!
//! This crate holds the pure, I/O-free part of the action subsystem:
//!
//! - Discord snowflake ids ([`MessageId`], [`RoleId`], ...)
//! - the action model ([`Action`], [`ActionKind`], [`ActionSet`])
//! - the component tree ([`ActionRow`], [`Component`])
//! - the identifier [`codec`] that packs a [`ComponentReference`] into a
//!   component `custom_id`
//!
//! # Example
//!
//! ```
//! use embedg_core::{ComponentFlags, ComponentReference, SetId, codec};
//!
//! let reference = ComponentReference::new(SetId::new("rules")?, ComponentFlags::ONE_SHOT);
//! let identifier = reference.identifier();
//! assert_eq!(codec::decode(&identifier)?, reference);
//! # Ok::<(), embedg_error::CodecError>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod action;
pub mod codec;
mod components;
mod ids;
mod reference;

pub use action::{Action, ActionEmbed, ActionKind, ActionSet, MAX_ACTIONS_PER_SET};
pub use components::{
    ACTION_ROW_TYPE, ActionRow, BUTTON_TYPE, Button, Component, LINK_BUTTON_STYLE,
    SELECT_MENU_TYPE, SelectMenu, SelectMenuOption, rewrite_identifier,
};
pub use ids::{ChannelId, GuildId, InteractionId, MessageId, RoleId, UserId};
pub use reference::{ComponentFlags, ComponentReference, MAX_SET_ID_LEN, SetId};
