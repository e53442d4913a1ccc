//! Discord bot hosting the component action runtime.
//!
//! The REST payload builders in this crate are always available. The
//! serenity-backed [`Platform`](embedg_actions::Platform) and gateway handler
//! require the `discord` feature.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod rest;

#[cfg(feature = "discord")]
mod discord;

pub use rest::{
    CHANNEL_MESSAGE_WITH_SOURCE, EPHEMERAL_FLAG, classify, components_payload, embed_payload,
    interaction_response, message_payload, rows_from_value,
};

#[cfg(feature = "discord")]
pub use discord::{InteractionHandler, SerenityPlatform, component_event};
