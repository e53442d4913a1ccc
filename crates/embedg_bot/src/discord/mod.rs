//! Serenity integration.

mod handler;
mod platform;

pub use handler::{InteractionHandler, component_event};
pub use platform::SerenityPlatform;
