//! Action model.
//!
//! An [`Action`] is one effect attached to a component. Actions are grouped
//! into an [`ActionSet`] bound to exactly one button or select option.

use crate::ids::{MessageId, RoleId};
use crate::reference::SetId;
use serde::{Deserialize, Serialize};

/// Maximum number of actions a single set may hold.
pub const MAX_ACTIONS_PER_SET: usize = 10;

/// What an action does when its component is used.
///
/// Adding a variant forces every `match` over action kinds to handle it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    /// Add a role to the invoking member.
    GiveRole {
        /// Role to add
        role_id: RoleId,
    },
    /// Remove a role from the invoking member.
    RemoveRole {
        /// Role to remove
        role_id: RoleId,
    },
    /// Remove the role if the member holds it, add it otherwise.
    ToggleRole {
        /// Role to toggle
        role_id: RoleId,
    },
    /// Respond with a text message.
    SendText {
        /// Message content
        text: String,
    },
    /// Respond with an embed.
    SendEmbed {
        /// Embed to send
        embed: ActionEmbed,
    },
    /// Link-style action. Links are opened by the client, nothing runs server-side.
    OpenUrl {
        /// Target URL
        url: String,
    },
}

impl ActionKind {
    /// Stable snake_case label, used in logs and reports.
    pub fn label(&self) -> &'static str {
        self.into()
    }

    /// Role targeted by role-changing kinds.
    pub fn role_id(&self) -> Option<RoleId> {
        match self {
            Self::GiveRole { role_id } | Self::RemoveRole { role_id } | Self::ToggleRole { role_id } => {
                Some(*role_id)
            }
            Self::SendText { .. } | Self::SendEmbed { .. } | Self::OpenUrl { .. } => None,
        }
    }
}

/// Embed payload of a [`ActionKind::SendEmbed`] action.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_new::new,
)]
pub struct ActionEmbed {
    /// Embed title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    title: Option<String>,
    /// Embed body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    description: Option<String>,
    /// Title link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    url: Option<String>,
    /// Sidebar color as 0xRRGGBB
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    color: Option<u32>,
    /// Footer text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    footer: Option<String>,
    /// Large image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[new(default)]
    image_url: Option<String>,
}

impl ActionEmbed {
    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the color.
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }
}

/// One executable effect.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_new::new,
)]
pub struct Action {
    /// What the action does
    #[serde(flatten)]
    kind: ActionKind,
    /// Whether the response is visible to the whole channel
    #[serde(default)]
    #[getter(skip)]
    public: bool,
}

impl Action {
    /// Add `role_id` to the member.
    pub fn give_role(role_id: RoleId) -> Self {
        Self::new(ActionKind::GiveRole { role_id }, false)
    }

    /// Remove `role_id` from the member.
    pub fn remove_role(role_id: RoleId) -> Self {
        Self::new(ActionKind::RemoveRole { role_id }, false)
    }

    /// Toggle `role_id` on the member.
    pub fn toggle_role(role_id: RoleId) -> Self {
        Self::new(ActionKind::ToggleRole { role_id }, false)
    }

    /// Reply with `text`, visible only to the member.
    pub fn send_text(text: impl Into<String>) -> Self {
        Self::new(ActionKind::SendText { text: text.into() }, false)
    }

    /// Reply with `embed`, visible only to the member.
    pub fn send_embed(embed: ActionEmbed) -> Self {
        Self::new(ActionKind::SendEmbed { embed }, false)
    }

    /// Link no-op.
    pub fn open_url(url: impl Into<String>) -> Self {
        Self::new(ActionKind::OpenUrl { url: url.into() }, false)
    }

    /// Make the response visible to the whole channel.
    pub fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Whether the response is visible to the whole channel.
    pub fn is_public(&self) -> bool {
        self.public
    }
}

/// Ordered actions bound to one component of one message.
///
/// `(message_id, set_id)` is unique; the set is always stored and replaced as a
/// whole.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters, derive_new::new,
)]
pub struct ActionSet {
    /// Message the component lives on
    message_id: MessageId,
    /// Component-local key
    set_id: SetId,
    /// Actions in execution order
    actions: Vec<Action>,
}

impl ActionSet {
    /// Whether any action changes member roles.
    pub fn changes_roles(&self) -> bool {
        self.actions.iter().any(|a| a.kind().role_id().is_some())
    }

    /// Consume the set, yielding its actions.
    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }
}
