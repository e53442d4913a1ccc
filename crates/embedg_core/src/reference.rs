//! Component references: the decoded meaning of a component identifier.

use embedg_error::{CodecError, CodecErrorKind, CodecResult};
use serde::{Deserialize, Serialize};

/// Longest set id the identifier budget leaves room for.
pub const MAX_SET_ID_LEN: usize = 64;

/// Component-local key of an action set, unique within one message.
///
/// Set ids are 1 to [`MAX_SET_ID_LEN`] characters from `[A-Za-z0-9_-]`, which
/// keeps them free of the identifier separator and inside the ASCII budget.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct SetId(String);

impl SetId {
    /// Validate and wrap a set id.
    ///
    /// # Errors
    ///
    /// Returns [`CodecErrorKind::InvalidSetId`] if the id is empty, too long or
    /// contains characters outside `[A-Za-z0-9_-]`.
    pub fn new(id: impl Into<String>) -> CodecResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(CodecError::new(CodecErrorKind::InvalidSetId(
                "set id is empty".to_string(),
            )));
        }
        if id.len() > MAX_SET_ID_LEN {
            return Err(CodecError::new(CodecErrorKind::InvalidSetId(format!(
                "set id is {} characters, limit is {}",
                id.len(),
                MAX_SET_ID_LEN
            ))));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(CodecError::new(CodecErrorKind::InvalidSetId(format!(
                "set id contains {bad:?}"
            ))));
        }
        Ok(Self(id))
    }

    /// Generate a fresh random set id for a newly authored component.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SetId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SetId> for String {
    fn from(value: SetId) -> Self {
        value.0
    }
}

impl AsRef<str> for SetId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

bitflags::bitflags! {
    /// Execution flags packed into a component identifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ComponentFlags: u8 {
        /// The component may only be used once.
        const ONE_SHOT = 1;
        /// A one-shot component that has already been used.
        const TRIGGERED = 1 << 1;
        /// Clicks are subject to the per-user cooldown window.
        const COOLDOWN = 1 << 2;
    }
}

/// Decoded component identifier: which action set a component points at and
/// how it may be executed. The message id is implied by the message the
/// component lives on.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_new::new,
)]
pub struct ComponentReference {
    /// Action set the component executes
    set_id: SetId,
    /// Execution flags
    #[serde(default)]
    flags: ComponentFlags,
}

impl ComponentReference {
    /// Reference without any flags.
    pub fn plain(set_id: SetId) -> Self {
        Self::new(set_id, ComponentFlags::empty())
    }

    /// Wire identifier for this reference.
    pub fn identifier(&self) -> String {
        crate::codec::encode(&self.set_id, self.flags)
    }

    /// Same reference with additional flags set.
    pub fn with_flags(&self, flags: ComponentFlags) -> Self {
        Self::new(self.set_id.clone(), self.flags | flags)
    }

    /// Whether a one-shot component has already been consumed.
    pub fn is_triggered(&self) -> bool {
        self.flags.contains(ComponentFlags::TRIGGERED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_id_accepts_allowed_charset() {
        assert!(SetId::new("a1b2").is_ok());
        assert!(SetId::new("role-toggle_2").is_ok());
        assert!(SetId::new("x".repeat(MAX_SET_ID_LEN)).is_ok());
    }

    #[test]
    fn test_set_id_rejects_invalid() {
        assert!(SetId::new("").is_err());
        assert!(SetId::new("has:colon").is_err());
        assert!(SetId::new("spaces are bad").is_err());
        assert!(SetId::new("é").is_err());
        assert!(SetId::new("x".repeat(MAX_SET_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_generated_set_ids_are_valid_and_distinct() {
        let a = SetId::generate();
        let b = SetId::generate();
        assert_ne!(a, b);
        assert!(SetId::new(a.as_str()).is_ok());
    }

    #[test]
    fn test_set_id_deserialization_validates() {
        assert!(serde_json::from_str::<SetId>("\"ok-id\"").is_ok());
        assert!(serde_json::from_str::<SetId>("\"not ok\"").is_err());
    }

    #[test]
    fn test_with_flags_accumulates() {
        let reference = ComponentReference::new(SetId::new("a").unwrap(), ComponentFlags::ONE_SHOT);
        let triggered = reference.with_flags(ComponentFlags::TRIGGERED);
        assert!(triggered.is_triggered());
        assert!(triggered.flags().contains(ComponentFlags::ONE_SHOT));
        assert!(!reference.is_triggered());
    }
}
