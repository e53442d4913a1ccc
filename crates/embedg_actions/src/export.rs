//! Recovery export.
//!
//! Rebuilds an editor document from a live message (content, embeds,
//! unparsed components and every stored action set) and shares it under a
//! short-lived link so the message can be restored in the editor.

use crate::{ActionSetStore, ComponentUnparser, KeyValueStore, Platform, UnparsedRow};
use chrono::{DateTime, TimeDelta, Utc};
use embedg_core::{Action, ChannelId, MessageId, SetId};
use embedg_error::{EmbedgResult, StoreError, StoreErrorKind, StoreResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, instrument};

static MESSAGE_LINK: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:canary\.|ptb\.)?discord\.com/channels/[0-9]+/([0-9]+)/([0-9]+)/?$")
});

/// A message the user pointed at, by id or by link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters)]
pub struct MessageReference {
    /// Channel from the link; absent for bare ids
    channel_id: Option<ChannelId>,
    /// Message id
    message_id: MessageId,
}

/// Parse a raw message id or a `discord.com/channels/<guild>/<channel>/<message>` link.
///
/// Canary and PTB links are accepted. Returns `None` for anything else.
pub fn parse_message_reference(input: &str) -> Option<MessageReference> {
    let input = input.trim();
    if let Ok(message_id) = input.parse::<MessageId>() {
        return Some(MessageReference {
            channel_id: None,
            message_id,
        });
    }

    let captures = MESSAGE_LINK.as_ref().ok()?.captures(input)?;
    let channel_id = captures.get(1)?.as_str().parse().ok()?;
    let message_id = captures.get(2)?.as_str().parse().ok()?;
    Some(MessageReference {
        channel_id: Some(channel_id),
        message_id,
    })
}

/// Editor document rebuilt from a live message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct MessageExport {
    /// Author (or webhook) name
    username: String,
    /// Author avatar
    avatar_url: Option<String>,
    /// Text content
    content: String,
    /// Raw embed objects
    embeds: Vec<serde_json::Value>,
    /// Unparsed component rows
    components: Vec<UnparsedRow>,
    /// Every stored action set of the message
    actions: BTreeMap<SetId, Vec<Action>>,
    /// When the export was taken
    exported_at: DateTime<Utc>,
}

/// Builds [`MessageExport`]s from live messages.
#[derive(Clone)]
pub struct MessageExporter {
    platform: Arc<dyn Platform>,
    store: ActionSetStore,
    unparser: ComponentUnparser,
}

impl std::fmt::Debug for MessageExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageExporter")
            .field("platform", &self.platform.platform_name())
            .field("store", &self.store)
            .finish()
    }
}

impl MessageExporter {
    /// Exporter reading messages from `platform` and sets from `store`.
    pub fn new(platform: Arc<dyn Platform>, store: ActionSetStore) -> Self {
        let unparser = ComponentUnparser::new(store.clone());
        Self {
            platform,
            store,
            unparser,
        }
    }

    /// Export one message.
    ///
    /// # Errors
    ///
    /// Returns platform errors if the message cannot be fetched and store
    /// errors if the backend fails.
    #[instrument(skip(self), fields(channel_id = %channel_id, message_id = %message_id))]
    pub async fn export(&self, channel_id: ChannelId, message_id: MessageId) -> EmbedgResult<MessageExport> {
        let message = self.platform.fetch_message(channel_id, message_id).await?;
        let unparsed = self.unparser.unparse(message_id, message.components()).await?;
        let actions = self
            .store
            .load_all(message_id)
            .await?
            .into_iter()
            .map(|(set_id, set)| (set_id, set.into_actions()))
            .collect::<BTreeMap<_, _>>();

        info!(sets = actions.len(), "Exported message");
        Ok(MessageExport {
            username: message.username().clone(),
            avatar_url: message.avatar_url().clone(),
            content: message.content().clone(),
            embeds: message.embeds().clone(),
            components: unparsed.rows().clone(),
            actions,
            exported_at: Utc::now(),
        })
    }
}

/// Link to a shared export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct SharedMessage {
    /// Share id
    id: String,
    /// Editor URL restoring the export
    url: String,
    /// When the link stops working
    expires_at: DateTime<Utc>,
}

impl SharedMessage {
    /// Text sent to the user who asked for the restore link.
    pub fn restore_text(&self) -> String {
        format!(
            "Click this link to restore the message: [message.style](<{}>)",
            self.url
        )
    }
}

/// Short-lived storage for shared exports.
#[derive(Clone)]
pub struct SharedMessageStore {
    backend: Arc<dyn KeyValueStore>,
    public_url: String,
    ttl: Duration,
}

impl std::fmt::Debug for SharedMessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMessageStore")
            .field("public_url", &self.public_url)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl SharedMessageStore {
    /// Store sharing exports under `public_url` for `ttl`.
    pub fn new(backend: Arc<dyn KeyValueStore>, public_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            ttl,
        }
    }

    /// Persist an export under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns serialization or backend errors.
    #[instrument(skip_all)]
    pub async fn share(&self, export: &MessageExport) -> StoreResult<SharedMessage> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let ttl = TimeDelta::from_std(self.ttl)
            .map_err(|e| StoreError::new(StoreErrorKind::InvalidDocument(e.to_string())))?;
        let bytes = serde_json::to_vec(export)
            .map_err(|e| StoreError::new(StoreErrorKind::Serialization(e.to_string())))?;

        self.backend
            .put(&shared_key(&id), bytes, Some(self.ttl))
            .await?;

        let shared = SharedMessage {
            url: format!("{}/editor/share/{}", self.public_url, id),
            expires_at: Utc::now() + ttl,
            id,
        };
        info!(share_id = %shared.id, expires_at = %shared.expires_at, "Shared message export");
        Ok(shared)
    }

    /// Read a shared export back, `None` once it expired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Corrupt`] if the stored export is unreadable,
    /// otherwise backend errors.
    #[instrument(skip(self))]
    pub async fn load(&self, id: &str) -> StoreResult<Option<MessageExport>> {
        let key = shared_key(id);
        let Some(bytes) = self.backend.get(&key).await? else {
            debug!("Shared message not found");
            return Ok(None);
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StoreError::new(StoreErrorKind::Corrupt {
                key,
                reason: e.to_string(),
            })
        })
    }
}

fn shared_key(id: &str) -> String {
    format!("shared-message:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_id() {
        let reference = parse_message_reference(" 1122334455 ").unwrap();
        assert_eq!(reference.message_id(), &MessageId::new(1122334455));
        assert_eq!(reference.channel_id(), &None);
    }

    #[test]
    fn test_parses_links() {
        for host in ["discord.com", "canary.discord.com", "ptb.discord.com"] {
            let link = format!("https://{host}/channels/1/22/333");
            let reference = parse_message_reference(&link).unwrap();
            assert_eq!(reference.channel_id(), &Some(ChannelId::new(22)));
            assert_eq!(reference.message_id(), &MessageId::new(333));
        }
    }

    #[test]
    fn test_rejects_other_input() {
        assert!(parse_message_reference("https://example.com/channels/1/2/3").is_none());
        assert!(parse_message_reference("hello").is_none());
        assert!(parse_message_reference("https://discord.com/channels/1/2").is_none());
    }

    #[test]
    fn test_restore_text() {
        let shared = SharedMessage {
            id: "abc".into(),
            url: "https://message.style/editor/share/abc".into(),
            expires_at: Utc::now(),
        };
        assert_eq!(
            shared.restore_text(),
            "Click this link to restore the message: [message.style](<https://message.style/editor/share/abc>)"
        );
    }
}
