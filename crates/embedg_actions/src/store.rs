//! Action set persistence.
//!
//! Sets are stored as one JSON document per `(message, set)` pair behind a
//! generic [`KeyValueStore`], plus a per-message index so every set of a
//! message can be found (restore, export, delete).

use async_trait::async_trait;
use embedg_core::{Action, ActionSet, MAX_ACTIONS_PER_SET, MessageId, SetId};
use embedg_error::{StoreError, StoreErrorKind, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Version written into every action set document.
pub const DOCUMENT_VERSION: u32 = 1;

/// Byte-oriented key/value backend with optional per-key expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] if the write fails.
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()>;

    /// Read the value under `key`, `None` if absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] if the read fails.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] if the delete fails.
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process [`KeyValueStore`].
///
/// Expired entries are dropped lazily when read, or in bulk by
/// [`MemoryStore::purge_expired`]. All data is lost when the last clone is
/// dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|v| !v.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, v| !v.is_expired(now));
        before - entries.len()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), StoredValue { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(stored) if !stored.is_expired(now) => return Ok(Some(stored.value.clone())),
                Some(_) => {}
            }
        }
        // The entry may have been replaced between the two locks.
        let mut entries = self.entries.write().await;
        Ok(take_live(&mut entries, key, now))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Live value under `key`; an expired entry is removed instead.
fn take_live(entries: &mut HashMap<String, StoredValue>, key: &str, now: Instant) -> Option<Vec<u8>> {
    match entries.get(key) {
        None => return None,
        Some(stored) if !stored.is_expired(now) => return Some(stored.value.clone()),
        Some(_) => {}
    }
    entries.remove(key);
    None
}

/// Persisted form of an action set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ActionSetDocument {
    /// Document format version
    version: u32,
    /// Actions in execution order
    actions: Vec<Action>,
}

impl ActionSetDocument {
    /// Current-version document holding `actions`.
    pub fn new(actions: Vec<Action>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            actions,
        }
    }

    /// Parse a stored document.
    ///
    /// The version is checked before the actions so that a future format is
    /// reported as such rather than as corruption.
    ///
    /// # Errors
    ///
    /// * [`StoreErrorKind::Corrupt`] if the bytes are not a document,
    /// * [`StoreErrorKind::UnsupportedDocumentVersion`] for unknown versions.
    pub fn from_slice(key: &str, bytes: &[u8]) -> StoreResult<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            version: u32,
            actions: serde_json::Value,
        }

        let corrupt = |reason: String| {
            StoreError::new(StoreErrorKind::Corrupt {
                key: key.to_string(),
                reason,
            })
        };

        let envelope: Envelope =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        if envelope.version != DOCUMENT_VERSION {
            return Err(StoreError::new(StoreErrorKind::UnsupportedDocumentVersion(
                envelope.version,
            )));
        }
        let actions: Vec<Action> =
            serde_json::from_value(envelope.actions).map_err(|e| corrupt(e.to_string()))?;
        Ok(Self::new(actions))
    }

    /// Serialize for storage.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Serialization`] if encoding fails.
    pub fn to_vec(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| StoreError::new(StoreErrorKind::Serialization(e.to_string())))
    }
}

/// Key of the document holding one action set.
pub fn set_key(message_id: MessageId, set_id: &SetId) -> String {
    format!("action-set:{message_id}:{set_id}")
}

/// Key of the per-message set index.
pub fn index_key(message_id: MessageId) -> String {
    format!("action-set-index:{message_id}")
}

type IndexLocks = Arc<Mutex<HashMap<MessageId, Arc<AsyncMutex<()>>>>>;

/// Action set repository over a [`KeyValueStore`].
///
/// Writes touching a message's index are serialized per message across all
/// clones of the store, so concurrent saves never drop each other's entries.
#[derive(Clone)]
pub struct ActionSetStore {
    backend: Arc<dyn KeyValueStore>,
    ttl: Option<Duration>,
    index_locks: IndexLocks,
}

impl std::fmt::Debug for ActionSetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionSetStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ActionSetStore {
    /// Store without expiry.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            ttl: None,
            index_locks: IndexLocks::default(),
        }
    }

    /// Apply `ttl` to every write. `None` disables expiry.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// The underlying backend.
    pub fn backend(&self) -> &Arc<dyn KeyValueStore> {
        &self.backend
    }

    /// Load one action set.
    ///
    /// # Errors
    ///
    /// * [`StoreErrorKind::NotFound`] if no set is stored under the pair,
    /// * [`StoreErrorKind::Corrupt`] or
    ///   [`StoreErrorKind::UnsupportedDocumentVersion`] if it cannot be read,
    /// * [`StoreErrorKind::Backend`] on backend failure.
    #[instrument(skip(self), fields(message_id = %message_id, set_id = %set_id))]
    pub async fn load(&self, message_id: MessageId, set_id: &SetId) -> StoreResult<ActionSet> {
        let key = set_key(message_id, set_id);
        let Some(bytes) = self.backend.get(&key).await? else {
            debug!("Action set not found");
            return Err(StoreError::new(StoreErrorKind::NotFound {
                message_id: message_id.to_string(),
                set_id: set_id.to_string(),
            }));
        };
        let document = ActionSetDocument::from_slice(&key, &bytes)?;
        debug!(actions = document.actions.len(), "Loaded action set");
        Ok(ActionSet::new(message_id, set_id.clone(), document.actions))
    }

    /// Load every set of a message, keyed by set id.
    ///
    /// Index entries whose document is gone or unreadable are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] on backend failure and
    /// [`StoreErrorKind::Corrupt`] if the index itself is unreadable.
    #[instrument(skip(self), fields(message_id = %message_id))]
    pub async fn load_all(&self, message_id: MessageId) -> StoreResult<BTreeMap<SetId, ActionSet>> {
        let mut sets = BTreeMap::new();
        for set_id in self.read_index(message_id).await? {
            match self.load(message_id, &set_id).await {
                Ok(set) => {
                    sets.insert(set_id, set);
                }
                Err(e) if e.is_not_found() => {
                    debug!(set_id = %set_id, "Skipping stale index entry");
                }
                Err(e) if e.is_unreadable() => {
                    warn!(set_id = %set_id, error = %e, "Skipping unreadable action set");
                }
                Err(e) => return Err(e),
            }
        }
        debug!(count = sets.len(), "Loaded action sets for message");
        Ok(sets)
    }

    /// Store one set, replacing any previous version, and index it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::InvalidDocument`] if the set has too many
    /// actions, otherwise backend or serialization errors.
    #[instrument(skip(self, set), fields(message_id = %set.message_id(), set_id = %set.set_id()))]
    pub async fn save(&self, set: &ActionSet) -> StoreResult<()> {
        validate(set)?;
        let message_id = *set.message_id();
        let lock = self.index_lock(message_id);
        let _guard = lock.lock().await;

        self.write_set(set).await?;
        let mut index = self.read_index(message_id).await?;
        if index.insert(set.set_id().clone()) {
            self.write_index(message_id, &index).await?;
        }
        info!(actions = set.actions().len(), "Saved action set");
        Ok(())
    }

    /// Replace every set of a message with `sets`.
    ///
    /// Sets present before but absent from `sets` are deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::InvalidDocument`] if a set belongs to another
    /// message, a set id repeats, or a set has too many actions. Nothing is
    /// written in that case.
    #[instrument(skip(self, sets), fields(message_id = %message_id, count = sets.len()))]
    pub async fn replace_message(&self, message_id: MessageId, sets: &[ActionSet]) -> StoreResult<()> {
        let mut index = BTreeSet::new();
        for set in sets {
            validate(set)?;
            if *set.message_id() != message_id {
                return Err(StoreError::new(StoreErrorKind::InvalidDocument(format!(
                    "set {} belongs to message {}, not {}",
                    set.set_id(),
                    set.message_id(),
                    message_id
                ))));
            }
            if !index.insert(set.set_id().clone()) {
                return Err(StoreError::new(StoreErrorKind::InvalidDocument(format!(
                    "duplicate set id {}",
                    set.set_id()
                ))));
            }
        }

        let lock = self.index_lock(message_id);
        let _guard = lock.lock().await;

        let previous = self.read_index(message_id).await?;
        for set in sets {
            self.write_set(set).await?;
        }
        self.write_index(message_id, &index).await?;

        let removed: Vec<&SetId> = previous.difference(&index).collect();
        for set_id in &removed {
            self.backend.delete(&set_key(message_id, set_id)).await?;
        }
        info!(removed = removed.len(), "Replaced action sets for message");
        Ok(())
    }

    /// Delete every set of a message and its index.
    ///
    /// # Errors
    ///
    /// Returns backend errors.
    #[instrument(skip(self), fields(message_id = %message_id))]
    pub async fn delete_message(&self, message_id: MessageId) -> StoreResult<()> {
        let lock = self.index_lock(message_id);
        let _guard = lock.lock().await;

        let index = self.read_index(message_id).await?;
        for set_id in &index {
            self.backend.delete(&set_key(message_id, set_id)).await?;
        }
        self.backend.delete(&index_key(message_id)).await?;
        info!(count = index.len(), "Deleted action sets for message");
        Ok(())
    }

    /// Store several sets, one [`save`](Self::save) each.
    ///
    /// # Errors
    ///
    /// Stops at the first set that fails validation or cannot be written.
    #[instrument(skip_all, fields(count = sets.len()))]
    pub async fn import(&self, sets: &[ActionSet]) -> StoreResult<usize> {
        for set in sets {
            self.save(set).await?;
        }
        info!("Imported action sets");
        Ok(sets.len())
    }

    fn index_lock(&self, message_id: MessageId) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.index_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Index lock table poisoned, recovering");
                poisoned.into_inner()
            }
        };
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(message_id).or_default().clone()
    }

    async fn write_set(&self, set: &ActionSet) -> StoreResult<()> {
        let document = ActionSetDocument::new(set.actions().clone());
        self.backend
            .put(&set_key(*set.message_id(), set.set_id()), document.to_vec()?, self.ttl)
            .await
    }

    async fn read_index(&self, message_id: MessageId) -> StoreResult<BTreeSet<SetId>> {
        let key = index_key(message_id);
        match self.backend.get(&key).await? {
            None => Ok(BTreeSet::new()),
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::new(StoreErrorKind::Corrupt {
                    key,
                    reason: e.to_string(),
                })
            }),
        }
    }

    async fn write_index(&self, message_id: MessageId, index: &BTreeSet<SetId>) -> StoreResult<()> {
        let bytes = serde_json::to_vec(index)
            .map_err(|e| StoreError::new(StoreErrorKind::Serialization(e.to_string())))?;
        self.backend.put(&index_key(message_id), bytes, self.ttl).await
    }
}

fn validate(set: &ActionSet) -> StoreResult<()> {
    if set.actions().len() > MAX_ACTIONS_PER_SET {
        return Err(StoreError::new(StoreErrorKind::InvalidDocument(format!(
            "set {} has {} actions, limit is {}",
            set.set_id(),
            set.actions().len(),
            MAX_ACTIONS_PER_SET
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedg_core::RoleId;

    #[test]
    fn test_document_format() {
        let document = ActionSetDocument::new(vec![Action::give_role(RoleId::new(7))]);
        let value: serde_json::Value = serde_json::from_slice(&document.to_vec().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": 1,
                "actions": [{"kind": "give_role", "role_id": "7", "public": false}]
            })
        );
    }

    #[test]
    fn test_future_document_version_rejected() {
        let err = ActionSetDocument::from_slice("k", br#"{"version": 2, "actions": [{"kind": "new"}]}"#)
            .unwrap_err();
        assert_eq!(err.kind(), &StoreErrorKind::UnsupportedDocumentVersion(2));
    }

    #[test]
    fn test_garbage_document_is_corrupt() {
        let err = ActionSetDocument::from_slice("k", b"not json").unwrap_err();
        assert!(matches!(err.kind(), StoreErrorKind::Corrupt { key, .. } if key == "k"));
    }

    #[test]
    fn test_keys() {
        let set_id = SetId::new("abc").unwrap();
        assert_eq!(set_key(MessageId::new(5), &set_id), "action-set:5:abc");
        assert_eq!(index_key(MessageId::new(5)), "action-set-index:5");
    }

    #[tokio::test]
    async fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store.put("short", b"x".to_vec(), Some(Duration::ZERO)).await.unwrap();
        store.put("long", b"y".to_vec(), None).await.unwrap();

        assert_eq!(store.get("short").await.unwrap(), None);
        assert_eq!(store.get("long").await.unwrap(), Some(b"y".to_vec()));
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn test_replaced_entry_survives_expiry_recheck() {
        let now = Instant::now();
        let mut entries = HashMap::new();
        entries.insert(
            "fresh".to_string(),
            StoredValue {
                value: b"new".to_vec(),
                expires_at: None,
            },
        );
        entries.insert(
            "stale".to_string(),
            StoredValue {
                value: b"old".to_vec(),
                expires_at: Some(now),
            },
        );

        assert_eq!(take_live(&mut entries, "fresh", now), Some(b"new".to_vec()));
        assert!(entries.contains_key("fresh"));
        assert_eq!(take_live(&mut entries, "stale", now), None);
        assert!(!entries.contains_key("stale"));
        assert_eq!(take_live(&mut entries, "missing", now), None);
    }

    #[tokio::test]
    async fn test_idle_index_locks_are_pruned() {
        let store = ActionSetStore::new(Arc::new(MemoryStore::new()));
        for id in 1..=3 {
            let set = ActionSet::new(
                MessageId::new(id),
                SetId::new("a").unwrap(),
                vec![Action::give_role(RoleId::new(1))],
            );
            store.save(&set).await.unwrap();
        }
        let _held = store.index_lock(MessageId::new(9));
        assert_eq!(store.index_locks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryStore::new();
        store.put("a", vec![1], Some(Duration::ZERO)).await.unwrap();
        store.put("b", vec![2], Some(Duration::ZERO)).await.unwrap();
        store.put("c", vec![3], None).await.unwrap();
        assert_eq!(store.purge_expired().await, 2);
        assert!(!store.is_empty().await);
    }
}
