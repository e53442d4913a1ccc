//! Opening the key-value backend chosen in the `[store]` section.

use crate::{
    ActionSetStore, FileStore, KeyValueStore, MemoryStore, StoreBackend, StoreSettings,
    load_seed_file,
};
use embedg_error::{EmbedgResult, StoreResult};
use std::sync::Arc;
use tracing::{info, instrument};

/// The configured backend, kept concrete so it can be purged.
#[derive(Debug, Clone)]
pub enum StoreHandle {
    /// In-process store
    Memory(MemoryStore),
    /// File store under `data_dir`
    File(Arc<FileStore>),
}

impl StoreHandle {
    /// Open the backend named by `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`](embedg_error::StoreErrorKind::Backend)
    /// if the file backend's directory cannot be created.
    #[instrument(skip_all, fields(backend = %settings.backend()))]
    pub async fn open(settings: &StoreSettings) -> StoreResult<Self> {
        let handle = match settings.backend() {
            StoreBackend::Memory => Self::Memory(MemoryStore::new()),
            StoreBackend::File => Self::File(Arc::new(FileStore::open(settings.data_dir()).await?)),
        };
        info!("Opened store backend");
        Ok(handle)
    }

    /// The backend as a trait object.
    pub fn key_value(&self) -> Arc<dyn KeyValueStore> {
        match self {
            Self::Memory(store) => Arc::new(store.clone()),
            Self::File(store) => store.clone(),
        }
    }

    /// Drop expired values, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns the file backend's listing error.
    pub async fn purge_expired(&self) -> StoreResult<usize> {
        match self {
            Self::Memory(store) => Ok(store.purge_expired().await),
            Self::File(store) => store.purge_expired().await,
        }
    }
}

/// Open the configured backend, wrap it in an [`ActionSetStore`] with the
/// configured expiry, and import the seed file if one is set.
///
/// # Errors
///
/// Returns the backend error, or the seed file's read, parse or save error.
#[instrument(skip_all)]
pub async fn open_action_sets(
    settings: &StoreSettings,
) -> EmbedgResult<(ActionSetStore, StoreHandle)> {
    let handle = StoreHandle::open(settings).await?;
    let store = ActionSetStore::new(handle.key_value()).with_ttl(settings.action_set_ttl());
    if let Some(seed) = settings.seed_file() {
        let sets = load_seed_file(seed)?;
        let imported = store.import(&sets).await?;
        info!(imported, seed_file = %seed.display(), "Seeded action sets");
    }
    Ok((store, handle))
}
