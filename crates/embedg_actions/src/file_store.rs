//! File-backed [`KeyValueStore`].
//!
//! Each key is one file under the root directory. A file holds a header line
//! with the expiry (Unix milliseconds, or `-` for none) followed by the raw
//! value. Writes go to a temporary file that is renamed into place, so a
//! reader never sees a half-written value.

use crate::KeyValueStore;
use async_trait::async_trait;
use chrono::Utc;
use embedg_error::{StoreError, StoreErrorKind, StoreResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const NO_EXPIRY: &str = "-";
const TEMP_PREFIX: &str = ".tmp-";

/// Key-value store keeping one file per key.
///
/// Writers in one process are serialized so that purging never removes a
/// value written after it was found expired.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    writes: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] if the directory cannot be created.
    #[instrument(skip(root), fields(root = %root.as_ref().display()))]
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| backend_error(&root, e))?;
        info!("Opened file store");
        Ok(Self {
            root,
            writes: Mutex::new(()),
        })
    }

    /// Directory holding the files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Delete every expired file, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::Backend`] if the directory cannot be listed.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self) -> StoreResult<usize> {
        let _guard = self.writes.lock().await;
        let now = Utc::now().timestamp_millis();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(|e| backend_error(&self.root, e))?;

        let mut purged = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| backend_error(&self.root, e))?
        {
            let path = entry.path();
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                continue;
            }
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    continue;
                }
            };
            if matches!(split_record(&bytes), Ok((Some(expires_at), _)) if expires_at <= now) {
                remove_if_present(&path).await?;
                purged += 1;
            }
        }
        debug!(purged, "Purged expired files");
        Ok(purged)
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(file_name(key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> StoreResult<()> {
        let header = match ttl {
            None => NO_EXPIRY.to_string(),
            Some(ttl) => {
                let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
                Utc::now().timestamp_millis().saturating_add(millis).to_string()
            }
        };
        let mut record = Vec::with_capacity(header.len() + 1 + value.len());
        record.extend_from_slice(header.as_bytes());
        record.push(b'\n');
        record.extend_from_slice(&value);

        let path = self.path(key);
        let temp = self
            .root
            .join(format!("{TEMP_PREFIX}{}", uuid::Uuid::new_v4().simple()));

        let _guard = self.writes.lock().await;
        tokio::fs::write(&temp, &record)
            .await
            .map_err(|e| backend_error(&temp, e))?;
        tokio::fs::rename(&temp, &path)
            .await
            .map_err(|e| backend_error(&path, e))
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let path = self.path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(backend_error(&path, e)),
        };
        let (expires_at, value) = split_record(&bytes).map_err(|reason| {
            StoreError::new(StoreErrorKind::Corrupt {
                key: key.to_string(),
                reason,
            })
        })?;
        // Expired files stay until purged.
        if expires_at.is_some_and(|at| at <= Utc::now().timestamp_millis()) {
            return Ok(None);
        }
        Ok(Some(value.to_vec()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let _guard = self.writes.lock().await;
        remove_if_present(&self.path(key)).await
    }
}

/// Escape a key into a flat, reversible file name.
fn file_name(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{byte:02X}"));
        }
    }
    name
}

fn split_record(bytes: &[u8]) -> Result<(Option<i64>, &[u8]), String> {
    let newline = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| "missing expiry header".to_string())?;
    let header = std::str::from_utf8(&bytes[..newline]).map_err(|e| e.to_string())?;
    let expires_at = match header {
        NO_EXPIRY => None,
        millis => Some(
            millis
                .parse::<i64>()
                .map_err(|e| format!("bad expiry {millis:?}: {e}"))?,
        ),
    };
    Ok((expires_at, &bytes[newline + 1..]))
}

async fn remove_if_present(path: &Path) -> StoreResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(backend_error(path, e)),
    }
}

fn backend_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::new(StoreErrorKind::Backend(format!("{}: {}", path.display(), e)))
}
