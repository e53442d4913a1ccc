//! Runtime configuration loaded from TOML.

use embedg_core::{ActionSet, RoleId};
use embedg_error::{ConfigError, ConfigErrorKind, EmbedgError, EmbedgResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, derive_getters::Getters)]
pub struct EmbedgConfig {
    /// Interaction dispatch settings
    #[serde(default)]
    dispatch: DispatchSettings,
    /// Persistence settings
    #[serde(default)]
    store: StoreSettings,
    /// Public app settings
    #[serde(default)]
    app: AppSettings,
}

impl EmbedgConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    #[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> EmbedgResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EmbedgError::from(ConfigError::new(ConfigErrorKind::ReadFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            }))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid configuration.
    pub fn from_toml(content: &str) -> EmbedgResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            EmbedgError::from(ConfigError::new(ConfigErrorKind::Parse(e.to_string())))
        })?;
        config.validate()?;
        tracing::debug!(
            cooldown_seconds = config.dispatch.cooldown_seconds,
            protected_roles = config.dispatch.protected_roles.len(),
            backend = %config.store.backend,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigErrorKind::InvalidValue`] naming the first bad setting.
    pub fn validate(&self) -> EmbedgResult<()> {
        let invalid = |field: &str, reason: &str| {
            EmbedgError::from(ConfigError::new(ConfigErrorKind::InvalidValue {
                field: field.to_string(),
                reason: reason.to_string(),
            }))
        };

        let url = &self.app.public_url;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(invalid("app.public_url", "must be an http(s) URL"));
        }
        if self.store.backend == StoreBackend::File && self.store.data_dir.as_os_str().is_empty() {
            return Err(invalid("store.data_dir", "must be set for the file backend"));
        }
        Ok(())
    }
}

/// Interaction dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct DispatchSettings {
    /// Cooldown window for components flagged `COOLDOWN`
    #[serde(default = "default_cooldown_seconds")]
    cooldown_seconds: u64,
    /// Roles actions may never grant or revoke
    #[serde(default)]
    protected_roles: HashSet<RoleId>,
    /// Response when the actions produced nothing to say
    #[serde(default = "default_success_text")]
    success_text: String,
}

impl DispatchSettings {
    /// Cooldown window as a duration.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown_seconds(),
            protected_roles: HashSet::new(),
            success_text: default_success_text(),
        }
    }
}

/// Where key-value data lives.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreBackend {
    /// In-process only, lost on restart
    Memory,
    /// One file per key under `data_dir`
    #[default]
    File,
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct StoreSettings {
    /// Key-value backend
    #[serde(default)]
    backend: StoreBackend,
    /// Directory of the file backend
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    /// Action sets imported at startup
    #[serde(default)]
    seed_file: Option<PathBuf>,
    /// Expiry of stored action sets; 0 keeps them until the message is deleted
    #[serde(default)]
    action_set_ttl_hours: u64,
    /// Expiry of shared message exports
    #[serde(default = "default_shared_message_ttl_hours")]
    shared_message_ttl_hours: u64,
}

impl StoreSettings {
    /// Action set expiry, `None` for no expiry.
    pub fn action_set_ttl(&self) -> Option<Duration> {
        (self.action_set_ttl_hours > 0).then(|| hours(self.action_set_ttl_hours))
    }

    /// Shared message expiry.
    pub fn shared_message_ttl(&self) -> Duration {
        hours(self.shared_message_ttl_hours)
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: default_data_dir(),
            seed_file: None,
            action_set_ttl_hours: 0,
            shared_message_ttl_hours: default_shared_message_ttl_hours(),
        }
    }
}

/// Public app settings.
#[derive(Debug, Clone, Serialize, Deserialize, derive_getters::Getters)]
pub struct AppSettings {
    /// Base URL of the web editor
    #[serde(default = "default_public_url")]
    public_url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            public_url: default_public_url(),
        }
    }
}

/// Read action sets from a JSON seed file.
///
/// The file holds a list of `{"message_id", "set_id", "actions"}` objects in
/// the same shape the store uses.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or is not a list of sets.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_seed_file(path: impl AsRef<Path>) -> EmbedgResult<Vec<ActionSet>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        EmbedgError::from(ConfigError::new(ConfigErrorKind::ReadFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        }))
    })?;
    let sets: Vec<ActionSet> = serde_json::from_str(&content).map_err(|e| {
        EmbedgError::from(ConfigError::new(ConfigErrorKind::Parse(format!(
            "{}: {}",
            path.display(),
            e
        ))))
    })?;
    tracing::debug!(count = sets.len(), "Loaded seed file");
    Ok(sets)
}

fn hours(n: u64) -> Duration {
    Duration::from_secs(n.saturating_mul(3600))
}

fn default_cooldown_seconds() -> u64 {
    5
}

fn default_success_text() -> String {
    crate::DEFAULT_SUCCESS_TEXT.to_string()
}

fn default_shared_message_ttl_hours() -> u64 {
    24
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_public_url() -> String {
    "https://message.style".to_string()
}
