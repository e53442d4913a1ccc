//! Configuration error types.

/// Kinds of configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A configuration or seed file could not be read.
    #[display("Failed to read {path}: {reason}")]
    ReadFile {
        /// Path that was read
        path: String,
        /// I/O error message
        reason: String,
    },
    /// The file contents are not valid configuration.
    #[display("Failed to parse config: {_0}")]
    Parse(String),
    /// A setting parsed but holds an unusable value.
    #[display("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted setting name, such as `app.public_url`
        field: String,
        /// Why the value was refused
        reason: String,
    },
}

/// Configuration error with location tracking.
///
/// # Examples
///
/// ```
/// use embedg_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::new(ConfigErrorKind::Parse("expected a number".to_string()));
/// assert!(err.to_string().contains("expected a number"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Create a new configuration error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}

impl From<ConfigErrorKind> for ConfigError {
    #[track_caller]
    fn from(kind: ConfigErrorKind) -> Self {
        Self::new(kind)
    }
}
