//! Action set persistence error types.

/// Kinds of store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// No action set is stored under the key.
    #[display("Action set not found: {message_id}/{set_id}")]
    NotFound {
        /// Message the set was looked up for
        message_id: String,
        /// Component-local set id
        set_id: String,
    },
    /// A stored document could not be decoded.
    #[display("Corrupt document at {key}: {reason}")]
    Corrupt {
        /// Storage key of the document
        key: String,
        /// Decoder message
        reason: String,
    },
    /// A stored document was written by an incompatible schema version.
    #[display("Unsupported document version {_0}")]
    UnsupportedDocumentVersion(u32),
    /// A document was rejected before it was written.
    #[display("Invalid document: {_0}")]
    InvalidDocument(String),
    /// A document could not be encoded.
    #[display("Serialization failed: {_0}")]
    Serialization(String),
    /// The underlying key-value backend failed.
    #[display("Storage backend error: {_0}")]
    Backend(String),
}

/// Store error with location tracking.
///
/// # Examples
///
/// ```
/// use embedg_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::Backend("connection reset".to_string()));
/// assert!(!err.is_not_found());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    kind: StoreErrorKind,
    line: u32,
    file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// Whether the referenced action set does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StoreErrorKind::NotFound { .. })
    }

    /// Whether the referenced document exists but cannot be used.
    pub fn is_unreadable(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::Corrupt { .. } | StoreErrorKind::UnsupportedDocumentVersion(_)
        )
    }
}

impl<T> From<T> for StoreError
where
    T: Into<StoreErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
