//! Identifier codec error types.

/// Kinds of identifier codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum CodecErrorKind {
    /// The identifier does not follow the `<tag>:<set_id>[:<flags>]` structure.
    #[display("Malformed identifier: {_0}")]
    MalformedIdentifier(String),
    /// The scheme tag is ours but carries a version this build cannot read.
    #[display("Unsupported identifier version: {_0}")]
    UnsupportedVersion(String),
    /// A set id violates the character or length constraints.
    #[display("Invalid set id: {_0}")]
    InvalidSetId(String),
}

/// Identifier codec error with location tracking.
///
/// # Examples
///
/// ```
/// use embedg_error::{CodecError, CodecErrorKind};
///
/// let err = CodecError::new(CodecErrorKind::UnsupportedVersion("act9".to_string()));
/// assert!(format!("{}", err).contains("act9"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Codec Error: {} at line {} in {}", kind, line, file)]
pub struct CodecError {
    kind: CodecErrorKind,
    line: u32,
    file: &'static str,
}

impl CodecError {
    /// Create a new codec error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: CodecErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CodecErrorKind {
        &self.kind
    }

    /// Whether the identifier should be treated as belonging to another application.
    pub fn is_foreign(&self) -> bool {
        matches!(
            self.kind,
            CodecErrorKind::MalformedIdentifier(_) | CodecErrorKind::UnsupportedVersion(_)
        )
    }
}

impl<T> From<T> for CodecError
where
    T: Into<CodecErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
