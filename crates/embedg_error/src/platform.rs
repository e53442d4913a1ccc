//! Messaging platform error types.

/// Kinds of platform errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PlatformErrorKind {
    /// The platform refused the call for lack of permissions.
    #[display("Missing permissions: {_0}")]
    Forbidden(String),
    /// The role does not exist (anymore).
    #[display("Unknown role: {_0}")]
    UnknownRole(String),
    /// The member is not part of the guild.
    #[display("Unknown member: {_0}")]
    UnknownMember(String),
    /// The message does not exist or is not visible to the bot.
    #[display("Unknown message: {_0}")]
    UnknownMessage(String),
    /// The interaction token expired before the response was delivered.
    #[display("Interaction expired")]
    InteractionExpired,
    /// The call was rate limited.
    #[display("Rate limited: {_0}")]
    RateLimited(String),
    /// Any other transport or API failure.
    #[display("Platform request failed: {_0}")]
    Request(String),
}

/// Platform error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    kind: PlatformErrorKind,
    line: u32,
    file: &'static str,
}

impl PlatformError {
    /// Create a new platform error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PlatformErrorKind {
        &self.kind
    }
}

impl<T> From<T> for PlatformError
where
    T: Into<PlatformErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for platform calls.
pub type PlatformResult<T> = Result<T, PlatformError>;
