//! Dispatch policy error types.

/// Kinds of dispatch errors raised before any action executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum DispatchErrorKind {
    /// The invoking user or the bot does not satisfy a requirement of the set.
    #[display("Authorization denied: {_0}")]
    AuthorizationDenied(String),
    /// The component was a one-shot component that has already been used.
    #[display("Component already triggered")]
    AlreadyTriggered,
    /// The user clicked again inside the cooldown window.
    #[display("Cooling down for {retry_after_secs} more seconds")]
    CoolingDown {
        /// Whole seconds until the component can be used again
        retry_after_secs: u64,
    },
}

/// Dispatch error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Dispatch Error: {} at line {} in {}", kind, line, file)]
pub struct DispatchError {
    kind: DispatchErrorKind,
    line: u32,
    file: &'static str,
}

impl DispatchError {
    /// Create a new dispatch error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: DispatchErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DispatchErrorKind {
        &self.kind
    }
}

impl<T> From<T> for DispatchError
where
    T: Into<DispatchErrorKind>,
{
    #[track_caller]
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for dispatch policy checks.
pub type DispatchResult<T> = Result<T, DispatchError>;
