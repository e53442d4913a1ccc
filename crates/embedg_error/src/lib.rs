//! Error types for the embed generator component action system.
//!
//! Every concern gets its own `*ErrorKind` enum and a location-tracking
//! wrapper. [`EmbedgError`] ties them together for operations that cross
//! concerns, such as dispatching a click.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod codec;
mod config;
mod dispatch;
mod platform;
mod store;

pub use codec::{CodecError, CodecErrorKind, CodecResult};
pub use config::{ConfigError, ConfigErrorKind};
pub use dispatch::{DispatchError, DispatchErrorKind, DispatchResult};
pub use platform::{PlatformError, PlatformErrorKind, PlatformResult};
pub use store::{StoreError, StoreErrorKind, StoreResult};

/// Error kind union across all concerns.
#[derive(Debug, derive_more::From)]
pub enum EmbedgErrorKind {
    /// Identifier codec error
    Codec(CodecError),
    /// Action set persistence error
    Store(StoreError),
    /// Messaging platform error
    Platform(PlatformError),
    /// Dispatch policy error
    Dispatch(DispatchError),
    /// Configuration error
    Config(ConfigError),
}

impl std::fmt::Display for EmbedgErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbedgErrorKind::Codec(e) => write!(f, "{}", e),
            EmbedgErrorKind::Store(e) => write!(f, "{}", e),
            EmbedgErrorKind::Platform(e) => write!(f, "{}", e),
            EmbedgErrorKind::Dispatch(e) => write!(f, "{}", e),
            EmbedgErrorKind::Config(e) => write!(f, "{}", e),
        }
    }
}

/// Top-level error with kind discrimination.
#[derive(Debug)]
pub struct EmbedgError(Box<EmbedgErrorKind>);

impl EmbedgError {
    /// Create a new error from a kind.
    pub fn new(kind: EmbedgErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &EmbedgErrorKind {
        &self.0
    }
}

impl std::fmt::Display for EmbedgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Embedg Error: {}", self.0)
    }
}

impl std::error::Error for EmbedgError {}

impl<T> From<T> for EmbedgError
where
    T: Into<EmbedgErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for cross-concern operations.
pub type EmbedgResult<T> = std::result::Result<T, EmbedgError>;
