//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The role configuration is invalid.
    #[error("invalid role table: {0}")]
    Invalid(String),

    /// Failed to parse a role file.
    #[error("failed to parse role table: {0}")]
    Parse(String),

    /// A capability name could not be parsed.
    #[error("unknown capability: '{0}'")]
    UnknownCapability(String),

    /// The note lookup collaborator failed.
    #[error("note lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An I/O error occurred while reading a role file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
