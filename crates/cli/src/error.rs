//! CLI error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The database file does not exist.
    ///
    /// This typically means no note has been added yet.
    #[error("database not found at {path}. Run 'notecaps migrate' first")]
    DatabaseNotFound { path: PathBuf },

    /// The capability check was refused.
    #[error("denied: {reason}")]
    Denied { reason: String },

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An error occurred in the storage layer.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    /// An error occurred in the policy layer.
    #[error(transparent)]
    Policy(#[from] policy::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
