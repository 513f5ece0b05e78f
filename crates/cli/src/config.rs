//! Configuration loading from notecaps.toml.

use policy::{RoleTable, User, UserId};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Note database path. Defaults to the platform data directory.
    #[serde(default)]
    pub database: Option<PathBuf>,

    /// Known users and their roles.
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Role table (`[roles.<name>]`). Empty means the built-in defaults.
    #[serde(flatten)]
    pub roles: RoleTable,
}

/// A configured user.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    pub id: u64,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.roles.validate()?;
        Ok(config)
    }

    /// Configuration used when no file is present.
    pub fn default_config() -> Self {
        Self {
            roles: RoleTable::defaults(),
            ..Self::default()
        }
    }

    /// The effective role table.
    pub fn role_table(&self) -> RoleTable {
        if self.roles.is_empty() {
            RoleTable::defaults()
        } else {
            self.roles.clone()
        }
    }

    /// The user with `id`. Unknown users have no roles.
    pub fn user(&self, id: u64) -> User {
        let roles = self
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.roles.clone())
            .unwrap_or_default();
        User::new(UserId(id), roles)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error(transparent)]
    Roles(#[from] policy::Error),
}
