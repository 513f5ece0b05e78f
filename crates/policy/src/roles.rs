//! Role table configuration.

use crate::{Capability, Error, NoteCapability, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Role-to-capability table loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleTable {
    /// Capabilities granted per role name.
    #[serde(default)]
    pub roles: BTreeMap<String, RoleGrants>,
}

/// Capabilities granted to a single role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleGrants {
    #[serde(default)]
    pub grant: Vec<Capability>,
}

impl RoleTable {
    /// Load a role table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a role table from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let table: Self = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// Built-in roles: editors and above manage every note, authors and
    /// contributors only their own.
    pub fn defaults() -> Self {
        let own = [
            NoteCapability::Create,
            NoteCapability::Edit,
            NoteCapability::Delete,
            NoteCapability::Read,
        ];

        let mut table = Self::default();
        table.insert("administrator", NoteCapability::ALL);
        table.insert("editor", NoteCapability::ALL);
        table.insert("author", own);
        table.insert("contributor", own);
        table.insert("subscriber", std::iter::empty());
        table
    }

    fn insert(&mut self, role: &str, caps: impl IntoIterator<Item = NoteCapability>) {
        self.roles.insert(
            role.to_string(),
            RoleGrants {
                grant: caps.into_iter().map(Capability::Note).collect(),
            },
        );
    }

    /// Reject grants that can never be satisfied meaningfully.
    pub fn validate(&self) -> Result<()> {
        for (role, grants) in &self.roles {
            if grants.grant.iter().any(Capability::is_do_not_allow) {
                return Err(Error::Invalid(format!(
                    "role '{role}' grants {}",
                    Capability::DO_NOT_ALLOW
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Union of the capabilities granted by `roles`. Unknown roles grant nothing.
    pub fn granted<S: AsRef<str>>(&self, roles: &[S]) -> HashSet<Capability> {
        roles
            .iter()
            .filter_map(|role| self.roles.get(role.as_ref()))
            .flat_map(|grants| grants.grant.iter().cloned())
            .collect()
    }
}
