use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permissions governed by the note resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteCapability {
    #[serde(rename = "create_notes")]
    Create,
    #[serde(rename = "edit_notes")]
    Edit,
    #[serde(rename = "edit_others_notes")]
    EditOthers,
    #[serde(rename = "delete_notes")]
    Delete,
    #[serde(rename = "delete_others_notes")]
    DeleteOthers,
    #[serde(rename = "read_notes")]
    Read,
    #[serde(rename = "read_others_private_notes")]
    ReadOthersPrivate,
}

impl NoteCapability {
    pub const ALL: [NoteCapability; 7] = [
        NoteCapability::Create,
        NoteCapability::Edit,
        NoteCapability::EditOthers,
        NoteCapability::Delete,
        NoteCapability::DeleteOthers,
        NoteCapability::Read,
        NoteCapability::ReadOthersPrivate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteCapability::Create => "create_notes",
            NoteCapability::Edit => "edit_notes",
            NoteCapability::EditOthers => "edit_others_notes",
            NoteCapability::Delete => "delete_notes",
            NoteCapability::DeleteOthers => "delete_others_notes",
            NoteCapability::Read => "read_notes",
            NoteCapability::ReadOthersPrivate => "read_others_private_notes",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.as_str() == name)
    }
}

impl fmt::Display for NoteCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability as seen by the host authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Capability {
    /// One of the note permissions.
    Note(NoteCapability),
    /// Refuses the action no matter which roles the user holds.
    DoNotAllow,
    /// Any capability outside the notes domain (e.g. `edit_posts`).
    Other(String),
}

impl Capability {
    pub const DO_NOT_ALLOW: &'static str = "do_not_allow";

    pub fn as_note(&self) -> Option<NoteCapability> {
        match self {
            Capability::Note(cap) => Some(*cap),
            _ => None,
        }
    }

    pub fn is_do_not_allow(&self) -> bool {
        matches!(self, Capability::DoNotAllow)
    }
}

impl From<NoteCapability> for Capability {
    fn from(cap: NoteCapability) -> Self {
        Capability::Note(cap)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Note(cap) => cap.fmt(f),
            Capability::DoNotAllow => f.write_str(Self::DO_NOT_ALLOW),
            Capability::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::UnknownCapability(s.to_string()));
        }
        if name == Self::DO_NOT_ALLOW {
            return Ok(Capability::DoNotAllow);
        }
        Ok(NoteCapability::from_name(name)
            .map(Capability::Note)
            .unwrap_or_else(|| Capability::Other(name.to_string())))
    }
}

impl TryFrom<String> for Capability {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Capability> for String {
    fn from(cap: Capability) -> Self {
        cap.to_string()
    }
}
