//! Note model and the lookup collaborator.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;

/// Opaque identifier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The parts of a note that access decisions depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub author_id: UserId,
    pub is_public: bool,
}

impl Note {
    pub fn new(id: NoteId, author_id: UserId, is_public: bool) -> Self {
        Self {
            id,
            author_id,
            is_public,
        }
    }
}

/// The resource a capability check is about.
///
/// For [`NoteCapability::Create`](crate::NoteCapability::Create) this is the
/// parent note being replied to, not the note about to be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTarget {
    /// A note the caller already loaded.
    Note(Note),
    /// A raw id, resolved through a [`NoteLookup`].
    Id(NoteId),
}

impl From<Note> for NoteTarget {
    fn from(note: Note) -> Self {
        NoteTarget::Note(note)
    }
}

impl From<NoteId> for NoteTarget {
    fn from(id: NoteId) -> Self {
        NoteTarget::Id(id)
    }
}

/// Read-only access to notes by id.
pub trait NoteLookup {
    type Error;

    /// Returns `Ok(None)` when no such note exists.
    fn find_by_id(&self, id: NoteId) -> Result<Option<Note>, Self::Error>;
}

impl NoteLookup for HashMap<NoteId, Note> {
    type Error = Infallible;

    fn find_by_id(&self, id: NoteId) -> Result<Option<Note>, Self::Error> {
        Ok(self.get(&id).copied())
    }
}

impl<L: NoteLookup + ?Sized> NoteLookup for &L {
    type Error = L::Error;

    fn find_by_id(&self, id: NoteId) -> Result<Option<Note>, Self::Error> {
        (**self).find_by_id(id)
    }
}
