//! Stored note records.

use chrono::{DateTime, Utc};
use policy::{Note, NoteId, UserId};
use serde::{Deserialize, Serialize};

/// A note as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: NoteId,
    /// The note this one replies to, if any.
    pub parent_id: Option<NoteId>,
    pub author_id: UserId,
    pub content: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NoteRecord {
    /// The access-relevant view used by the capability resolver.
    pub fn to_note(&self) -> Note {
        Note::new(self.id, self.author_id, self.is_public)
    }

    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// Input for [`NoteStore::insert`](crate::NoteStore::insert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote {
    pub parent_id: Option<NoteId>,
    pub author_id: UserId,
    pub content: String,
    pub is_public: bool,
}

impl NewNote {
    pub fn new(author_id: UserId, content: impl Into<String>) -> Self {
        Self {
            parent_id: None,
            author_id,
            content: content.into(),
            is_public: true,
        }
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn reply_to(mut self, parent: NoteId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}
