//! SQLite note store implementation.

use crate::{migrations, Error, NewNote, NoteRecord, Result};
use chrono::{DateTime, Utc};
use policy::{Note, NoteId, NoteLookup, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const NOTE_COLUMNS: &str =
    "id, parent_id, author_id, content, is_public, created_at, updated_at";

/// SQLite-backed note store.
pub struct NoteStore {
    conn: Connection,
}

impl NoteStore {
    /// Open or create a note store at the given path, applying pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Create an in-memory note store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::migrate(&mut conn)?;
        Ok(Self { conn })
    }

    /// The schema version of the underlying database.
    pub fn schema_version(&self) -> Result<u32> {
        migrations::current_version(&self.conn)
    }

    /// Insert a note and return the stored record.
    pub fn insert(&self, note: &NewNote) -> Result<NoteRecord> {
        if let Some(parent) = note.parent_id {
            if self.find(parent)?.is_none() {
                return Err(Error::NotFound(format!("parent note {parent}")));
            }
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO notes (parent_id, author_id, content, is_public, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                note.parent_id.map(|id| id.0 as i64),
                note.author_id.0 as i64,
                note.content,
                note.is_public,
                now,
            ],
        )?;

        let id = NoteId(self.conn.last_insert_rowid() as u64);
        self.find(id)?
            .ok_or_else(|| Error::NotFound(format!("note {id}")))
    }

    /// Load a note by id.
    pub fn find(&self, id: NoteId) -> Result<Option<NoteRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                [id.0 as i64],
                RawNote::from_row,
            )
            .optional()?;
        raw.map(RawNote::into_record).transpose()
    }

    /// Most recent notes first.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<NoteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map([limit as i64], RawNote::from_row)?;
        rows.map(|row| row?.into_record()).collect()
    }

    /// Replies to `parent`, oldest first.
    pub fn replies(&self, parent: NoteId) -> Result<Vec<NoteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE parent_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map([parent.0 as i64], RawNote::from_row)?;
        rows.map(|row| row?.into_record()).collect()
    }

    /// Record that `user` has read `note`.
    pub fn mark_read(&self, note: NoteId, user: UserId) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO note_readers (note_id, user_id, read_at) VALUES (?1, ?2, ?3)",
            params![note.0 as i64, user.0 as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn is_read(&self, note: NoteId, user: UserId) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM note_readers WHERE note_id = ?1 AND user_id = ?2",
                params![note.0 as i64, user.0 as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl NoteLookup for NoteStore {
    type Error = Error;

    fn find_by_id(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.find(id)?.map(|record| record.to_note()))
    }
}

struct RawNote {
    id: i64,
    parent_id: Option<i64>,
    author_id: i64,
    content: String,
    is_public: bool,
    created_at: String,
    updated_at: String,
}

impl RawNote {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            author_id: row.get(2)?,
            content: row.get(3)?,
            is_public: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<NoteRecord> {
        Ok(NoteRecord {
            id: NoteId(self.id as u64),
            parent_id: self.parent_id.map(|id| NoteId(id as u64)),
            author_id: UserId(self.author_id as u64),
            content: self.content,
            is_public: self.is_public,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| Error::Timestamp(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::{Capability, CapabilityResolver, NoteCapability, NoteTarget};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);

    #[test]
    fn test_insert_and_find() {
        let store = NoteStore::in_memory().unwrap();
        let note = store.insert(&NewNote::new(ALICE, "Fix the header spacing").private()).unwrap();

        let found = store.find(note.id).unwrap().unwrap();
        assert_eq!(found, note);
        assert_eq!(found.author_id, ALICE);
        assert!(!found.is_public);
        assert!(!found.is_reply());
        assert!(store.find(NoteId(999)).unwrap().is_none());
    }

    #[test]
    fn test_replies() {
        let store = NoteStore::in_memory().unwrap();
        let parent = store.insert(&NewNote::new(ALICE, "Thread")).unwrap();
        let first = store.insert(&NewNote::new(BOB, "First").reply_to(parent.id)).unwrap();
        let second = store.insert(&NewNote::new(ALICE, "Second").reply_to(parent.id)).unwrap();

        let replies = store.replies(parent.id).unwrap();
        assert_eq!(replies, vec![first, second]);
        assert!(replies.iter().all(NoteRecord::is_reply));
    }

    #[test]
    fn test_reply_to_missing_parent() {
        let store = NoteStore::in_memory().unwrap();
        let err = store
            .insert(&NewNote::new(BOB, "Orphan").reply_to(NoteId(42)))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_list_recent_limit() {
        let store = NoteStore::in_memory().unwrap();
        for i in 0..5 {
            store.insert(&NewNote::new(ALICE, format!("note {i}"))).unwrap();
        }
        let recent = store.list_recent(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "note 4");
    }

    #[test]
    fn test_read_receipts() {
        let store = NoteStore::in_memory().unwrap();
        let note = store.insert(&NewNote::new(ALICE, "Ping")).unwrap();
        assert!(!store.is_read(note.id, BOB).unwrap());
        store.mark_read(note.id, BOB).unwrap();
        store.mark_read(note.id, BOB).unwrap();
        assert!(store.is_read(note.id, BOB).unwrap());
        assert!(!store.is_read(note.id, ALICE).unwrap());
    }

    #[test]
    fn test_reopen_keeps_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");

        let id = {
            let store = NoteStore::open(&path).unwrap();
            store.insert(&NewNote::new(ALICE, "persisted")).unwrap().id
        };

        let store = NoteStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), migrations::latest_version());
        assert_eq!(store.find(id).unwrap().unwrap().content, "persisted");
    }

    #[test]
    fn test_resolver_over_store() {
        let store = NoteStore::in_memory().unwrap();
        let private = store.insert(&NewNote::new(ALICE, "secret").private()).unwrap();
        let resolver = CapabilityResolver::new(&store);
        let read = Capability::Note(NoteCapability::Read);

        let required = resolver
            .resolve(vec![read.clone()], &read, BOB, Some(&NoteTarget::Id(private.id)))
            .unwrap();
        assert_eq!(
            required,
            vec![read.clone(), Capability::Note(NoteCapability::ReadOthersPrivate)]
        );

        let required = resolver
            .resolve(vec![read.clone()], &read, BOB, Some(&NoteTarget::Id(NoteId(77))))
            .unwrap();
        assert_eq!(required, vec![Capability::DoNotAllow]);
    }
}
