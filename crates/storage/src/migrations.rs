//! Versioned schema migrations.
//!
//! The applied version lives in SQLite's `user_version` pragma. Each
//! migration runs in its own transaction and bumps the version on commit.

use crate::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// A single schema step.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, ordered by version.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create notes table",
        sql: r#"
            CREATE TABLE notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NULL REFERENCES notes(id) ON DELETE CASCADE,
                author_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                is_public INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        description: "index notes by parent and author",
        sql: r#"
            CREATE INDEX idx_notes_parent ON notes(parent_id);
            CREATE INDEX idx_notes_author ON notes(author_id);
        "#,
    },
    Migration {
        version: 3,
        description: "create note readers table",
        sql: r#"
            CREATE TABLE note_readers (
                note_id INTEGER NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL,
                read_at TEXT NOT NULL,
                PRIMARY KEY (note_id, user_id)
            );
        "#,
    },
];

/// The version a fully migrated database reports.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// The version currently recorded in the database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Apply every pending migration and return the resulting version.
pub fn migrate(conn: &mut Connection) -> Result<u32> {
    let mut version = current_version(conn)?;
    let latest = latest_version();

    if version > latest {
        return Err(Error::SchemaTooNew {
            found: version,
            supported: latest,
        });
    }

    let start = version;
    for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
        debug!(version = migration.version, "applying migration: {}", migration.description);
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration.version))?;
        tx.commit()?;
        version = migration.version;
        info!(version, "migrated note schema");
    }

    Ok(version)
}
