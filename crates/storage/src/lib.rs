//! SQLite-backed note storage.
//!
//! This crate provides the local note repository that the capability
//! resolver reads from. The schema is managed by a small versioned migration
//! registry ([`migrations`]), so opening an older database upgrades it in
//! place.
//!
//! # Example
//!
//! ```no_run
//! use policy::{NoteLookup, UserId};
//! use storage::{NewNote, NoteStore};
//!
//! let store = NoteStore::open("notes.db")?;
//! let note = store.insert(&NewNote::new(UserId(1), "Check the footer").private())?;
//!
//! let view = store.find_by_id(note.id)?.expect("just inserted");
//! assert!(!view.is_public);
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
pub mod migrations;
mod note;
mod store;

pub use error::{Error, Result};
pub use migrations::Migration;
pub use note::{NewNote, NoteRecord};
pub use store::NoteStore;
