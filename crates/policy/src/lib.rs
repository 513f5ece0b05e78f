//! Capability resolution for collaborative notes.
//!
//! Core principle: **the resolver never grants access.** It only expands the
//! list of capabilities the host's role table must satisfy before an action
//! on a note goes ahead.
//!
//! # Overview
//!
//! - [`NoteCapability`] is the closed set of note permissions.
//! - [`Capability`] is what flows through the host pipeline: a note
//!   capability, the [`Capability::DoNotAllow`] marker, or anything else.
//! - [`CapabilityResolver`] performs meta-capability expansion for a single
//!   request against a [`NoteLookup`].
//! - [`Authorizer`] is the host side: it runs registered [`MetaCapFilter`]s
//!   and checks the result against a [`RoleTable`].
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use policy::{Authorizer, Capability, CapabilityResolver, Note, NoteCapability, NoteId,
//!     NoteTarget, RoleTable, User, UserId};
//!
//! let mut notes = HashMap::new();
//! notes.insert(NoteId(7), Note::new(NoteId(7), UserId(1), false));
//!
//! let mut authorizer = Authorizer::new(RoleTable::defaults());
//! authorizer.register(CapabilityResolver::new(notes));
//!
//! let author = User::new(UserId(2), ["author"]);
//! let decision = authorizer
//!     .check(&author, &Capability::Note(NoteCapability::Read), &[NoteTarget::Id(NoteId(7))])
//!     .unwrap();
//! assert!(!decision.is_allowed());
//! ```

mod authorize;
mod capability;
mod error;
mod note;
mod resolver;
mod roles;

pub use authorize::{Authorizer, Decision, MetaCapFilter, User};
pub use capability::{Capability, NoteCapability};
pub use error::{Error, Result};
pub use note::{Note, NoteId, NoteLookup, NoteTarget, UserId};
pub use resolver::CapabilityResolver;
pub use roles::{RoleGrants, RoleTable};
