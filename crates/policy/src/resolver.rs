//! Meta-capability expansion for note permissions.

use crate::{
    Capability, Error, MetaCapFilter, Note, NoteCapability, NoteLookup, NoteTarget, Result, UserId,
};
use tracing::{debug, warn};

/// Expands a note capability check into everything the role table must grant.
///
/// Stateless apart from the lookup it borrows notes from; every call is
/// evaluated fresh.
#[derive(Debug, Clone)]
pub struct CapabilityResolver<L> {
    notes: L,
}

impl<L: NoteLookup> CapabilityResolver<L> {
    pub fn new(notes: L) -> Self {
        Self { notes }
    }

    pub fn lookup(&self) -> &L {
        &self.notes
    }

    /// Resolve `requested` on `target` for `user_id`, starting from `caps`.
    ///
    /// Capabilities outside the notes domain and checks without a target pass
    /// through untouched. A target that cannot be found yields exactly
    /// `[DoNotAllow]`.
    pub fn resolve(
        &self,
        caps: Vec<Capability>,
        requested: &Capability,
        user_id: UserId,
        target: Option<&NoteTarget>,
    ) -> std::result::Result<Vec<Capability>, L::Error> {
        let Some(cap) = requested.as_note() else {
            return Ok(caps);
        };
        let Some(target) = target else {
            return Ok(caps);
        };

        let note = match *target {
            NoteTarget::Note(note) => note,
            NoteTarget::Id(id) => match self.notes.find_by_id(id)? {
                Some(note) => note,
                None => {
                    warn!(note_id = %id, capability = %cap, "note not found, denying");
                    return Ok(vec![Capability::DoNotAllow]);
                }
            },
        };

        Ok(expand(caps, cap, user_id, &note))
    }
}

fn expand(mut caps: Vec<Capability>, cap: NoteCapability, user_id: UserId, note: &Note) -> Vec<Capability> {
    if note.author_id == user_id {
        return caps;
    }

    // Replying (Create) needs to see the parent note.
    if !note.is_public && matches!(cap, NoteCapability::Read | NoteCapability::Create) {
        push_unique(&mut caps, NoteCapability::ReadOthersPrivate);
    }

    match cap {
        NoteCapability::Edit => push_unique(&mut caps, NoteCapability::EditOthers),
        NoteCapability::Delete => push_unique(&mut caps, NoteCapability::DeleteOthers),
        _ => {}
    }

    debug!(
        note_id = %note.id,
        user_id = %user_id,
        capability = %cap,
        required = caps.len(),
        "expanded note capability"
    );
    caps
}

fn push_unique(caps: &mut Vec<Capability>, cap: NoteCapability) {
    let cap = Capability::Note(cap);
    if !caps.contains(&cap) {
        caps.push(cap);
    }
}

impl<L> MetaCapFilter for CapabilityResolver<L>
where
    L: NoteLookup,
    L::Error: std::error::Error + Send + Sync + 'static,
{
    fn map_meta_cap(
        &self,
        caps: Vec<Capability>,
        requested: &Capability,
        user_id: UserId,
        args: &[NoteTarget],
    ) -> Result<Vec<Capability>> {
        self.resolve(caps, requested, user_id, args.first())
            .map_err(|e| Error::Lookup(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteId;
    use std::cell::Cell;
    use std::collections::HashMap;

    const AUTHOR: UserId = UserId(1);
    const OTHER: UserId = UserId(2);
    const PRIVATE: NoteId = NoteId(10);
    const PUBLIC: NoteId = NoteId(11);

    fn resolver() -> CapabilityResolver<HashMap<NoteId, Note>> {
        let mut notes = HashMap::new();
        notes.insert(PRIVATE, Note::new(PRIVATE, AUTHOR, false));
        notes.insert(PUBLIC, Note::new(PUBLIC, AUTHOR, true));
        CapabilityResolver::new(notes)
    }

    fn note(cap: NoteCapability) -> Capability {
        Capability::Note(cap)
    }

    fn run(cap: NoteCapability, user: UserId, id: NoteId) -> Vec<Capability> {
        resolver()
            .resolve(vec![note(cap)], &note(cap), user, Some(&NoteTarget::Id(id)))
            .unwrap()
    }

    #[test]
    fn test_unrelated_capability_passes_through() {
        let caps = vec![Capability::Other("edit_posts".into())];
        let out = resolver()
            .resolve(
                caps.clone(),
                &Capability::Other("edit_posts".into()),
                OTHER,
                Some(&NoteTarget::Id(NoteId(999))),
            )
            .unwrap();
        assert_eq!(out, caps);

        let out = resolver()
            .resolve(caps.clone(), &Capability::DoNotAllow, OTHER, Some(&NoteTarget::Id(PRIVATE)))
            .unwrap();
        assert_eq!(out, caps);
    }

    #[test]
    fn test_missing_target_passes_through() {
        for cap in NoteCapability::ALL {
            let caps = vec![note(cap)];
            let out = resolver().resolve(caps.clone(), &note(cap), OTHER, None).unwrap();
            assert_eq!(out, caps);
        }
    }

    #[test]
    fn test_unknown_note_is_denied() {
        for cap in NoteCapability::ALL {
            for user in [AUTHOR, OTHER] {
                assert_eq!(run(cap, user, NoteId(404)), vec![Capability::DoNotAllow]);
            }
        }
    }

    #[test]
    fn test_author_is_not_escalated() {
        for cap in NoteCapability::ALL {
            for id in [PRIVATE, PUBLIC] {
                assert_eq!(run(cap, AUTHOR, id), vec![note(cap)]);
            }
        }
    }

    #[test]
    fn test_read_private_requires_read_others_private() {
        assert_eq!(
            run(NoteCapability::Read, OTHER, PRIVATE),
            vec![note(NoteCapability::Read), note(NoteCapability::ReadOthersPrivate)]
        );
    }

    #[test]
    fn test_read_public_is_not_escalated() {
        assert_eq!(run(NoteCapability::Read, OTHER, PUBLIC), vec![note(NoteCapability::Read)]);
    }

    #[test]
    fn test_reply_to_private_requires_read_others_private() {
        assert_eq!(
            run(NoteCapability::Create, OTHER, PRIVATE),
            vec![note(NoteCapability::Create), note(NoteCapability::ReadOthersPrivate)]
        );
        assert_eq!(run(NoteCapability::Create, OTHER, PUBLIC), vec![note(NoteCapability::Create)]);
    }

    #[test]
    fn test_edit_and_delete_require_others() {
        for id in [PRIVATE, PUBLIC] {
            assert_eq!(
                run(NoteCapability::Edit, OTHER, id),
                vec![note(NoteCapability::Edit), note(NoteCapability::EditOthers)]
            );
            assert_eq!(
                run(NoteCapability::Delete, OTHER, id),
                vec![note(NoteCapability::Delete), note(NoteCapability::DeleteOthers)]
            );
        }
    }

    #[test]
    fn test_privacy_does_not_apply_to_edit() {
        let out = run(NoteCapability::Edit, OTHER, PRIVATE);
        assert!(!out.contains(&note(NoteCapability::ReadOthersPrivate)));
    }

    #[test]
    fn test_existing_caps_are_kept_and_not_duplicated() {
        let caps = vec![
            Capability::Other("edit_posts".into()),
            note(NoteCapability::EditOthers),
        ];
        let out = resolver()
            .resolve(caps.clone(), &note(NoteCapability::Edit), OTHER, Some(&NoteTarget::Id(PUBLIC)))
            .unwrap();
        assert_eq!(out, caps);
    }

    struct CountingLookup {
        calls: Cell<usize>,
    }

    impl NoteLookup for CountingLookup {
        type Error = std::convert::Infallible;

        fn find_by_id(&self, _id: NoteId) -> std::result::Result<Option<Note>, Self::Error> {
            self.calls.set(self.calls.get() + 1);
            Ok(None)
        }
    }

    #[test]
    fn test_resolved_note_skips_lookup() {
        let resolver = CapabilityResolver::new(CountingLookup { calls: Cell::new(0) });
        let target = NoteTarget::Note(Note::new(NoteId(5), AUTHOR, false));
        let out = resolver
            .resolve(vec![note(NoteCapability::Read)], &note(NoteCapability::Read), OTHER, Some(&target))
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(resolver.lookup().calls.get(), 0);

        resolver
            .resolve(vec![], &note(NoteCapability::Read), OTHER, Some(&NoteTarget::Id(NoteId(5))))
            .unwrap();
        assert_eq!(resolver.lookup().calls.get(), 1);
    }

    #[derive(Debug, thiserror::Error)]
    #[error("storage offline")]
    struct Offline;

    struct OfflineLookup;

    impl NoteLookup for OfflineLookup {
        type Error = Offline;

        fn find_by_id(&self, _id: NoteId) -> std::result::Result<Option<Note>, Self::Error> {
            Err(Offline)
        }
    }

    #[test]
    fn test_lookup_error_propagates() {
        let resolver = CapabilityResolver::new(OfflineLookup);
        let err = resolver
            .map_meta_cap(
                vec![note(NoteCapability::Read)],
                &note(NoteCapability::Read),
                OTHER,
                &[NoteTarget::Id(PRIVATE)],
            )
            .unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        assert!(err.to_string().contains("storage offline"));
    }
}
