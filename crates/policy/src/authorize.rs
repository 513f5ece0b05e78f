//! Host-side authorization pipeline.
//!
//! The host asks [`Authorizer::check`] whether a user may exercise a
//! capability. Registered [`MetaCapFilter`]s expand the capability into the
//! full list of requirements, which is then evaluated against the
//! [`RoleTable`]. The user must hold every required capability.

use crate::{Capability, NoteTarget, Result, RoleTable, UserId};
use tracing::debug;

/// Extension point for meta-capability expansion.
pub trait MetaCapFilter {
    /// Map `requested` into the capabilities the user must hold.
    ///
    /// `caps` is the list accumulated so far; `args[0]`, if present, is the
    /// resource the check is about.
    fn map_meta_cap(
        &self,
        caps: Vec<Capability>,
        requested: &Capability,
        user_id: UserId,
        args: &[NoteTarget],
    ) -> Result<Vec<Capability>>;
}

/// An acting user and the roles assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub roles: Vec<String>,
}

impl User {
    pub fn new<I, S>(id: UserId, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Evaluates capability checks against a role table.
pub struct Authorizer {
    roles: RoleTable,
    filters: Vec<Box<dyn MetaCapFilter>>,
}

impl Authorizer {
    pub fn new(roles: RoleTable) -> Self {
        Self {
            roles,
            filters: Vec::new(),
        }
    }

    /// Register a filter. Filters run in registration order.
    pub fn register(&mut self, filter: impl MetaCapFilter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    /// The capabilities `user` must hold for `requested` on `args`.
    pub fn required(
        &self,
        user: &User,
        requested: &Capability,
        args: &[NoteTarget],
    ) -> Result<Vec<Capability>> {
        let mut caps = vec![requested.clone()];
        for filter in &self.filters {
            caps = filter.map_meta_cap(caps, requested, user.id, args)?;
        }
        Ok(caps)
    }

    /// Check whether `user` may exercise `requested` on `args`.
    pub fn check(
        &self,
        user: &User,
        requested: &Capability,
        args: &[NoteTarget],
    ) -> Result<Decision> {
        let required = self.required(user, requested, args)?;
        let decision = self.evaluate(user, &required);
        debug!(user_id = %user.id, capability = %requested, ?required, ?decision, "capability check");
        Ok(decision)
    }

    /// Evaluate an already expanded requirement list.
    pub fn evaluate(&self, user: &User, required: &[Capability]) -> Decision {
        if required.iter().any(Capability::is_do_not_allow) {
            return Decision::Deny {
                reason: format!("{} is required", Capability::DO_NOT_ALLOW),
            };
        }

        let granted = self.roles.granted(&user.roles);
        let missing: Vec<String> = required
            .iter()
            .filter(|cap| !granted.contains(*cap))
            .map(ToString::to_string)
            .collect();

        if missing.is_empty() {
            Decision::Allow
        } else {
            Decision::Deny {
                reason: format!("user {} lacks {}", user.id, missing.join(", ")),
            }
        }
    }
}
