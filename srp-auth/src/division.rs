// SPDX-License-Identifier: MIT OR Apache-2.0

//! Divisions are independent namespaces for permission grants.
use std::fmt::Display;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Unique identifier of a division, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DivisionId(u64);

impl DivisionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for DivisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reimbursement division.
///
/// A division has (possibly non-intersecting) sets of entities which may submit, review and pay
/// out requests. A grant in one division has no effect on any other.
#[derive(Clone, Debug)]
pub struct Division {
    id: DivisionId,
    name: String,
}

impl Division {
    pub fn new(id: DivisionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> DivisionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Division {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Division {}

impl Hash for Division {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Anything which can point a permission check at a division.
///
/// Workflow objects (for example a pending request) implement this so they can be handed to the
/// resolver directly. Returning `None` makes the check fail with
/// [`AuthError::AmbiguousContext`].
pub trait DivisionContext {
    fn division_id(&self) -> Option<DivisionId>;
}

impl DivisionContext for Division {
    fn division_id(&self) -> Option<DivisionId> {
        Some(self.id)
    }
}

impl DivisionContext for DivisionId {
    fn division_id(&self) -> Option<DivisionId> {
        Some(*self)
    }
}

/// Where a permission check applies.
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    /// Permission held in at least one division.
    Any,

    /// Permission held in exactly this division.
    Division(DivisionId),

    /// Permission held in the division the context object refers to.
    Context(&'a dyn DivisionContext),
}

impl Scope<'_> {
    /// Resolve the scope into a division id, or `None` for "any division".
    pub(crate) fn resolve<E>(&self) -> Result<Option<DivisionId>, AuthError<E>> {
        match self {
            Scope::Any => Ok(None),
            Scope::Division(id) => Ok(Some(*id)),
            Scope::Context(context) => context
                .division_id()
                .map(Some)
                .ok_or(AuthError::AmbiguousContext),
        }
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Any => write!(f, "Any"),
            Scope::Division(id) => f.debug_tuple("Division").field(id).finish(),
            Scope::Context(context) => f
                .debug_tuple("Context")
                .field(&context.division_id())
                .finish(),
        }
    }
}

impl From<DivisionId> for Scope<'_> {
    fn from(id: DivisionId) -> Self {
        Scope::Division(id)
    }
}

impl From<Option<DivisionId>> for Scope<'_> {
    fn from(id: Option<DivisionId>) -> Self {
        match id {
            Some(id) => Scope::Division(id),
            None => Scope::Any,
        }
    }
}

impl<'a, T> From<&'a T> for Scope<'a>
where
    T: DivisionContext,
{
    fn from(context: &'a T) -> Self {
        Scope::Context(context)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::error::AuthError;

    use super::{Division, DivisionContext, DivisionId, Scope};

    struct Detached;

    impl DivisionContext for Detached {
        fn division_id(&self) -> Option<DivisionId> {
            None
        }
    }

    #[test]
    fn scope_resolution() {
        let alpha = Division::new(DivisionId::new(7), "Alpha");

        let resolved: Result<_, AuthError<()>> = Scope::from(&alpha).resolve();
        assert_eq!(resolved.unwrap(), Some(DivisionId::new(7)));

        let resolved: Result<_, AuthError<()>> = Scope::from(DivisionId::new(3)).resolve();
        assert_eq!(resolved.unwrap(), Some(DivisionId::new(3)));

        let resolved: Result<_, AuthError<()>> = Scope::from(None::<DivisionId>).resolve();
        assert_eq!(resolved.unwrap(), None);

        let resolved: Result<_, AuthError<()>> = Scope::from(&Detached).resolve();
        assert_matches!(resolved, Err(AuthError::AmbiguousContext));
    }
}
