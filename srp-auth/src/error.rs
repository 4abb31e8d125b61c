// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::division::DivisionId;
use crate::entity::EntityId;
use crate::permission::UnknownPermissionKind;

/// Error types for grant management and permission resolution.
///
/// The generic parameter `E` is the error type of the underlying
/// [`AuthStore`](crate::store::AuthStore). None of these errors are transient: they either point
/// at a caller mistake or at corrupted membership data and are never retried internally.
#[derive(Debug, Error)]
pub enum AuthError<E> {
    #[error("unknown permission kind: {0}")]
    UnknownPermissionKind(String),

    #[error("context does not refer to a division")]
    AmbiguousContext,

    #[error("membership of user {user} in group {group} is only recorded on one side")]
    InconsistentMembership { user: EntityId, group: EntityId },

    #[error("at least one permission kind must be requested")]
    EmptyPermissionSet,

    #[error("name must not be empty")]
    EmptyName,

    #[error("entity {0} not found")]
    UnknownEntity(EntityId),

    #[error("division {0} not found")]
    UnknownDivision(DivisionId),

    #[error("entity {0} is not a user")]
    NotAUser(EntityId),

    #[error("entity {0} is not a group")]
    NotAGroup(EntityId),

    #[error("store error: {0}")]
    Store(E),
}

impl<E> AuthError<E> {
    /// Returns `true` if the error signals broken internal invariants rather than a bad request.
    ///
    /// Callers should treat these as unrecoverable.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AuthError::InconsistentMembership { .. })
    }
}

impl<E> From<UnknownPermissionKind> for AuthError<E> {
    fn from(err: UnknownPermissionKind) -> Self {
        AuthError::UnknownPermissionKind(err.0)
    }
}
