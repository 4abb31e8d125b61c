// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence interface for entities, divisions, permission grants and group membership.
//!
//! The permission core never builds queries itself, it only asks the store for concrete,
//! materialised sets (the grants of one entity, the groups of one user, ..). Every write method
//! must be atomic: a grant or membership pair is either fully stored or not at all, and both
//! sides of a membership pair change together.
//!
//! An in-memory implementation is provided with [`MemoryStore`].
mod memory;

use std::collections::HashSet;
use std::fmt::{Debug, Display};

use crate::division::{Division, DivisionId};
use crate::entity::{Entity, EntityId, NewEntity};
use crate::permission::{Permission, PermissionType};

pub use memory::{InnerMemoryStore, MemoryStore};

/// Interface for storing, deleting and querying authorization state.
pub trait AuthStore: Clone {
    type Error: Display + Debug;

    /// Persist a new entity, assigning it a fresh id.
    fn create_entity(&self, entity: NewEntity) -> Result<Entity, Self::Error>;

    /// Get an entity.
    fn entity(&self, id: EntityId) -> Result<Option<Entity>, Self::Error>;

    /// Set the site administrator flag of a user.
    ///
    /// Returns the updated user or `None` when no user with this id exists.
    fn set_admin(&self, user: EntityId, admin: bool) -> Result<Option<Entity>, Self::Error>;

    /// Persist a new division, assigning it a fresh id.
    fn create_division(&self, name: &str) -> Result<Division, Self::Error>;

    /// Get a division.
    fn division(&self, id: DivisionId) -> Result<Option<Division>, Self::Error>;

    /// Delete a division together with all grants applying to it.
    ///
    /// Returns `true` when the removal occurred and `false` when the division was not found.
    fn delete_division(&self, id: DivisionId) -> Result<bool, Self::Error>;

    /// Insert a grant unless an identical (division, entity, kind) grant exists already.
    ///
    /// Returns the stored grant and `true` when the insert occurred, or the existing grant and
    /// `false` when no insertion occurred. Returns `None` when the division does not exist. The
    /// existence check and the insert happen atomically, a grant never outlives its division.
    fn insert_permission(
        &self,
        division: DivisionId,
        entity: EntityId,
        kind: PermissionType,
    ) -> Result<Option<(Permission, bool)>, Self::Error>;

    /// Delete a grant.
    ///
    /// Returns the removed grant or `None` when it was not found in the store.
    fn delete_permission(
        &self,
        division: DivisionId,
        entity: EntityId,
        kind: PermissionType,
    ) -> Result<Option<Permission>, Self::Error>;

    /// Get all grants held directly by an entity, optionally restricted to one division.
    fn entity_permissions(
        &self,
        entity: EntityId,
        division: Option<DivisionId>,
    ) -> Result<HashSet<Permission>, Self::Error>;

    /// Get all grants applying to a division.
    fn division_permissions(&self, division: DivisionId)
    -> Result<HashSet<Permission>, Self::Error>;

    /// Record that a user is a member of a group.
    ///
    /// Returns `true` when the insert occurred and `false` when the pair existed already.
    fn insert_membership(&self, user: EntityId, group: EntityId) -> Result<bool, Self::Error>;

    /// Remove a user from a group.
    ///
    /// Returns `true` when the removal occurred and `false` when the pair was not found.
    fn delete_membership(&self, user: EntityId, group: EntityId) -> Result<bool, Self::Error>;

    /// Ids of all groups the user is a member of.
    fn group_ids(&self, user: EntityId) -> Result<HashSet<EntityId>, Self::Error>;

    /// Ids of all users which are members of the group.
    fn member_ids(&self, group: EntityId) -> Result<HashSet<EntityId>, Self::Error>;
}
