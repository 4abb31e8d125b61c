// SPDX-License-Identifier: MIT OR Apache-2.0

//! Granting and revoking permissions.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::PermissionCache;
use crate::division::{Division, DivisionId};
use crate::entity::Entity;
use crate::error::AuthError;
use crate::membership::group_ids_of;
use crate::permission::{Permission, PermissionType};
use crate::store::AuthStore;
use crate::view::DivisionPermissions;

/// Store of permission grants.
///
/// Every grant or revoke which changes the stored grants invalidates the shared permission cache
/// under the same exclusive lock the store write happens in.
#[derive(Clone, Debug)]
pub struct GrantStore<S> {
    store: S,
    cache: Arc<PermissionCache>,
}

impl<S> GrantStore<S>
where
    S: AuthStore,
{
    pub fn new(store: S, cache: Arc<PermissionCache>) -> Self {
        Self { store, cache }
    }

    /// Grant a permission kind to an entity within a division.
    ///
    /// Granting the same kind to the same entity in the same division twice is a no-op, the
    /// existing grant is returned.
    pub fn grant(
        &self,
        division: &Division,
        entity: &Entity,
        kind: PermissionType,
    ) -> Result<Permission, AuthError<S::Error>> {
        if self
            .store
            .entity(entity.id())
            .map_err(AuthError::Store)?
            .is_none()
        {
            return Err(AuthError::UnknownEntity(entity.id()));
        }

        // The division may be removed concurrently, its existence is checked by the insert.
        self.cache.invalidate_with(|| -> Result<_, AuthError<S::Error>> {
            let (permission, inserted) = self
                .store
                .insert_permission(division.id(), entity.id(), kind)
                .map_err(AuthError::Store)?
                .ok_or(AuthError::UnknownDivision(division.id()))?;

            if inserted {
                debug!(%kind, entity = %entity.id(), division = %division.id(), "granted permission");
            }

            Ok((permission, inserted))
        })
    }

    /// Revoke a permission kind from an entity within a division.
    ///
    /// Returns `false` if no such grant existed.
    pub fn revoke(
        &self,
        division: &Division,
        entity: &Entity,
        kind: PermissionType,
    ) -> Result<bool, AuthError<S::Error>> {
        self.cache.invalidate_with(|| -> Result<_, AuthError<S::Error>> {
            let removed = self
                .store
                .delete_permission(division.id(), entity.id(), kind)
                .map_err(AuthError::Store)?
                .is_some();

            if removed {
                debug!(%kind, entity = %entity.id(), division = %division.id(), "revoked permission");
            }

            Ok((removed, removed))
        })
    }

    /// All grants held directly by the entity, in any division.
    pub fn grants_for(&self, entity: &Entity) -> Result<HashSet<Permission>, AuthError<S::Error>> {
        self.store
            .entity_permissions(entity.id(), None)
            .map_err(AuthError::Store)
    }

    /// All grants held directly by the entity within one division.
    pub fn grants_in(
        &self,
        entity: &Entity,
        division: &Division,
    ) -> Result<HashSet<Permission>, AuthError<S::Error>> {
        self.store
            .entity_permissions(entity.id(), Some(division.id()))
            .map_err(AuthError::Store)
    }

    /// Grants which apply to the entity: its own and, for users, those of all its groups.
    ///
    /// Whether group grants are included follows the stored entity with the same id.
    pub fn effective_grants(
        &self,
        entity: &Entity,
        division: Option<DivisionId>,
    ) -> Result<HashSet<Permission>, AuthError<S::Error>> {
        let stored = self
            .store
            .entity(entity.id())
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownEntity(entity.id()))?;

        let mut grants = self
            .store
            .entity_permissions(stored.id(), division)
            .map_err(AuthError::Store)?;

        if let Entity::User(user) = &stored {
            for group_id in group_ids_of(&self.store, user.id())? {
                grants.extend(
                    self.store
                        .entity_permissions(group_id, division)
                        .map_err(AuthError::Store)?,
                );
            }
        }

        Ok(grants)
    }

    /// Explicit grants of a division grouped by kind, read directly from the store.
    pub fn division_view(
        &self,
        division: &Division,
    ) -> Result<DivisionPermissions, AuthError<S::Error>> {
        let division = self.ensure_division(division.id())?;
        let permissions = self
            .store
            .division_permissions(division.id())
            .map_err(AuthError::Store)?;
        Ok(DivisionPermissions::new(division, permissions))
    }

    fn ensure_division(&self, id: DivisionId) -> Result<Division, AuthError<S::Error>> {
        self.store
            .division(id)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownDivision(id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::cache::{CacheKey, PermissionCache};
    use crate::division::Division;
    use crate::entity::{EntityId, NewEntity};
    use crate::error::AuthError;
    use crate::permission::{PermissionSet, PermissionType};
    use crate::store::{AuthStore, MemoryStore};

    use super::GrantStore;

    fn setup() -> (MemoryStore, Arc<PermissionCache>, GrantStore<MemoryStore>) {
        let store = MemoryStore::new();
        let cache = Arc::new(PermissionCache::new());
        let grants = GrantStore::new(store.clone(), cache.clone());
        (store, cache, grants)
    }

    #[test]
    fn grant_is_idempotent() {
        let (store, _, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();

        let first = grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        let second = grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        assert_eq!(first, second);
        assert_eq!(grants.grants_for(&alice).unwrap().len(), 1);
        assert_eq!(grants.division_view(&alpha).unwrap().len(), 1);
    }

    #[test]
    fn revoke_missing_grant_is_noop() {
        let (store, _, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();

        assert!(!grants.revoke(&alpha, &alice, PermissionType::Pay).unwrap());
        grants.grant(&alpha, &alice, PermissionType::Pay).unwrap();
        assert!(grants.revoke(&alpha, &alice, PermissionType::Pay).unwrap());
        assert!(grants.grants_for(&alice).unwrap().is_empty());
    }

    #[test]
    fn grants_are_filtered_by_division() {
        let (store, _, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        let beta = store.create_division("Beta").unwrap();

        grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        grants.grant(&beta, &alice, PermissionType::Review).unwrap();

        let in_alpha = grants.grants_in(&alice, &alpha).unwrap();
        assert_eq!(in_alpha.len(), 1);
        assert!(
            in_alpha
                .iter()
                .all(|permission| permission.kind() == PermissionType::Submit)
        );
        assert_eq!(grants.grants_for(&alice).unwrap().len(), 2);
    }

    #[test]
    fn effective_grants_include_groups() {
        let (store, _, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let pilots = store.create_entity(NewEntity::group("pilots", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();

        store.insert_membership(alice.id(), pilots.id()).unwrap();
        grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        grants.grant(&alpha, &pilots, PermissionType::Review).unwrap();

        assert_eq!(grants.effective_grants(&alice, None).unwrap().len(), 2);
        assert_eq!(
            grants
                .effective_grants(&alice, Some(alpha.id()))
                .unwrap()
                .len(),
            2
        );
        // Groups only see their own grants.
        assert_eq!(grants.effective_grants(&pilots, None).unwrap().len(), 1);

        // The variant of the stored entity decides, not the one handed in.
        let mislabelled = NewEntity::group("alice", "test").into_entity(alice.id());
        assert_eq!(grants.effective_grants(&mislabelled, None).unwrap().len(), 2);
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let (store, _, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        let ghost = NewEntity::user("ghost", "test").into_entity(EntityId::new(999));
        let nowhere = Division::new(crate::DivisionId::new(999), "Nowhere");

        assert_matches!(
            grants.grant(&alpha, &ghost, PermissionType::Pay),
            Err(AuthError::UnknownEntity(_))
        );
        assert_matches!(
            grants.grant(&nowhere, &alice, PermissionType::Pay),
            Err(AuthError::UnknownDivision(_))
        );
    }

    #[test]
    fn only_changes_invalidate_cache() {
        let (store, cache, grants) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        let key = CacheKey::new(
            alice.id(),
            PermissionSet::from(PermissionType::Submit),
            Some(alpha.id()),
        );

        cache.store(key, false, cache.generation());
        grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        assert_eq!(cache.lookup(&key), None);

        cache.store(key, true, cache.generation());
        grants.grant(&alpha, &alice, PermissionType::Submit).unwrap();
        assert_eq!(cache.lookup(&key), Some(true));

        grants.revoke(&alpha, &alice, PermissionType::Submit).unwrap();
        assert_eq!(cache.lookup(&key), None);
    }
}
