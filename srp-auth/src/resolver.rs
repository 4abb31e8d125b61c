// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolve whether an entity holds a permission.
use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::cache::{CacheKey, PermissionCache};
use crate::division::{DivisionId, Scope};
use crate::entity::{Entity, EntityId, User};
use crate::error::AuthError;
use crate::membership::group_ids_of;
use crate::permission::{PermissionSet, PermissionType};
use crate::store::AuthStore;

/// Answers "does this entity hold any of these permission kinds in this division?".
///
/// An entity holds a kind when it was granted the kind directly, when one of the groups it belongs
/// to was granted the kind, or, for kinds of the elevated subset, when it holds `Admin` in the
/// same scope. Results are memoized in the shared [`PermissionCache`].
#[derive(Clone, Debug)]
pub struct Resolver<S> {
    store: S,
    cache: Arc<PermissionCache>,
}

impl<S> Resolver<S>
where
    S: AuthStore,
{
    pub fn new(store: S, cache: Arc<PermissionCache>) -> Self {
        Self { store, cache }
    }

    /// Returns `true` if the entity holds _any_ of the requested kinds within the scope.
    ///
    /// The scope can be a division, a division id, any object implementing
    /// [`DivisionContext`](crate::DivisionContext) (for example a pending request) or
    /// [`Scope::Any`] to check all divisions.
    pub fn has_permission<'a>(
        &self,
        entity: &Entity,
        kinds: impl Into<PermissionSet>,
        scope: impl Into<Scope<'a>>,
    ) -> Result<bool, AuthError<S::Error>> {
        self.check(entity, kinds.into(), scope.into())
    }

    /// Same as [`Resolver::has_permission`] with permission kinds given by name.
    ///
    /// Fails with [`AuthError::UnknownPermissionKind`] if any name is not a known kind.
    pub fn has_permission_named<'a, N: AsRef<str>>(
        &self,
        entity: &Entity,
        names: &[N],
        scope: impl Into<Scope<'a>>,
    ) -> Result<bool, AuthError<S::Error>> {
        let kinds = PermissionSet::parse(names)?;
        self.check(entity, kinds, scope.into())
    }

    fn check(
        &self,
        entity: &Entity,
        kinds: PermissionSet,
        scope: Scope<'_>,
    ) -> Result<bool, AuthError<S::Error>> {
        if kinds.is_empty() {
            return Err(AuthError::EmptyPermissionSet);
        }

        // Admin includes the reviewer and payer privileges.
        if !kinds.contains(PermissionType::Admin)
            && kinds.is_subset(&PermissionType::ELEVATED)
            && self.check(entity, PermissionType::Admin.into(), scope)?
        {
            trace!(entity = %entity.id(), ?kinds, "permission implied by admin");
            return Ok(true);
        }

        let division = scope.resolve()?;
        self.cached(entity, CacheKey::new(entity.id(), kinds, division))
    }

    fn cached(&self, entity: &Entity, key: CacheKey) -> Result<bool, AuthError<S::Error>> {
        // Observe the generation before touching the store, see `PermissionCache::store`.
        let generation = self.cache.generation();

        if let Some(value) = self.cache.lookup(&key) {
            return Ok(value);
        }

        let value = self.compute(entity, key.kinds, key.division)?;
        self.cache.store(key, value, generation);
        Ok(value)
    }

    fn compute(
        &self,
        entity: &Entity,
        kinds: PermissionSet,
        division: Option<DivisionId>,
    ) -> Result<bool, AuthError<S::Error>> {
        // Results are cached by id, so the stored variant decides whether group grants count.
        let stored = self
            .store
            .entity(entity.id())
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownEntity(entity.id()))?;

        if let Some(id) = division {
            if self.store.division(id).map_err(AuthError::Store)?.is_none() {
                return Err(AuthError::UnknownDivision(id));
            }
        }

        if self.holds_any(stored.id(), kinds, division)? {
            return Ok(true);
        }

        if let Entity::User(user) = &stored {
            for group_id in group_ids_of(&self.store, user.id())? {
                if self.holds_any(group_id, kinds, division)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn holds_any(
        &self,
        entity: EntityId,
        kinds: PermissionSet,
        division: Option<DivisionId>,
    ) -> Result<bool, AuthError<S::Error>> {
        let permissions = self
            .store
            .entity_permissions(entity, division)
            .map_err(AuthError::Store)?;
        Ok(permissions
            .iter()
            .any(|permission| kinds.contains(permission.kind())))
    }

    /// Divisions the user may submit requests to, directly or through its groups.
    ///
    /// Returns (id, name) pairs sorted by division name.
    pub fn submit_divisions(
        &self,
        user: &User,
    ) -> Result<Vec<(DivisionId, String)>, AuthError<S::Error>> {
        let mut entities = vec![user.id()];
        entities.extend(group_ids_of(&self.store, user.id())?);

        let mut divisions: HashMap<DivisionId, String> = HashMap::new();
        for entity in entities {
            let permissions = self
                .store
                .entity_permissions(entity, None)
                .map_err(AuthError::Store)?;
            for permission in permissions {
                if permission.kind() != PermissionType::Submit
                    || divisions.contains_key(&permission.division())
                {
                    continue;
                }
                // Grants of removed divisions are skipped.
                if let Some(division) = self
                    .store
                    .division(permission.division())
                    .map_err(AuthError::Store)?
                {
                    divisions.insert(division.id(), division.name().to_string());
                }
            }
        }

        let mut choices: Vec<(DivisionId, String)> = divisions.into_iter().collect();
        choices.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
        Ok(choices)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::cache::PermissionCache;
    use crate::division::{DivisionContext, DivisionId, Scope};
    use crate::entity::{EntityId, NewEntity};
    use crate::error::AuthError;
    use crate::permission::{PermissionSet, PermissionType};
    use crate::store::{AuthStore, MemoryStore};

    use super::Resolver;

    fn setup() -> (MemoryStore, Arc<PermissionCache>, Resolver<MemoryStore>) {
        let store = MemoryStore::new();
        let cache = Arc::new(PermissionCache::new());
        let resolver = Resolver::new(store.clone(), cache.clone());
        (store, cache, resolver)
    }

    struct Unfiled;

    impl DivisionContext for Unfiled {
        fn division_id(&self) -> Option<DivisionId> {
            None
        }
    }

    #[test]
    fn direct_grant() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        store
            .insert_permission(alpha.id(), alice.id(), PermissionType::Submit)
            .unwrap();

        assert!(
            resolver
                .has_permission(&alice, PermissionType::Submit, &alpha)
                .unwrap()
        );
        assert!(
            !resolver
                .has_permission(&alice, PermissionType::Review, &alpha)
                .unwrap()
        );
        assert!(
            resolver
                .has_permission(
                    &alice,
                    [PermissionType::Review, PermissionType::Submit],
                    &alpha
                )
                .unwrap()
        );
    }

    #[test]
    fn admin_implies_elevated_kinds_only() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        store
            .insert_permission(alpha.id(), alice.id(), PermissionType::Admin)
            .unwrap();

        assert!(
            resolver
                .has_permission(&alice, PermissionType::Review, &alpha)
                .unwrap()
        );
        assert!(
            resolver
                .has_permission(&alice, PermissionType::Pay, &alpha)
                .unwrap()
        );
        assert!(
            resolver
                .has_permission(&alice, [PermissionType::Review, PermissionType::Pay], &alpha)
                .unwrap()
        );
        assert!(
            !resolver
                .has_permission(&alice, PermissionType::Submit, &alpha)
                .unwrap()
        );
        // Mixed sets containing a non-elevated kind only match explicit grants.
        assert!(
            !resolver
                .has_permission(
                    &alice,
                    [PermissionType::Submit, PermissionType::Pay],
                    &alpha
                )
                .unwrap()
        );
    }

    #[test]
    fn any_division() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let _alpha = store.create_division("Alpha").unwrap();
        let beta = store.create_division("Beta").unwrap();

        assert!(
            !resolver
                .has_permission(&alice, PermissionType::Pay, Scope::Any)
                .unwrap()
        );
        store
            .insert_permission(beta.id(), alice.id(), PermissionType::Pay)
            .unwrap();
        // Direct store writes bypass invalidation, but nothing was cached for this key yet.
        assert!(
            resolver
                .has_permission(&alice, PermissionType::Pay, Some(beta.id()))
                .unwrap()
        );
    }

    #[test]
    fn errors() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();

        assert_matches!(
            resolver.has_permission_named(&alice, &["submit", "approve"], &alpha),
            Err(AuthError::UnknownPermissionKind(name)) if name == "approve"
        );
        assert_matches!(
            resolver.has_permission(&alice, PermissionType::Submit, &Unfiled),
            Err(AuthError::AmbiguousContext)
        );
        // The admin implication check runs first and must fail the same way.
        assert_matches!(
            resolver.has_permission(&alice, PermissionType::Review, &Unfiled),
            Err(AuthError::AmbiguousContext)
        );
        assert_matches!(
            resolver.has_permission(&alice, PermissionSet::empty(), Scope::Any),
            Err(AuthError::EmptyPermissionSet)
        );

        let ghost = NewEntity::group("ghost", "test").into_entity(EntityId::new(77));
        assert_matches!(
            resolver.has_permission(&ghost, PermissionType::Pay, Scope::Any),
            Err(AuthError::UnknownEntity(_))
        );
        assert_matches!(
            resolver.has_permission(&alice, PermissionType::Submit, DivisionId::new(404)),
            Err(AuthError::UnknownDivision(_))
        );
    }

    #[test]
    fn named_kinds() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        store
            .insert_permission(alpha.id(), alice.id(), PermissionType::Admin)
            .unwrap();

        assert!(
            resolver
                .has_permission_named(&alice, &["pay"], &alpha)
                .unwrap()
        );
        assert!(
            !resolver
                .has_permission_named(&alice, &["submit"], &alpha)
                .unwrap()
        );
    }

    #[test]
    fn results_are_cached() {
        let (store, cache, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();

        assert!(
            !resolver
                .has_permission(&alice, PermissionType::Submit, &alpha)
                .unwrap()
        );
        assert_eq!(cache.len(), 1);

        // Checking an elevated kind also memoizes the implied admin check.
        resolver
            .has_permission(&alice, PermissionType::Pay, &alpha)
            .unwrap();
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn stored_variant_decides_group_expansion() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let pilots = store.create_entity(NewEntity::group("pilots", "test")).unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        store.insert_membership(alice.id(), pilots.id()).unwrap();
        store
            .insert_permission(alpha.id(), pilots.id(), PermissionType::Submit)
            .unwrap();

        // Same id as alice but labelled as a group. Checking it first must not leave a wrong
        // answer in the cache for alice.
        let mislabelled = NewEntity::group("alice", "test").into_entity(alice.id());
        assert!(
            resolver
                .has_permission(&mislabelled, PermissionType::Submit, &alpha)
                .unwrap()
        );
        assert!(
            resolver
                .has_permission(&alice, PermissionType::Submit, &alpha)
                .unwrap()
        );
    }

    #[test]
    fn submit_divisions_are_sorted_and_unique() {
        let (store, _, resolver) = setup();
        let alice = store.create_entity(NewEntity::user("alice", "test")).unwrap();
        let pilots = store.create_entity(NewEntity::group("pilots", "test")).unwrap();
        let zulu = store.create_division("Zulu").unwrap();
        let alpha = store.create_division("Alpha").unwrap();
        let mike = store.create_division("Mike").unwrap();

        store.insert_membership(alice.id(), pilots.id()).unwrap();
        store
            .insert_permission(zulu.id(), alice.id(), PermissionType::Submit)
            .unwrap();
        store
            .insert_permission(alpha.id(), alice.id(), PermissionType::Submit)
            .unwrap();
        store
            .insert_permission(alpha.id(), pilots.id(), PermissionType::Submit)
            .unwrap();
        store
            .insert_permission(mike.id(), pilots.id(), PermissionType::Pay)
            .unwrap();

        let choices = resolver.submit_divisions(alice.as_user().unwrap()).unwrap();
        assert_eq!(
            choices,
            vec![
                (alpha.id(), "Alpha".to_string()),
                (zulu.id(), "Zulu".to_string())
            ]
        );
    }
}
