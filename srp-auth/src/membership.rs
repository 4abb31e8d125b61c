// SPDX-License-Identifier: MIT OR Apache-2.0

//! Many-to-many membership relation between users and groups.
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::PermissionCache;
use crate::entity::{Entity, EntityId, Group, User};
use crate::error::AuthError;
use crate::store::AuthStore;

/// Index of which users belong to which groups.
///
/// Membership changes alter group-derived permission answers and therefore invalidate the
/// shared permission cache.
#[derive(Clone, Debug)]
pub struct Membership<S> {
    store: S,
    cache: Arc<PermissionCache>,
}

impl<S> Membership<S>
where
    S: AuthStore,
{
    pub fn new(store: S, cache: Arc<PermissionCache>) -> Self {
        Self { store, cache }
    }

    /// Add a user to a group.
    ///
    /// Returns `false` if the user was a member already.
    pub fn add_member(&self, user: &User, group: &Group) -> Result<bool, AuthError<S::Error>> {
        self.ensure_user(user.id())?;
        self.ensure_group(group.id())?;

        self.cache
            .invalidate_with(|| -> Result<_, AuthError<S::Error>> {
                let inserted = self
                    .store
                    .insert_membership(user.id(), group.id())
                    .map_err(AuthError::Store)?;

                if inserted {
                    debug!(user = %user.id(), group = %group.id(), "added group member");
                }

                Ok((inserted, inserted))
            })
    }

    /// Remove a user from a group.
    ///
    /// Returns `false` if the user was not a member.
    pub fn remove_member(&self, user: &User, group: &Group) -> Result<bool, AuthError<S::Error>> {
        self.cache
            .invalidate_with(|| -> Result<_, AuthError<S::Error>> {
                let removed = self
                    .store
                    .delete_membership(user.id(), group.id())
                    .map_err(AuthError::Store)?;

                if removed {
                    debug!(user = %user.id(), group = %group.id(), "removed group member");
                }

                Ok((removed, removed))
            })
    }

    /// All users which are members of the group.
    pub fn members_of(&self, group: &Group) -> Result<HashSet<User>, AuthError<S::Error>> {
        let user_ids = self
            .store
            .member_ids(group.id())
            .map_err(AuthError::Store)?;

        let mut users = HashSet::with_capacity(user_ids.len());
        for user_id in user_ids {
            let group_ids = self.store.group_ids(user_id).map_err(AuthError::Store)?;
            if !group_ids.contains(&group.id()) {
                return Err(AuthError::InconsistentMembership {
                    user: user_id,
                    group: group.id(),
                });
            }
            users.insert(self.ensure_user(user_id)?);
        }

        Ok(users)
    }

    /// All groups the user is a member of.
    pub fn groups_of(&self, user: &User) -> Result<HashSet<Group>, AuthError<S::Error>> {
        group_ids_of(&self.store, user.id())?
            .into_iter()
            .map(|group_id| self.ensure_group(group_id))
            .collect()
    }

    fn ensure_user(&self, id: EntityId) -> Result<User, AuthError<S::Error>> {
        match self.store.entity(id).map_err(AuthError::Store)? {
            Some(Entity::User(user)) => Ok(user),
            Some(Entity::Group(_)) => Err(AuthError::NotAUser(id)),
            None => Err(AuthError::UnknownEntity(id)),
        }
    }

    fn ensure_group(&self, id: EntityId) -> Result<Group, AuthError<S::Error>> {
        match self.store.entity(id).map_err(AuthError::Store)? {
            Some(Entity::Group(group)) => Ok(group),
            Some(Entity::User(_)) => Err(AuthError::NotAGroup(id)),
            None => Err(AuthError::UnknownEntity(id)),
        }
    }
}

/// Ids of all groups the user belongs to, checked against the inverse side of the relation.
pub(crate) fn group_ids_of<S>(
    store: &S,
    user: EntityId,
) -> Result<HashSet<EntityId>, AuthError<S::Error>>
where
    S: AuthStore,
{
    let group_ids = store.group_ids(user).map_err(AuthError::Store)?;

    for group_id in &group_ids {
        let member_ids = store.member_ids(*group_id).map_err(AuthError::Store)?;
        if !member_ids.contains(&user) {
            return Err(AuthError::InconsistentMembership {
                user,
                group: *group_id,
            });
        }
    }

    Ok(group_ids)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::cache::{CacheKey, PermissionCache};
    use crate::entity::{Entity, NewEntity};
    use crate::error::AuthError;
    use crate::permission::{PermissionSet, PermissionType};
    use crate::store::{AuthStore, MemoryStore};

    use super::Membership;

    fn setup() -> (MemoryStore, Arc<PermissionCache>, Membership<MemoryStore>) {
        let store = MemoryStore::new();
        let cache = Arc::new(PermissionCache::new());
        let membership = Membership::new(store.clone(), cache.clone());
        (store, cache, membership)
    }

    fn create(store: &MemoryStore, entity: NewEntity) -> Entity {
        store.create_entity(entity).unwrap()
    }

    #[test]
    fn both_sides_stay_consistent() {
        let (store, _, membership) = setup();
        let alice = create(&store, NewEntity::user("alice", "test"));
        let bob = create(&store, NewEntity::user("bob", "test"));
        let pilots = create(&store, NewEntity::group("pilots", "test"));
        let alice = alice.as_user().unwrap();
        let bob = bob.as_user().unwrap();
        let pilots = pilots.as_group().unwrap();

        assert!(membership.add_member(alice, pilots).unwrap());
        assert!(membership.add_member(bob, pilots).unwrap());
        assert!(!membership.add_member(bob, pilots).unwrap());

        assert_eq!(
            membership.members_of(pilots).unwrap(),
            HashSet::from([alice.clone(), bob.clone()])
        );
        assert_eq!(
            membership.groups_of(alice).unwrap(),
            HashSet::from([pilots.clone()])
        );

        assert!(membership.remove_member(alice, pilots).unwrap());
        assert!(!membership.remove_member(alice, pilots).unwrap());
        assert_eq!(
            membership.members_of(pilots).unwrap(),
            HashSet::from([bob.clone()])
        );
        assert!(membership.groups_of(alice).unwrap().is_empty());
    }

    #[test]
    fn rejects_unknown_entities() {
        let (store, _, membership) = setup();
        let pilots = create(&store, NewEntity::group("pilots", "test"));

        // A user which was never persisted in this store.
        let ghost = NewEntity::user("ghost", "test").into_entity(crate::EntityId::new(404));

        assert_matches!(
            membership.add_member(ghost.as_user().unwrap(), pilots.as_group().unwrap()),
            Err(AuthError::UnknownEntity(_))
        );
    }

    #[test]
    fn detects_one_sided_membership() {
        let (store, _, membership) = setup();
        let alice = create(&store, NewEntity::user("alice", "test"));
        let pilots = create(&store, NewEntity::group("pilots", "test"));

        store.insert_one_sided_membership(alice.id(), pilots.id());

        let result = membership.groups_of(alice.as_user().unwrap());
        assert_matches!(result, Err(AuthError::InconsistentMembership { .. }));
        assert!(result.unwrap_err().is_invariant_violation());
    }

    #[test]
    fn changes_invalidate_cache() {
        let (store, cache, membership) = setup();
        let alice = create(&store, NewEntity::user("alice", "test"));
        let pilots = create(&store, NewEntity::group("pilots", "test"));

        let key = CacheKey::new(alice.id(), PermissionSet::from(PermissionType::Pay), None);
        cache.store(key, false, cache.generation());

        membership
            .add_member(alice.as_user().unwrap(), pilots.as_group().unwrap())
            .unwrap();
        assert_eq!(cache.lookup(&key), None);

        cache.store(key, true, cache.generation());
        membership
            .remove_member(alice.as_user().unwrap(), pilots.as_group().unwrap())
            .unwrap();
        assert_eq!(cache.lookup(&key), None);
    }
}
