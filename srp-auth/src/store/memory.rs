// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence for authorization state.
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::division::{Division, DivisionId};
use crate::entity::{Entity, EntityId, NewEntity};
use crate::permission::{Permission, PermissionId, PermissionType};
use crate::store::AuthStore;

type GrantKey = (DivisionId, EntityId, PermissionType);

/// An in-memory store for entities, divisions, grants and membership pairs.
#[derive(Clone, Debug, Default)]
pub struct InnerMemoryStore {
    next_id: u64,
    entities: HashMap<EntityId, Entity>,
    divisions: HashMap<DivisionId, Division>,
    permissions: HashMap<GrantKey, Permission>,
    user_groups: HashMap<EntityId, HashSet<EntityId>>,
    group_users: HashMap<EntityId, HashSet<EntityId>>,
}

impl InnerMemoryStore {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// An in-memory store for authorization state.
///
/// `MemoryStore` supports usage in multi-threaded contexts by wrapping an `InnerMemoryStore`
/// with an `RwLock` and `Arc`. Clones share the same underlying state.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<InnerMemoryStore>>,
}

impl MemoryStore {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Obtain a read-lock on the store.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryStore> {
        self.inner
            .read()
            .expect("acquire shared read access on store")
    }

    /// Obtain a write-lock on the store.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryStore> {
        self.inner
            .write()
            .expect("acquire exclusive write access on store")
    }

    /// Record a membership pair on the user side only, leaving the store inconsistent.
    #[cfg(test)]
    pub(crate) fn insert_one_sided_membership(&self, user: EntityId, group: EntityId) {
        self.write_store()
            .user_groups
            .entry(user)
            .or_default()
            .insert(group);
    }
}

impl AuthStore for MemoryStore {
    type Error = Infallible;

    fn create_entity(&self, entity: NewEntity) -> Result<Entity, Self::Error> {
        let mut store = self.write_store();
        let id = EntityId::new(store.next_id());
        let entity = entity.into_entity(id);
        store.entities.insert(id, entity.clone());
        Ok(entity)
    }

    fn entity(&self, id: EntityId) -> Result<Option<Entity>, Self::Error> {
        Ok(self.read_store().entities.get(&id).cloned())
    }

    fn set_admin(&self, user: EntityId, admin: bool) -> Result<Option<Entity>, Self::Error> {
        let mut store = self.write_store();
        let Some(Entity::User(stored)) = store.entities.get_mut(&user) else {
            return Ok(None);
        };
        stored.admin = admin;
        Ok(Some(Entity::User(stored.clone())))
    }

    fn create_division(&self, name: &str) -> Result<Division, Self::Error> {
        let mut store = self.write_store();
        let id = DivisionId::new(store.next_id());
        let division = Division::new(id, name);
        store.divisions.insert(id, division.clone());
        Ok(division)
    }

    fn division(&self, id: DivisionId) -> Result<Option<Division>, Self::Error> {
        Ok(self.read_store().divisions.get(&id).cloned())
    }

    fn delete_division(&self, id: DivisionId) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        if store.divisions.remove(&id).is_none() {
            return Ok(false);
        }
        store
            .permissions
            .retain(|(division, _, _), _| *division != id);
        Ok(true)
    }

    fn insert_permission(
        &self,
        division: DivisionId,
        entity: EntityId,
        kind: PermissionType,
    ) -> Result<Option<(Permission, bool)>, Self::Error> {
        let mut store = self.write_store();
        if !store.divisions.contains_key(&division) {
            return Ok(None);
        }
        let key = (division, entity, kind);
        if let Some(existing) = store.permissions.get(&key) {
            return Ok(Some((existing.clone(), false)));
        }
        let id = PermissionId::new(store.next_id());
        let permission = Permission::new(id, division, entity, kind);
        store.permissions.insert(key, permission.clone());
        Ok(Some((permission, true)))
    }

    fn delete_permission(
        &self,
        division: DivisionId,
        entity: EntityId,
        kind: PermissionType,
    ) -> Result<Option<Permission>, Self::Error> {
        Ok(self
            .write_store()
            .permissions
            .remove(&(division, entity, kind)))
    }

    fn entity_permissions(
        &self,
        entity: EntityId,
        division: Option<DivisionId>,
    ) -> Result<HashSet<Permission>, Self::Error> {
        let store = self.read_store();
        let permissions = store
            .permissions
            .values()
            .filter(|permission| permission.entity() == entity)
            .filter(|permission| division.is_none_or(|id| permission.division() == id))
            .cloned()
            .collect();
        Ok(permissions)
    }

    fn division_permissions(
        &self,
        division: DivisionId,
    ) -> Result<HashSet<Permission>, Self::Error> {
        let store = self.read_store();
        let permissions = store
            .permissions
            .values()
            .filter(|permission| permission.division() == division)
            .cloned()
            .collect();
        Ok(permissions)
    }

    fn insert_membership(&self, user: EntityId, group: EntityId) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        let inserted = store.user_groups.entry(user).or_default().insert(group);
        store.group_users.entry(group).or_default().insert(user);
        Ok(inserted)
    }

    fn delete_membership(&self, user: EntityId, group: EntityId) -> Result<bool, Self::Error> {
        let mut store = self.write_store();
        let removed = store
            .user_groups
            .get_mut(&user)
            .is_some_and(|groups| groups.remove(&group));
        if let Some(users) = store.group_users.get_mut(&group) {
            users.remove(&user);
        }
        Ok(removed)
    }

    fn group_ids(&self, user: EntityId) -> Result<HashSet<EntityId>, Self::Error> {
        Ok(self
            .read_store()
            .user_groups
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    fn member_ids(&self, group: EntityId) -> Result<HashSet<EntityId>, Self::Error> {
        Ok(self
            .read_store()
            .group_users
            .get(&group)
            .cloned()
            .unwrap_or_default())
    }
}
