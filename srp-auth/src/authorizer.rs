// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use tracing::debug;

use crate::cache::PermissionCache;
use crate::config::Config;
use crate::division::{Division, DivisionId, Scope};
use crate::entity::{AuthMethod, Entity, EntityId, Group, NewEntity, User};
use crate::error::AuthError;
use crate::grants::GrantStore;
use crate::membership::Membership;
use crate::permission::{Permission, PermissionSet, PermissionType};
use crate::resolver::Resolver;
use crate::store::AuthStore;

/// Entry point to the authorization core.
///
/// Owns one [`PermissionCache`] and hands it to the grant store, the membership index and the
/// resolver, so every mutation going through this instance invalidates the results all checks
/// read from. Clones share the same cache and store.
#[derive(Clone, Debug)]
pub struct Authorizer<S> {
    config: Config,
    store: S,
    cache: Arc<PermissionCache>,
    grants: GrantStore<S>,
    membership: Membership<S>,
    resolver: Resolver<S>,
}

impl<S> Authorizer<S>
where
    S: AuthStore,
{
    pub fn new(store: S, config: Config) -> Self {
        let cache = Arc::new(PermissionCache::from_config(&config));
        Self {
            grants: GrantStore::new(store.clone(), cache.clone()),
            membership: Membership::new(store.clone(), cache.clone()),
            resolver: Resolver::new(store.clone(), cache.clone()),
            config,
            store,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    pub fn grants(&self) -> &GrantStore<S> {
        &self.grants
    }

    pub fn membership(&self) -> &Membership<S> {
        &self.membership
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    /// Persist a new user or group.
    pub fn create_entity(&self, entity: NewEntity) -> Result<Entity, AuthError<S::Error>> {
        if entity.name().trim().is_empty() {
            return Err(AuthError::EmptyName);
        }
        let entity = self.store.create_entity(entity).map_err(AuthError::Store)?;
        debug!(id = %entity.id(), kind = ?entity.kind(), "created entity");
        Ok(entity)
    }

    pub fn create_user(
        &self,
        name: &str,
        authmethod: impl Into<AuthMethod>,
    ) -> Result<User, AuthError<S::Error>> {
        match self.create_entity(NewEntity::user(name, authmethod))? {
            Entity::User(user) => Ok(user),
            Entity::Group(group) => Err(AuthError::NotAUser(group.id())),
        }
    }

    pub fn create_group(
        &self,
        name: &str,
        authmethod: impl Into<AuthMethod>,
    ) -> Result<Group, AuthError<S::Error>> {
        match self.create_entity(NewEntity::group(name, authmethod))? {
            Entity::Group(group) => Ok(group),
            Entity::User(user) => Err(AuthError::NotAGroup(user.id())),
        }
    }

    pub fn entity(&self, id: EntityId) -> Result<Entity, AuthError<S::Error>> {
        self.store
            .entity(id)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownEntity(id))
    }

    /// Grant or withdraw site administrator rights. These are independent of permission grants,
    /// the cache is not affected.
    pub fn set_admin(&self, user: &User, admin: bool) -> Result<User, AuthError<S::Error>> {
        match self
            .store
            .set_admin(user.id(), admin)
            .map_err(AuthError::Store)?
        {
            Some(Entity::User(user)) => Ok(user),
            Some(Entity::Group(group)) => Err(AuthError::NotAUser(group.id())),
            None => Err(AuthError::UnknownEntity(user.id())),
        }
    }

    pub fn create_division(&self, name: &str) -> Result<Division, AuthError<S::Error>> {
        if name.trim().is_empty() {
            return Err(AuthError::EmptyName);
        }
        let division = self.store.create_division(name).map_err(AuthError::Store)?;
        debug!(id = %division.id(), name, "created division");
        Ok(division)
    }

    pub fn division(&self, id: DivisionId) -> Result<Division, AuthError<S::Error>> {
        self.store
            .division(id)
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownDivision(id))
    }

    /// Remove a division and every grant applying to it.
    pub fn remove_division(&self, division: &Division) -> Result<bool, AuthError<S::Error>> {
        self.cache
            .invalidate_with(|| -> Result<_, AuthError<S::Error>> {
                let removed = self
                    .store
                    .delete_division(division.id())
                    .map_err(AuthError::Store)?;

                if removed {
                    debug!(id = %division.id(), "removed division");
                }

                Ok((removed, removed))
            })
    }

    pub fn grant(
        &self,
        division: &Division,
        entity: &Entity,
        kind: PermissionType,
    ) -> Result<Permission, AuthError<S::Error>> {
        self.grants.grant(division, entity, kind)
    }

    pub fn revoke(
        &self,
        division: &Division,
        entity: &Entity,
        kind: PermissionType,
    ) -> Result<bool, AuthError<S::Error>> {
        self.grants.revoke(division, entity, kind)
    }

    pub fn add_member(&self, user: &User, group: &Group) -> Result<bool, AuthError<S::Error>> {
        self.membership.add_member(user, group)
    }

    pub fn remove_member(&self, user: &User, group: &Group) -> Result<bool, AuthError<S::Error>> {
        self.membership.remove_member(user, group)
    }

    /// See [`Resolver::has_permission`].
    pub fn has_permission<'a>(
        &self,
        entity: &Entity,
        kinds: impl Into<PermissionSet>,
        scope: impl Into<Scope<'a>>,
    ) -> Result<bool, AuthError<S::Error>> {
        self.resolver.has_permission(entity, kinds, scope)
    }
}
