// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoization of permission check results.
//!
//! Results are keyed by (entity, requested kinds, division or "any") and invalidated in bulk:
//! every grant, revoke or membership change drops _all_ entries. Entries do not track which
//! grants they were computed from.
//!
//! Lookups take a shared lock, invalidation takes the exclusive lock. Mutations of the underlying
//! data run inside [`PermissionCache::invalidate_with`], which holds the exclusive lock for the
//! whole mutation: no lookup can be answered between the store changing and the entries being
//! dropped. Filling a miss is guarded by a [`Generation`] which the caller observes _before_
//! querying the store. Invalidation bumps the generation, so a result computed from data which
//! was changed in the meantime is dropped instead of being stored.
use std::collections::HashMap;
use std::sync::RwLock;

use tracing::{debug, trace};

use crate::config::Config;
use crate::division::DivisionId;
use crate::entity::EntityId;
use crate::permission::PermissionSet;

/// Key of a memoized permission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub entity: EntityId,
    pub kinds: PermissionSet,
    pub division: Option<DivisionId>,
}

impl CacheKey {
    pub fn new(entity: EntityId, kinds: PermissionSet, division: Option<DivisionId>) -> Self {
        Self {
            entity,
            kinds,
            division,
        }
    }
}

/// Number of invalidations the cache went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

#[derive(Debug, Default)]
struct CacheState {
    generation: u64,
    entries: HashMap<CacheKey, bool>,
}

/// Shared cache of permission check results.
#[derive(Debug)]
pub struct PermissionCache {
    state: RwLock<CacheState>,
    enabled: bool,
    max_entries: Option<usize>,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::from_config(&Config::default())
    }

    pub fn from_config(config: &Config) -> Self {
        // A bound of zero entries leaves nothing to memoize.
        let enabled = config.cache_enabled() && config.max_cache_entries() != Some(0);
        Self {
            state: RwLock::new(CacheState::default()),
            enabled,
            max_entries: config.max_cache_entries(),
        }
    }

    /// Look up a memoized result.
    pub fn lookup(&self, key: &CacheKey) -> Option<bool> {
        if !self.enabled {
            return None;
        }

        let result = self
            .state
            .read()
            .expect("acquire shared read access on cache")
            .entries
            .get(key)
            .copied();

        match result {
            Some(value) => trace!(?key, value, "permission cache hit"),
            None => trace!(?key, "permission cache miss"),
        }

        result
    }

    /// Current generation. Must be read before the data a result is computed from.
    pub fn generation(&self) -> Generation {
        Generation(
            self.state
                .read()
                .expect("acquire shared read access on cache")
                .generation,
        )
    }

    /// Memoize a result which was computed during the given generation.
    ///
    /// Returns `false` when the result was discarded, either because the cache is disabled or
    /// because it was invalidated after `generation` was observed.
    pub fn store(&self, key: CacheKey, value: bool, generation: Generation) -> bool {
        if !self.enabled {
            return false;
        }

        let mut state = self
            .state
            .write()
            .expect("acquire exclusive write access on cache");

        if state.generation != generation.0 {
            trace!(?key, "discard permission check result from stale generation");
            return false;
        }

        if let Some(max) = self.max_entries {
            if state.entries.len() >= max && !state.entries.contains_key(&key) {
                debug!(max, "permission cache full, dropping all entries");
                state.entries.clear();
            }
        }

        state.entries.insert(key, value);
        true
    }

    /// Drop all memoized results.
    pub fn clear(&self) {
        let mut state = self
            .state
            .write()
            .expect("acquire exclusive write access on cache");
        Self::invalidate(&mut state);
    }

    /// Run a mutation of the data results are computed from while holding the exclusive lock.
    ///
    /// The mutation returns its output together with a flag telling whether anything changed.
    /// All memoized results are dropped before the lock is released if it did. A failed mutation
    /// leaves the cache untouched.
    ///
    /// The mutation must not call back into the cache.
    pub fn invalidate_with<T, E>(
        &self,
        mutation: impl FnOnce() -> Result<(T, bool), E>,
    ) -> Result<T, E> {
        let mut state = self
            .state
            .write()
            .expect("acquire exclusive write access on cache");
        let (output, changed) = mutation()?;
        if changed {
            Self::invalidate(&mut state);
        }
        Ok(output)
    }

    fn invalidate(state: &mut CacheState) {
        state.generation += 1;
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(generation = state.generation, dropped, "permission cache cleared");
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .expect("acquire shared read access on cache")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new()
    }
}
