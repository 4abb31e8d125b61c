// SPDX-License-Identifier: MIT OR Apache-2.0

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for an [`Authorizer`](crate::Authorizer) instance.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Memoize permission check results until the next grant or membership change.
    pub(crate) cache_enabled: bool,

    /// Upper bound of memoized results. Reaching it drops all entries before the next insert, a
    /// bound of zero disables the cache.
    pub(crate) max_cache_entries: Option<usize>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            cache_enabled: true,
            max_cache_entries: None,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_max_cache_entries(mut self, max: usize) -> Self {
        self.max_cache_entries = Some(max);
        self
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub fn max_cache_entries(&self) -> Option<usize> {
        self.max_cache_entries
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
