// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission model and cached permission resolution for reimbursement divisions.
//!
//! Principals are [`Entity`] values: either an individual [`User`] or a [`Group`] of users.
//! Entities are granted [`PermissionType`]s (submit, review, pay, admin) within a [`Division`].
//! Divisions are independent namespaces, a grant in one division never affects another.
//!
//! ## Resolving permissions
//!
//! The [`Resolver`] answers whether an entity holds _any_ of a set of permission kinds within a
//! division, or within any division. An entity holds a kind when
//!
//! - it was granted the kind directly,
//! - it is a user and one of its groups was granted the kind (groups do not nest), or
//! - the kind belongs to the elevated subset (review, pay) and the entity holds `Admin` in the
//!   same scope.
//!
//! ```rust
//! # use srp_auth::{Authorizer, Config, Entity, MemoryStore, PermissionType, Scope};
//! # fn run() -> Result<(), srp_auth::AuthError<std::convert::Infallible>> {
//! let authorizer = Authorizer::new(MemoryStore::new(), Config::default());
//!
//! let alpha = authorizer.create_division("Alpha")?;
//! let beta = authorizer.create_division("Beta")?;
//! let user: Entity = authorizer.create_user("U1", "test")?.into();
//!
//! authorizer.grant(&alpha, &user, PermissionType::Submit)?;
//! assert!(authorizer.has_permission(&user, PermissionType::Submit, &alpha)?);
//! assert!(!authorizer.has_permission(&user, PermissionType::Submit, &beta)?);
//! assert!(authorizer.has_permission(&user, PermissionType::Submit, Scope::Any)?);
//!
//! // Admin implies review and pay.
//! authorizer.grant(&alpha, &user, PermissionType::Admin)?;
//! assert!(authorizer.has_permission(&user, PermissionType::Pay, &alpha)?);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! ## Caching
//!
//! Results are memoized in a [`PermissionCache`] shared by everything an [`Authorizer`] owns.
//! Every grant, revoke, membership change or division removal drops the whole cache before the
//! mutating call returns, so a check never observes an answer computed before the mutation.
//!
//! ## Persistence
//!
//! State lives behind the [`AuthStore`] trait. [`MemoryStore`] is an in-memory implementation
//! which can be shared between threads.
mod authorizer;
pub mod cache;
mod config;
mod division;
mod entity;
mod error;
pub mod grants;
pub mod membership;
mod permission;
pub mod resolver;
pub mod store;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod view;

pub use authorizer::Authorizer;
pub use cache::{CacheKey, Generation, PermissionCache};
pub use config::Config;
pub use division::{Division, DivisionContext, DivisionId, Scope};
pub use entity::{AuthMethod, Entity, EntityId, EntityKind, Group, NewEntity, User};
pub use error::AuthError;
pub use grants::GrantStore;
pub use membership::Membership;
pub use permission::{
    Permission, PermissionId, PermissionSet, PermissionType, UnknownPermissionKind,
};
pub use resolver::Resolver;
pub use store::{AuthStore, MemoryStore};
pub use view::DivisionPermissions;
