// SPDX-License-Identifier: MIT OR Apache-2.0

//! Principals which can be granted permissions: individual users and groups of users.
use std::fmt::Display;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier of an entity, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntityId(u64);

impl EntityId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag naming the authentication mechanism which vouches for an entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuthMethod(String);

impl AuthMethod {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AuthMethod {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminator of an [`Entity`], fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EntityKind {
    User,
    Group,
}

/// An individual who can submit, review and/or pay out requests.
#[derive(Clone, Debug)]
pub struct User {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) authmethod: AuthMethod,
    pub(crate) admin: bool,
}

impl User {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authmethod(&self) -> &AuthMethod {
        &self.authmethod
    }

    /// Site administrators may create and administer divisions. This flag lives outside of the
    /// permission grant mechanism and has no influence on permission checks.
    pub fn is_admin(&self) -> bool {
        self.admin
    }
}

/// A set of users. Permissions granted to a group apply to all of its members.
///
/// Groups never contain other groups.
#[derive(Clone, Debug)]
pub struct Group {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) authmethod: AuthMethod,
}

impl Group {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn authmethod(&self) -> &AuthMethod {
        &self.authmethod
    }
}

// Users and groups are identified by their id, never by their content.
macro_rules! identity_by_id {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.name)
            }
        }
    };
}

identity_by_id!(User);
identity_by_id!(Group);

/// A principal which can hold permission grants.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Entity {
    User(User),
    Group(Group),
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::User(user) => user.id,
            Entity::Group(group) => group.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::User(user) => &user.name,
            Entity::Group(group) => &group.name,
        }
    }

    pub fn authmethod(&self) -> &AuthMethod {
        match self {
            Entity::User(user) => &user.authmethod,
            Entity::Group(group) => &group.authmethod,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Group(_) => EntityKind::Group,
        }
    }

    /// Return true if this entity is an individual user.
    pub fn is_user(&self) -> bool {
        matches!(self, Entity::User(_))
    }

    /// Return true if this entity is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, Entity::Group(_))
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Entity::User(user) => Some(user),
            Entity::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Entity::User(_) => None,
            Entity::Group(group) => Some(group),
        }
    }
}

impl From<User> for Entity {
    fn from(user: User) -> Self {
        Entity::User(user)
    }
}

impl From<Group> for Entity {
    fn from(group: Group) -> Self {
        Entity::Group(group)
    }
}

impl Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An entity which was not persisted yet and therefore has no id.
#[derive(Clone, Debug)]
pub struct NewEntity {
    kind: EntityKind,
    name: String,
    authmethod: AuthMethod,
    admin: bool,
}

impl NewEntity {
    pub fn user(name: impl Into<String>, authmethod: impl Into<AuthMethod>) -> Self {
        Self {
            kind: EntityKind::User,
            name: name.into(),
            authmethod: authmethod.into(),
            admin: false,
        }
    }

    pub fn group(name: impl Into<String>, authmethod: impl Into<AuthMethod>) -> Self {
        Self {
            kind: EntityKind::Group,
            name: name.into(),
            authmethod: authmethod.into(),
            admin: false,
        }
    }

    /// Mark a new user as site administrator. Ignored for groups.
    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turn the draft into an entity with the id assigned by the store.
    pub fn into_entity(self, id: EntityId) -> Entity {
        match self.kind {
            EntityKind::User => Entity::User(User {
                id,
                name: self.name,
                authmethod: self.authmethod,
                admin: self.admin,
            }),
            EntityKind::Group => Entity::Group(Group {
                id,
                name: self.name,
                authmethod: self.authmethod,
            }),
        }
    }
}
