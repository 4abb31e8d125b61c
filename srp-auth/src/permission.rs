// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{Debug, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::division::DivisionId;
use crate::entity::EntityId;

/// The kinds of permission which can be granted to an entity within a division.
///
/// Holding `Admin` in a division implies holding every kind of the [elevated
/// subset](PermissionType::ELEVATED) there as well. The implication is evaluated when permissions
/// are resolved, it is never materialised as extra grants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum PermissionType {
    /// Permission to submit requests to a division.
    Submit,

    /// Permission to review requests in a division.
    Review,

    /// Permission to pay out approved requests in a division.
    Pay,

    /// Permission to administer a division.
    Admin,
}

impl PermissionType {
    /// All permission kinds.
    pub const ALL: [PermissionType; 4] = [
        PermissionType::Submit,
        PermissionType::Review,
        PermissionType::Pay,
        PermissionType::Admin,
    ];

    /// Permission kinds implied by holding `Admin`.
    pub const ELEVATED: PermissionSet =
        PermissionSet(PermissionType::Review.bit() | PermissionType::Pay.bit());

    const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Return true if holding `Admin` implies this kind.
    pub fn is_elevated(self) -> bool {
        PermissionType::ELEVATED.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Submit => "submit",
            PermissionType::Review => "review",
            PermissionType::Pay => "pay",
            PermissionType::Admin => "admin",
        }
    }
}

// The admin implication recurses into an `Admin` check. If `Admin` was part of the elevated
// subset that check would never terminate.
const _: () = assert!(!PermissionType::ELEVATED.contains(PermissionType::Admin));

impl Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A permission kind name which is not part of the [`PermissionType`] enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown permission kind: {0}")]
pub struct UnknownPermissionKind(pub String);

impl FromStr for PermissionType {
    type Err = UnknownPermissionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownPermissionKind(s.to_string()))
    }
}

/// An immutable set of permission kinds.
///
/// Permission checks succeed when the entity holds _any_ of the kinds in the set. The set is cheap
/// to copy and hash which makes it suitable as part of a cache key.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn contains(&self, kind: PermissionType) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Return true if every kind in this set is also part of the other set.
    pub const fn is_subset(&self, other: &PermissionSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn insert(&mut self, kind: PermissionType) {
        self.0 |= kind.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionType> + '_ {
        PermissionType::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }

    /// Parse a set from permission kind names, failing on the first unknown name.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownPermissionKind> {
        names
            .iter()
            .map(|name| name.as_ref().parse::<PermissionType>())
            .collect()
    }
}

impl Debug for PermissionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<PermissionType> for PermissionSet {
    fn from(kind: PermissionType) -> Self {
        Self(kind.bit())
    }
}

impl<const N: usize> From<[PermissionType; N]> for PermissionSet {
    fn from(kinds: [PermissionType; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl From<&[PermissionType]> for PermissionSet {
    fn from(kinds: &[PermissionType]) -> Self {
        kinds.iter().copied().collect()
    }
}

impl FromIterator<PermissionType> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = PermissionType>>(iter: T) -> Self {
        let mut set = PermissionSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

/// Unique identifier of a permission grant record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PermissionId(u64);

impl PermissionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// A grant of one permission kind to one entity within one division.
///
/// At most one grant exists per (division, entity, kind) triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Permission {
    id: PermissionId,
    division: DivisionId,
    entity: EntityId,
    kind: PermissionType,
}

impl Permission {
    pub fn new(
        id: PermissionId,
        division: DivisionId,
        entity: EntityId,
        kind: PermissionType,
    ) -> Self {
        Self {
            id,
            division,
            entity,
            kind,
        }
    }

    pub fn id(&self) -> PermissionId {
        self.id
    }

    pub fn division(&self) -> DivisionId {
        self.division
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn kind(&self) -> PermissionType {
        self.kind
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Permission('{}', entity {}, division {})",
            self.kind, self.entity, self.division
        )
    }
}
