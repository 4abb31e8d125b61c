// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::{HashMap, HashSet};
use std::ops::Index;

use crate::division::Division;
use crate::entity::EntityId;
use crate::permission::{Permission, PermissionType};

/// Grants of one division grouped by their kind.
///
/// Answers "who may submit, review or pay in this division" for administration purposes. The
/// view is a snapshot taken from the store when it was built and never goes through the cache.
/// The admin implication is not applied here, only explicit grants are listed.
#[derive(Clone, Debug)]
pub struct DivisionPermissions {
    division: Division,
    by_kind: HashMap<PermissionType, HashSet<Permission>>,
}

impl DivisionPermissions {
    pub(crate) fn new(division: Division, permissions: HashSet<Permission>) -> Self {
        let mut by_kind: HashMap<PermissionType, HashSet<Permission>> = PermissionType::ALL
            .into_iter()
            .map(|kind| (kind, HashSet::new()))
            .collect();

        for permission in permissions {
            by_kind
                .entry(permission.kind())
                .or_default()
                .insert(permission);
        }

        Self { division, by_kind }
    }

    pub fn division(&self) -> &Division {
        &self.division
    }

    /// Grants of the given kind.
    pub fn get(&self, kind: PermissionType) -> &HashSet<Permission> {
        &self[kind]
    }

    /// Ids of all entities holding an explicit grant of the given kind.
    pub fn entities(&self, kind: PermissionType) -> HashSet<EntityId> {
        self[kind].iter().map(|permission| permission.entity()).collect()
    }

    /// Total number of grants in this division.
    pub fn len(&self) -> usize {
        self.by_kind.values().map(|grants| grants.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Index<PermissionType> for DivisionPermissions {
    type Output = HashSet<Permission>;

    fn index(&self, kind: PermissionType) -> &Self::Output {
        // Every kind is inserted on construction.
        &self.by_kind[&kind]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::division::{Division, DivisionId};
    use crate::entity::EntityId;
    use crate::permission::{Permission, PermissionId, PermissionType};

    use super::DivisionPermissions;

    #[test]
    fn groups_grants_by_kind() {
        let division = Division::new(DivisionId::new(1), "Alpha");
        let grant = |id: u64, entity: u64, kind: PermissionType| {
            Permission::new(
                PermissionId::new(id),
                division.id(),
                EntityId::new(entity),
                kind,
            )
        };

        let view = DivisionPermissions::new(
            division.clone(),
            HashSet::from([
                grant(10, 1, PermissionType::Submit),
                grant(11, 2, PermissionType::Submit),
                grant(12, 2, PermissionType::Pay),
            ]),
        );

        assert_eq!(view.division(), &division);
        assert_eq!(view.len(), 3);
        assert_eq!(
            view.entities(PermissionType::Submit),
            HashSet::from([EntityId::new(1), EntityId::new(2)])
        );
        assert_eq!(view[PermissionType::Pay].len(), 1);
        assert!(view.get(PermissionType::Review).is_empty());
        assert!(view[PermissionType::Admin].is_empty());
    }
}
