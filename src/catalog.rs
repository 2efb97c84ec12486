//! The catalog: every known placement of every motif identity.

use std::collections::BTreeMap;

use crate::arena::NodeHandle;
use crate::error::{LayoutError, Result};
use crate::index::GroupRef;
use crate::numeric::EVector;
use crate::tree::GroupId;

/// One placement of a motif.
#[derive(Debug, Clone)]
pub struct GroupPair {
    pub id: GroupId,
    /// Node realizing the motif: a tree leaf for single terminals, a group
    /// node for composites.
    pub node: NodeHandle,
    /// Tree leaf at the placement's lower-left corner.
    pub anchor: NodeHandle,
    /// Absolute lower-left corner.
    pub location: EVector,
}

impl GroupPair {
    #[inline]
    pub fn group_ref(&self) -> GroupRef {
        GroupRef {
            id: self.id,
            node: self.node,
        }
    }
}

/// Multimap from identity to placements, ordered by identity.
///
/// Identities with no placements are dropped, so `len` counts only motifs
/// currently present.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<GroupId, Vec<GroupPair>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placement. A second placement of the same identity at an
    /// interval-equal location is rejected.
    pub fn register(&mut self, pair: GroupPair) -> Result<()> {
        let pairs = self.entries.entry(pair.id).or_default();
        if pairs.iter().any(|p| p.location.planar_eq(&pair.location)) {
            return Err(LayoutError::structural(
                "catalog",
                format!("group {} already placed at {}", pair.id, pair.location),
            ));
        }
        pairs.push(pair);
        Ok(())
    }

    /// Removes and returns the placement of `id` at `location`.
    pub fn unregister(&mut self, id: GroupId, location: &EVector) -> Result<GroupPair> {
        let missing = || {
            LayoutError::structural("catalog", format!("no placement of {id} at {location}"))
        };
        let pairs = self.entries.get_mut(&id).ok_or_else(missing)?;
        let pos = pairs
            .iter()
            .position(|p| p.location.planar_eq(location))
            .ok_or_else(missing)?;
        let pair = pairs.remove(pos);
        if pairs.is_empty() {
            self.entries.remove(&id);
        }
        Ok(pair)
    }

    /// Placements of `id`; empty if unknown.
    pub fn placements(&self, id: GroupId) -> &[GroupPair] {
        self.entries.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, id: GroupId, location: &EVector) -> Option<&GroupPair> {
        self.placements(id)
            .iter()
            .find(|p| p.location.planar_eq(location))
    }

    pub fn contains(&self, id: GroupId, location: &EVector) -> bool {
        self.find(id, location).is_some()
    }

    pub fn contains_id(&self, id: GroupId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Identities with exactly one placement.
    pub fn singletons(&self) -> Vec<GroupId> {
        self.entries
            .iter()
            .filter(|(_, pairs)| pairs.len() == 1)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &[GroupPair])> {
        self.entries.iter().map(|(id, pairs)| (*id, pairs.as_slice()))
    }

    /// Every placement, ordered by identity then insertion.
    pub fn pairs(&self) -> impl Iterator<Item = &GroupPair> {
        self.entries.values().flatten()
    }

    /// Number of identities present.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn placement_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::NodeArena;

    fn pair(id: u32, node: NodeHandle, x: f32) -> GroupPair {
        GroupPair {
            id: GroupId::new(id),
            node,
            anchor: node,
            location: EVector::with_error(x, 0.0, 0.0, 1e-6),
        }
    }

    #[test]
    fn register_and_unregister() {
        let mut arena = NodeArena::new();
        let h: Vec<_> = (0..3).map(|_| arena.allocate(())).collect();
        let mut catalog = Catalog::new();
        catalog.register(pair(1, h[0], 0.0)).unwrap();
        catalog.register(pair(1, h[1], 1.0)).unwrap();
        catalog.register(pair(2, h[2], 2.0)).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.placement_count(), 3);
        assert_eq!(catalog.singletons(), vec![GroupId::new(2)]);
        assert!(catalog.contains(GroupId::new(1), &pair(1, h[0], 1.0).location));

        let removed = catalog.unregister(GroupId::new(2), &pair(2, h[2], 2.0).location).unwrap();
        assert_eq!(removed.node, h[2]);
        assert!(!catalog.contains_id(GroupId::new(2)));
        assert!(catalog.placements(GroupId::new(2)).is_empty());
        assert_eq!(catalog.pairs().count(), 2);
    }

    #[test]
    fn duplicate_placement_is_rejected() {
        let mut arena = NodeArena::new();
        let a = arena.allocate(());
        let b = arena.allocate(());
        let mut catalog = Catalog::new();
        catalog.register(pair(1, a, 0.0)).unwrap();
        assert!(catalog.register(pair(1, b, 0.0)).is_err());
    }

    #[test]
    fn missing_placement_is_structural() {
        let mut catalog = Catalog::new();
        let err = catalog
            .unregister(GroupId::new(5), &EVector::zero())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StructuralInconsistency);
    }
}
