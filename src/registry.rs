//! Identity registry: one canonical [`NodeValue`] per distinct motif.
//!
//! Leaves are keyed by label. Composites are keyed by the fingerprint of
//! their axis and component identities. Either way the first sighting mints a
//! fresh [`GroupId`] and later sightings receive the same `Rc`, after a
//! structural agreement check.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::error::{LayoutError, Result};
use crate::fingerprint::{leaf_fingerprint, pattern_fingerprint, HashValue};
use crate::numeric::{Axis, EVector};
use crate::tree::{GroupId, NodeValue};

#[derive(Debug, Default)]
pub struct Registry {
    values: BTreeMap<GroupId, Rc<NodeValue>>,
    by_name: HashMap<String, GroupId>,
    by_fingerprint: HashMap<HashValue, GroupId>,
    next_id: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self, id: GroupId) -> Option<&Rc<NodeValue>> {
        self.values.get(&id)
    }

    /// Like [`value`](Self::value) but an unknown identity is a structural error.
    pub fn expect_value(&self, id: GroupId) -> Result<&Rc<NodeValue>> {
        self.values
            .get(&id)
            .ok_or_else(|| LayoutError::structural("registry", format!("unknown identity {id}")))
    }

    pub fn id_of(&self, name: &str) -> Option<GroupId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Rc<NodeValue>> {
        self.id_of(name).and_then(|id| self.values.get(&id))
    }

    /// Number of identities ever minted.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<NodeValue>> {
        self.values.values()
    }

    /// Canonical value for a leaf labelled `name` with extent `size`.
    ///
    /// A repeated label must agree with the first sighting's extent.
    pub fn register_leaf(&mut self, name: &str, size: EVector) -> Result<Rc<NodeValue>> {
        let candidate = NodeValue {
            id: GroupId::new(0),
            name: name.to_string(),
            terminals: 1,
            size,
            axis: None,
            children: Vec::new(),
        };
        self.canonicalize(leaf_fingerprint(name), candidate)
    }

    /// Canonical value for `children` laid side by side along `axis`.
    ///
    /// Components must agree on their extent across `axis`. When `declared`
    /// is given (a tree branch's bounding box) it must match the summed extent.
    pub fn intern_composite(
        &mut self,
        axis: Axis,
        children: &[Rc<NodeValue>],
        declared: Option<&EVector>,
    ) -> Result<Rc<NodeValue>> {
        let first = children.first().ok_or_else(|| {
            LayoutError::structural("registry", "composite motif without components")
        })?;
        let across = axis.other();
        let mut size = first.size;
        for c in &children[1..] {
            if !c.size[across].interval_eq(&first.size[across]) {
                return Err(LayoutError::structural(
                    "registry",
                    format!(
                        "components {} and {} disagree across {axis}: {} vs {}",
                        first.name,
                        c.name,
                        first.size[across].value(),
                        c.size[across].value()
                    ),
                ));
            }
            size[axis] = size[axis] + c.size[axis];
        }
        if let Some(declared) = declared {
            if !declared.planar_eq(&size) {
                return Err(LayoutError::structural(
                    "registry",
                    format!("declared size {declared} disagrees with component sum {size}"),
                ));
            }
        }

        let ids: Vec<GroupId> = children.iter().map(|c| c.id).collect();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        let candidate = NodeValue {
            id: GroupId::new(0),
            name: format!("{}[{}]", axis.symbol(), names.join(",")),
            terminals: children.iter().map(|c| c.terminals).sum(),
            size,
            axis: Some(axis),
            children: ids,
        };
        self.canonicalize(pattern_fingerprint(axis, &candidate.children), candidate)
    }

    /// Returns the canonical value for `candidate`, minting an identity on
    /// first sighting.
    fn canonicalize(&mut self, key: HashValue, mut candidate: NodeValue) -> Result<Rc<NodeValue>> {
        if let Some(id) = self.by_fingerprint.get(&key) {
            let canonical = self.expect_value(*id)?;
            if !canonical.same_structure(&candidate) {
                return Err(LayoutError::structural(
                    "registry",
                    format!(
                        "{} redefined: size {} vs {}",
                        candidate.name, canonical.size, candidate.size
                    ),
                ));
            }
            return Ok(Rc::clone(canonical));
        }
        if let Some(other) = self.by_name.get(&candidate.name) {
            return Err(LayoutError::structural(
                "registry",
                format!("name {} already bound to {other}", candidate.name),
            ));
        }

        let id = GroupId::new(self.next_id);
        self.next_id += 1;
        candidate.id = id;
        debug!(%id, name = %candidate.name, terminals = candidate.terminals, "minted motif identity");
        let value = Rc::new(candidate);
        self.by_name.insert(value.name.clone(), id);
        self.by_fingerprint.insert(key, id);
        self.values.insert(id, Rc::clone(&value));
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: f32, h: f32) -> EVector {
        EVector::with_error(w, h, 0.0, 1e-6)
    }

    #[test]
    fn leaves_are_canonical_by_label() {
        let mut reg = Registry::new();
        let a1 = reg.register_leaf("A", size(1.0, 2.0)).unwrap();
        let a2 = reg.register_leaf("A", size(1.0, 2.0)).unwrap();
        let b = reg.register_leaf("B", size(1.0, 2.0)).unwrap();
        assert!(Rc::ptr_eq(&a1, &a2));
        assert_ne!(a1.id, b.id);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.id_of("B"), Some(b.id));
    }

    #[test]
    fn leaf_redefinition_is_rejected() {
        let mut reg = Registry::new();
        reg.register_leaf("A", size(1.0, 2.0)).unwrap();
        let err = reg.register_leaf("A", size(3.0, 2.0)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StructuralInconsistency);
    }

    #[test]
    fn composites_intern_by_components() {
        let mut reg = Registry::new();
        let a = reg.register_leaf("A", size(1.0, 1.0)).unwrap();
        let b = reg.register_leaf("B", size(2.0, 1.0)).unwrap();
        let ab = reg.intern_composite(Axis::X, &[a.clone(), b.clone()], None).unwrap();
        assert_eq!(ab.name, "x[A,B]");
        assert_eq!(ab.terminals, 2);
        assert!(ab.size.x.interval_eq(&crate::numeric::EFloat::ordinary(3.0)));
        let again = reg
            .intern_composite(Axis::X, &[a.clone(), b.clone()], Some(&size(3.0, 1.0)))
            .unwrap();
        assert!(Rc::ptr_eq(&ab, &again));
        let ba = reg.intern_composite(Axis::X, &[b, a], None).unwrap();
        assert_ne!(ab.id, ba.id);
    }

    #[test]
    fn composite_components_must_align() {
        let mut reg = Registry::new();
        let a = reg.register_leaf("A", size(1.0, 1.0)).unwrap();
        let tall = reg.register_leaf("T", size(1.0, 2.0)).unwrap();
        assert!(reg.intern_composite(Axis::X, &[a.clone(), tall], None).is_err());
        assert!(reg
            .intern_composite(Axis::X, &[a.clone(), a], Some(&size(5.0, 1.0)))
            .is_err());
        assert!(reg.intern_composite(Axis::Y, &[], None).is_err());
    }

    #[test]
    fn identities_are_never_reused() {
        let mut reg = Registry::new();
        let ids: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|n| reg.register_leaf(n, size(1.0, 1.0)).unwrap().id)
            .collect();
        assert_eq!(ids, vec![GroupId::new(0), GroupId::new(1), GroupId::new(2)]);
    }
}
