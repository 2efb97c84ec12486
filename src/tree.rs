//! The subdivision tree and the motif values its nodes carry.
//!
//! A [`LayoutTree`] owns one arena holding two kinds of node:
//! - **tree** nodes, built from the input document, linked parent/child, each
//!   leaf carrying a [`WidthIndex`] and each branch a [`SplitIndex`];
//! - **group** nodes, synthesized by the composition engine, parentless and
//!   owned by exactly one catalog placement.
//!
//! Node positions are never stored. A tree node's origin is recovered by
//! summing split offsets from the root, which keeps every location traceable
//! to the input values.
//!
//! # Invariants
//! - A branch has `splits.len() + 1` children, splits strictly increasing and
//!   inside `(0, size[axis])`.
//! - Every tree child's `parent` points back at the branch listing it.
//! - Two nodes share a [`NodeValue`] (`Rc::ptr_eq`) iff they have the same
//!   motif identity.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::arena::{NodeArena, NodeHandle};
use crate::error::{LayoutError, Result};
use crate::index::{SplitIndex, WidthIndex};
use crate::numeric::{Axis, EFloat, EVector};

/// Motif identity. Minted by the registry, never reused.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u32);

impl GroupId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Canonical description of a motif, shared by every node realizing it.
#[derive(Debug, Clone)]
pub struct NodeValue {
    pub id: GroupId,
    /// Leaf label, or a synthesized `x[A,B]` / `y[A,B]` name for composites.
    pub name: String,
    /// Number of leaf rectangles covered.
    pub terminals: u32,
    pub size: EVector,
    /// Composition axis; `None` for leaves.
    pub axis: Option<Axis>,
    /// Component identities along `axis`, in order.
    pub children: Vec<GroupId>,
}

impl NodeValue {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.axis.is_none()
    }

    /// Structural agreement ignoring the identity number.
    pub fn same_structure(&self, other: &NodeValue) -> bool {
        self.name == other.name
            && self.terminals == other.terminals
            && self.axis == other.axis
            && self.children == other.children
            && self.size.planar_eq(&other.size)
    }
}

/// Whether a node came from the input tree or from composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Tree,
    Group,
}

/// Per-node lookup table, by node kind.
#[derive(Debug, Clone)]
pub enum NodeExt {
    Leaf(WidthIndex),
    Branch(SplitIndex),
    /// Group nodes are never looked up spatially.
    Detached,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    label: String,
    value: Rc<NodeValue>,
    role: NodeRole,
    size: EVector,
    axis: Option<Axis>,
    /// Offsets of the split lines from this node's origin along `axis`.
    splits: Vec<EFloat>,
    children: Vec<NodeHandle>,
    parent: Option<NodeHandle>,
    ext: NodeExt,
}

impl LayoutNode {
    pub fn tree_leaf(label: String, value: Rc<NodeValue>, size: EVector) -> Self {
        Self {
            label,
            value,
            role: NodeRole::Tree,
            size,
            axis: None,
            splits: Vec::new(),
            children: Vec::new(),
            parent: None,
            ext: NodeExt::Leaf(WidthIndex::new()),
        }
    }

    pub fn tree_branch(
        label: String,
        value: Rc<NodeValue>,
        size: EVector,
        axis: Axis,
        splits: Vec<EFloat>,
        children: Vec<NodeHandle>,
    ) -> Self {
        let ext = NodeExt::Branch(SplitIndex::with_lines(splits.len()));
        Self {
            label,
            value,
            role: NodeRole::Tree,
            size,
            axis: Some(axis),
            splits,
            children,
            parent: None,
            ext,
        }
    }

    /// A synthesized composite realizing `value` from `children`.
    pub fn group(value: Rc<NodeValue>, splits: Vec<EFloat>, children: Vec<NodeHandle>) -> Self {
        Self {
            label: value.name.clone(),
            size: value.size,
            axis: value.axis,
            value,
            role: NodeRole::Group,
            splits,
            children,
            parent: None,
            ext: NodeExt::Detached,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> &Rc<NodeValue> {
        &self.value
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn size(&self) -> &EVector {
        &self.size
    }

    pub fn axis(&self) -> Option<Axis> {
        self.axis
    }

    pub fn splits(&self) -> &[EFloat] {
        &self.splits
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Offset of child `i` from this node's origin along the split axis.
    pub fn child_offset(&self, i: usize) -> EFloat {
        if i == 0 {
            EFloat::zero()
        } else {
            self.splits[i - 1]
        }
    }

    pub fn width_index(&self) -> Option<&WidthIndex> {
        match &self.ext {
            NodeExt::Leaf(w) => Some(w),
            _ => None,
        }
    }

    pub fn width_index_mut(&mut self) -> Option<&mut WidthIndex> {
        match &mut self.ext {
            NodeExt::Leaf(w) => Some(w),
            _ => None,
        }
    }

    pub fn split_index(&self) -> Option<&SplitIndex> {
        match &self.ext {
            NodeExt::Branch(s) => Some(s),
            _ => None,
        }
    }

    pub fn split_index_mut(&mut self) -> Option<&mut SplitIndex> {
        match &mut self.ext {
            NodeExt::Branch(s) => Some(s),
            _ => None,
        }
    }
}

/// Arena-backed subdivision tree plus the group nodes synthesized over it.
#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    arena: NodeArena<LayoutNode>,
    root: Option<NodeHandle>,
    root_origin: EVector,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    pub fn root_origin(&self) -> &EVector {
        &self.root_origin
    }

    pub(crate) fn set_root(&mut self, root: NodeHandle, origin: EVector) {
        self.root = Some(root);
        self.root_origin = origin;
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&LayoutNode> {
        self.arena.get(handle)
    }

    /// Like [`node`](Self::node) but a dangling handle is a structural error.
    pub fn expect_node(&self, handle: NodeHandle) -> Result<&LayoutNode> {
        self.arena.get(handle).ok_or_else(|| {
            LayoutError::structural("layout tree", format!("dangling node handle {handle}"))
        })
    }

    pub(crate) fn expect_node_mut(&mut self, handle: NodeHandle) -> Result<&mut LayoutNode> {
        self.arena.get_mut(handle).ok_or_else(|| {
            LayoutError::structural("layout tree", format!("dangling node handle {handle}"))
        })
    }

    /// Adds a tree node and links `children` back to it.
    pub(crate) fn insert_tree_node(&mut self, node: LayoutNode) -> Result<NodeHandle> {
        let children = node.children.clone();
        let handle = self.arena.allocate(node);
        for child in children {
            self.expect_node_mut(child)?.parent = Some(handle);
        }
        Ok(handle)
    }

    pub(crate) fn allocate_group(&mut self, node: LayoutNode) -> NodeHandle {
        debug_assert_eq!(node.role, NodeRole::Group);
        self.arena.allocate(node)
    }

    /// Frees a group node. Tree nodes are never released.
    pub(crate) fn release_group(&mut self, handle: NodeHandle) -> Result<()> {
        if self.expect_node(handle)?.role != NodeRole::Group {
            return Err(LayoutError::structural(
                "layout tree",
                format!("refusing to release tree node {handle}"),
            ));
        }
        self.arena.deallocate(handle);
        Ok(())
    }

    pub fn is_live(&self, handle: NodeHandle) -> bool {
        self.arena.is_live(handle)
    }

    /// Live nodes of both roles.
    pub fn node_count(&self) -> usize {
        self.arena.live_count()
    }

    pub fn group_node_count(&self) -> usize {
        self.arena
            .iter()
            .filter(|(_, n)| n.role == NodeRole::Group)
            .count()
    }

    /// Live group nodes that list `component` among their children.
    pub fn groups_containing(&self, component: NodeHandle) -> Vec<NodeHandle> {
        self.arena
            .iter()
            .filter(|(_, n)| n.role == NodeRole::Group && n.children.contains(&component))
            .map(|(h, _)| h)
            .collect()
    }

    /// `(group, child)` for every group node child that is no longer live.
    pub fn dangling_components(&self) -> Vec<(NodeHandle, NodeHandle)> {
        self.arena
            .iter()
            .filter(|(_, n)| n.role == NodeRole::Group)
            .flat_map(|(h, n)| n.children.iter().map(move |&c| (h, c)))
            .filter(|&(_, c)| !self.arena.is_live(c))
            .collect()
    }

    /// Origin of a tree node, derived from the root origin and split offsets.
    /// `None` for group nodes and dangling handles.
    pub fn origin(&self, handle: NodeHandle) -> Option<EVector> {
        let mut path = Vec::new();
        let mut current = handle;
        loop {
            let node = self.arena.get(current)?;
            if node.role != NodeRole::Tree {
                return None;
            }
            match node.parent {
                Some(parent) => {
                    path.push((parent, current));
                    current = parent;
                }
                None => break,
            }
        }
        if Some(current) != self.root {
            return None;
        }
        let mut origin = self.root_origin;
        for (parent, child) in path.into_iter().rev() {
            let p = self.arena.get(parent)?;
            let i = p.children.iter().position(|&c| c == child)?;
            if i > 0 {
                let axis = p.axis?;
                origin = origin.offset(axis, p.splits[i - 1]);
            }
        }
        Some(origin)
    }

    /// Position of `child` among its parent's children.
    pub fn child_position(&self, child: NodeHandle) -> Option<(NodeHandle, usize)> {
        let parent = self.arena.get(child)?.parent?;
        let i = self
            .arena
            .get(parent)?
            .children
            .iter()
            .position(|&c| c == child)?;
        Some((parent, i))
    }

    /// Tree leaves in left-to-right, depth-first order.
    pub fn leaves(&self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeHandle> = self.root.into_iter().collect();
        while let Some(h) = stack.pop() {
            if let Some(node) = self.arena.get(h) {
                if node.is_leaf() {
                    out.push(h);
                } else {
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Tree branches in depth-first order.
    pub fn branches(&self) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeHandle> = self.root.into_iter().collect();
        while let Some(h) = stack.pop() {
            if let Some(node) = self.arena.get(h) {
                if !node.is_leaf() {
                    out.push(h);
                    stack.extend(node.children.iter().rev().copied());
                }
            }
        }
        out
    }

    /// Checks the structural invariants of the tree part.
    pub fn verify(&self) -> Result<()> {
        let Some(root) = self.root else {
            return Ok(());
        };
        if self.expect_node(root)?.parent.is_some() {
            return Err(LayoutError::structural("layout tree", "root has a parent"));
        }
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            let node = self.expect_node(h)?;
            if node.role != NodeRole::Tree {
                return Err(LayoutError::structural(
                    "layout tree",
                    format!("group node {h} linked into the tree"),
                ));
            }
            if node.is_leaf() {
                if node.width_index().is_none() || !node.splits.is_empty() {
                    return Err(LayoutError::structural(
                        "layout tree",
                        format!("leaf {h} ({}) malformed", node.label),
                    ));
                }
                continue;
            }
            let axis = node.axis.ok_or_else(|| {
                LayoutError::structural("layout tree", format!("branch {h} has no axis"))
            })?;
            if node.children.len() != node.splits.len() + 1 {
                return Err(LayoutError::structural(
                    "layout tree",
                    format!(
                        "branch {h} has {} children for {} splits",
                        node.children.len(),
                        node.splits.len()
                    ),
                ));
            }
            check_split_offsets(&node.splits, &node.size[axis])?;
            match node.split_index() {
                Some(s) if s.line_count() == node.splits.len() => {}
                _ => {
                    return Err(LayoutError::structural(
                        "layout tree",
                        format!("branch {h} split index does not match its splits"),
                    ))
                }
            }
            for &c in &node.children {
                if self.expect_node(c)?.parent != Some(h) {
                    return Err(LayoutError::structural(
                        "layout tree",
                        format!("child {c} does not point back at {h}"),
                    ));
                }
                stack.push(c);
            }
        }
        Ok(())
    }
}

/// Split offsets must be strictly increasing and strictly inside `(0, extent)`.
pub fn check_split_offsets(splits: &[EFloat], extent: &EFloat) -> Result<()> {
    let zero = EFloat::zero();
    let mut previous = zero;
    for (i, s) in splits.iter().enumerate() {
        if !previous.lt(s) {
            return Err(LayoutError::structural(
                "split offsets",
                format!("offset {i} ({}) does not exceed {}", s.value(), previous.value()),
            ));
        }
        previous = *s;
    }
    if splits.last().is_some_and(|last| !last.lt(extent)) {
        return Err(LayoutError::structural(
            "split offsets",
            format!("last offset reaches the node extent {}", extent.value()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(id: u32, name: &str, w: f32, h: f32) -> Rc<NodeValue> {
        Rc::new(NodeValue {
            id: GroupId::new(id),
            name: name.to_string(),
            terminals: 1,
            size: EVector::with_error(w, h, 0.0, 1e-6),
            axis: None,
            children: Vec::new(),
        })
    }

    fn e(v: f32) -> EFloat {
        EFloat::with_error(v, 1e-6)
    }

    /// Three unit leaves side by side along X, origin (5, 7).
    fn strip() -> (LayoutTree, Vec<NodeHandle>) {
        let mut tree = LayoutTree::new();
        let leaves: Vec<_> = (0..3)
            .map(|i| {
                let v = value(i, "A", 1.0, 1.0);
                tree.insert_tree_node(LayoutNode::tree_leaf("A".into(), v.clone(), v.size))
                    .unwrap()
            })
            .collect();
        let root_value = Rc::new(NodeValue {
            id: GroupId::new(9),
            name: "x[A,A,A]".into(),
            terminals: 3,
            size: EVector::with_error(3.0, 1.0, 0.0, 1e-6),
            axis: Some(Axis::X),
            children: vec![GroupId::new(0); 3],
        });
        let root = tree
            .insert_tree_node(LayoutNode::tree_branch(
                "row".into(),
                root_value.clone(),
                root_value.size,
                Axis::X,
                vec![e(1.0), e(2.0)],
                leaves.clone(),
            ))
            .unwrap();
        tree.set_root(root, EVector::with_error(5.0, 7.0, 0.0, 1e-6));
        (tree, leaves)
    }

    #[test]
    fn origins_sum_offsets() {
        let (tree, leaves) = strip();
        let o = tree.origin(leaves[2]).unwrap();
        assert!(o.x.interval_eq(&e(7.0)));
        assert!(o.y.interval_eq(&e(7.0)));
        assert_eq!(tree.child_position(leaves[1]).map(|(_, i)| i), Some(1));
        tree.verify().unwrap();
    }

    #[test]
    fn leaves_in_order() {
        let (tree, leaves) = strip();
        assert_eq!(tree.leaves(), leaves);
        assert_eq!(tree.branches().len(), 1);
    }

    #[test]
    fn group_nodes_are_released_but_tree_nodes_are_not() {
        let (mut tree, leaves) = strip();
        let g = tree.allocate_group(LayoutNode::group(value(4, "x[A,A]", 2.0, 1.0), vec![e(1.0)], leaves[..2].to_vec()));
        assert_eq!(tree.group_node_count(), 1);
        assert!(tree.origin(g).is_none());
        assert!(tree.release_group(leaves[0]).is_err());
        tree.release_group(g).unwrap();
        assert!(!tree.is_live(g));
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn group_components_are_tracked() {
        let (mut tree, leaves) = strip();
        let inner = tree.allocate_group(LayoutNode::group(value(4, "x[A,A]", 2.0, 1.0), vec![e(1.0)], leaves[..2].to_vec()));
        let outer = tree.allocate_group(LayoutNode::group(
            value(5, "x[x[A,A],A]", 3.0, 1.0),
            vec![e(2.0)],
            vec![inner, leaves[2]],
        ));
        assert_eq!(tree.groups_containing(inner), vec![outer]);
        assert_eq!(tree.groups_containing(leaves[0]), vec![inner]);
        assert!(tree.dangling_components().is_empty());
        tree.release_group(inner).unwrap();
        assert_eq!(tree.dangling_components(), vec![(outer, inner)]);
    }

    #[test]
    fn split_offsets_must_increase_inside_extent() {
        assert!(check_split_offsets(&[e(1.0), e(2.0)], &e(3.0)).is_ok());
        assert!(check_split_offsets(&[e(2.0), e(1.0)], &e(3.0)).is_err());
        assert!(check_split_offsets(&[e(1.0), e(3.0)], &e(3.0)).is_err());
        assert!(check_split_offsets(&[e(0.0)], &e(3.0)).is_err());
        assert!(check_split_offsets(&[], &e(3.0)).is_ok());
    }

    #[test]
    fn same_structure_ignores_identity() {
        let a = value(1, "A", 1.0, 2.0);
        let mut b = (*a).clone();
        b.id = GroupId::new(2);
        assert!(a.same_structure(&b));
        b.size = EVector::with_error(1.0, 3.0, 0.0, 1e-6);
        assert!(!a.same_structure(&b));
    }
}
