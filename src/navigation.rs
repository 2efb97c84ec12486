//! Spatial navigation over the subdivision tree.
//!
//! All queries start from a known tree node and its known origin, climb until
//! the target region is covered, then descend. Origins are tracked along the
//! walk by adding or subtracting split offsets, never stored.
//!
//! Boxes are half-open: a node at origin `o` with size `s` covers
//! `[o, o + s)` on each planar axis, compared with interval semantics.

use std::ops::Range;

use crate::arena::NodeHandle;
use crate::numeric::{Axis, EFloat, EVector};
use crate::tree::{LayoutNode, LayoutTree, NodeValue};

/// A run of a branch's split lines straddled by a box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCrossing {
    pub branch: NodeHandle,
    /// Split line indices, each strictly inside the box along the branch axis.
    pub lines: Range<usize>,
}

fn contains_point(origin: &EVector, size: &EVector, p: &EVector) -> bool {
    Axis::ALL.iter().all(|&a| {
        let end = origin[a] + size[a];
        !p[a].lt(&origin[a]) && p[a].lt(&end)
    })
}

fn contains_box(origin: &EVector, size: &EVector, min: &EVector, max: &EVector) -> bool {
    Axis::ALL.iter().all(|&a| {
        let end = origin[a] + size[a];
        !min[a].lt(&origin[a]) && !end.lt(&max[a])
    })
}

/// Climbs from `start` until `covers(origin, node)` holds, returning that
/// ancestor and its origin.
fn ascend_until(
    tree: &LayoutTree,
    start: NodeHandle,
    known: &EVector,
    covers: impl Fn(&EVector, &LayoutNode) -> bool,
) -> Option<(NodeHandle, EVector)> {
    let mut current = start;
    let mut origin = *known;
    loop {
        let node = tree.node(current)?;
        if covers(&origin, node) {
            return Some((current, origin));
        }
        let (parent, i) = tree.child_position(current)?;
        if i > 0 {
            let p = tree.node(parent)?;
            let axis = p.axis()?;
            origin[axis] = origin[axis] - p.splits()[i - 1];
        }
        current = parent;
    }
}

/// The leaf whose lower-left corner is interval-equal to `target`.
///
/// `known` must be the origin of `start`. Returns `None` when `target` lies
/// outside the root or inside a leaf without being its corner.
pub fn find_lower_left(
    tree: &LayoutTree,
    start: NodeHandle,
    known: &EVector,
    target: &EVector,
) -> Option<NodeHandle> {
    let (mut current, mut origin) = ascend_until(tree, start, known, |o, n| {
        contains_point(o, n.size(), target)
    })?;
    loop {
        let node = tree.node(current)?;
        if node.is_leaf() {
            return origin.planar_eq(target).then_some(current);
        }
        let axis = node.axis()?;
        // First split line strictly beyond the target picks the child.
        let i = node
            .splits()
            .partition_point(|s| !target[axis].lt(&(origin[axis] + *s)));
        if i > 0 {
            origin[axis] = origin[axis] + node.splits()[i - 1];
        }
        current = node.children()[i];
    }
}

/// Smallest ancestor of `start` (or `start` itself) covering `[min, max]`.
pub fn find_containing_ancestor(
    tree: &LayoutTree,
    start: NodeHandle,
    known: &EVector,
    min: &EVector,
    max: &EVector,
) -> Option<(NodeHandle, EVector)> {
    ascend_until(tree, start, known, |o, n| contains_box(o, n.size(), min, max))
}

/// Every split line, across all descendants of the covering ancestor, that
/// lies strictly inside `[min, max]`.
///
/// Lines coinciding with the box edges are not straddled. Only children
/// overlapping the box are searched.
pub fn collect_overlapping_splits(
    tree: &LayoutTree,
    start: NodeHandle,
    known: &EVector,
    min: &EVector,
    max: &EVector,
) -> Vec<SplitCrossing> {
    let mut out = Vec::new();
    if let Some((top, origin)) = find_containing_ancestor(tree, start, known, min, max) {
        collect_below(tree, top, origin, min, max, &mut out);
    }
    out
}

fn collect_below(
    tree: &LayoutTree,
    handle: NodeHandle,
    origin: EVector,
    min: &EVector,
    max: &EVector,
    out: &mut Vec<SplitCrossing>,
) {
    let Some(node) = tree.node(handle) else {
        return;
    };
    let Some(axis) = node.axis() else {
        return;
    };
    let lines: Vec<EFloat> = node.splits().iter().map(|s| origin[axis] + *s).collect();
    let first = lines.partition_point(|l| !min[axis].lt(l));
    let end = lines.partition_point(|l| l.lt(&max[axis]));
    if first < end {
        out.push(SplitCrossing {
            branch: handle,
            lines: first..end,
        });
    }
    for (i, &child) in node.children().iter().enumerate() {
        let start = if i == 0 { origin[axis] } else { lines[i - 1] };
        let stop = lines
            .get(i)
            .copied()
            .unwrap_or_else(|| origin[axis] + node.size()[axis]);
        if start.lt(&max[axis]) && min[axis].lt(&stop) {
            let child_origin = origin.with_component(axis, start);
            collect_below(tree, child, child_origin, min, max, out);
        }
    }
}

/// Structural motif equality: the same leaf identity, or composites with the
/// same axis and identical component sequence.
pub fn same_group(a: &NodeValue, b: &NodeValue) -> bool {
    match (a.is_leaf(), b.is_leaf()) {
        (true, true) => a.id == b.id,
        (false, false) => a.axis == b.axis && a.children == b.children,
        _ => false,
    }
}
