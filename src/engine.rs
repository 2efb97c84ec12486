//! Bottom-up group composition.
//!
//! Starting from one placement per tree leaf, pass `n` composes every pair of
//! adjacent placements whose terminal counts sum to `n` and whose extents
//! across the merge axis agree. After each pass every identity left with a
//! single placement is pruned: the catalog only ever describes motifs that
//! repeat. Passes run in increasing `n`, so every sub-motif a merge needs was
//! settled by an earlier pass.
//!
//! Each placement is registered in three places that must stay in lockstep:
//! the [`Catalog`], the [`WidthIndex`](crate::index::WidthIndex) of its anchor
//! leaf, and the [`SplitIndex`](crate::index::SplitIndex) of every branch line
//! it straddles. [`GroupEngine::check_consistency`] re-verifies all of them.
//!
//! # Invariants
//! - Every catalog placement's node is live and its anchor leaf's origin is
//!   the placement location.
//! - Every index entry refers to a catalog placement, and vice versa.
//! - After [`GroupEngine::run`], no identity has exactly one placement.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::arena::NodeHandle;
use crate::builder::build_tree;
use crate::catalog::{Catalog, GroupPair};
use crate::config::ComposeOptions;
use crate::error::{LayoutError, Result};
use crate::fingerprint::{catalog_digest, HashValue};
use crate::index::GroupRef;
use crate::navigation::{collect_overlapping_splits, find_lower_left, SplitCrossing};
use crate::numeric::{Axis, EFloat, EVector};
use crate::registry::Registry;
use crate::source::SourceNode;
use crate::tree::{GroupId, LayoutNode, LayoutTree, NodeRole, NodeValue};

/// A placement created during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementSummary {
    pub id: GroupId,
    pub name: String,
    pub x: f32,
    pub y: f32,
}

/// What one composition pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub n: u32,
    pub created: Vec<PlacementSummary>,
    /// Merges whose region already had a placement at the same corner.
    pub absorbed: usize,
    /// Identities discarded by the prune that followed the pass.
    pub pruned: Vec<GroupId>,
}

/// One motif in a [`CatalogSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifSummary {
    pub id: GroupId,
    pub name: String,
    pub terminals: u32,
    pub width: f32,
    pub height: f32,
    /// Nominal lower-left corners, sorted.
    pub placements: Vec<[f32; 2]>,
}

/// Serializable view of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub terminal_count: u32,
    pub motifs: Vec<MotifSummary>,
}

/// Owns the tree, registry and catalog for one analysis.
#[derive(Debug)]
pub struct GroupEngine {
    tree: LayoutTree,
    registry: Registry,
    catalog: Catalog,
    options: ComposeOptions,
    terminal_count: u32,
}

impl GroupEngine {
    /// Builds the tree from `root` and seeds one placement per leaf.
    pub fn from_source<N: SourceNode>(root: &N, options: ComposeOptions) -> Result<Self> {
        let mut registry = Registry::new();
        let built = build_tree(root, &mut registry, &options)?;
        let mut engine = GroupEngine {
            tree: built.tree,
            registry,
            catalog: Catalog::new(),
            options,
            terminal_count: built.leaves.len() as u32,
        };
        for leaf in built.leaves {
            engine.register_pair(GroupPair {
                id: leaf.value.id,
                node: leaf.node,
                anchor: leaf.node,
                location: leaf.location,
            })?;
        }
        Ok(engine)
    }

    /// Builds and runs every pass. Either the whole analysis succeeds or no
    /// engine is returned.
    pub fn analyze<N: SourceNode>(root: &N, options: ComposeOptions) -> Result<Self> {
        let mut engine = Self::from_source(root, options)?;
        engine.run()?;
        Ok(engine)
    }

    /// Runs passes `1..=N` (or up to `max_terminals`), pruning after each.
    pub fn run(&mut self) -> Result<Vec<PassReport>> {
        let limit = self
            .options
            .max_terminals
            .map_or(self.terminal_count, |m| m.min(self.terminal_count));
        let mut reports = Vec::with_capacity(limit as usize);
        for n in 1..=limit {
            let mut report = self.compose_pass(n)?;
            report.pruned = self.prune()?;
            if self.options.verify_after_pass {
                self.check_consistency()?;
            }
            info!(
                n,
                created = report.created.len(),
                absorbed = report.absorbed,
                pruned = report.pruned.len(),
                motifs = self.catalog.len(),
                "composition pass complete"
            );
            reports.push(report);
        }
        Ok(reports)
    }

    /// Composes every placement pair whose terminal counts sum to `n`.
    ///
    /// Pass 1 has nothing to compose: single terminals are seeded at build
    /// time.
    pub fn compose_pass(&mut self, n: u32) -> Result<PassReport> {
        let mut report = PassReport {
            n,
            ..PassReport::default()
        };
        if n < 2 {
            return Ok(report);
        }
        let mut bases = Vec::new();
        for pair in self.catalog.pairs() {
            let value = self.registry.expect_value(pair.id)?;
            if value.terminals < n {
                bases.push((pair.clone(), Rc::clone(value)));
            }
        }

        let axes = self.options.merge_axes.clone();
        for (base, base_value) in &bases {
            for &axis in &axes {
                let target = base.location.offset(axis, base_value.size[axis]);
                let Some(neighbour) = find_lower_left(&self.tree, base.anchor, &base.location, &target)
                else {
                    continue;
                };
                let want = n - base_value.terminals;
                let across = base_value.size[axis.other()];
                let mut partners = Vec::new();
                if let Some(index) = self.tree.expect_node(neighbour)?.width_index() {
                    for candidate in index.adjoining(axis, &across) {
                        let value = self.registry.expect_value(candidate.id)?;
                        if value.terminals == want {
                            partners.push((candidate, Rc::clone(value)));
                        }
                    }
                }
                for (partner, partner_value) in partners {
                    self.merge(base, base_value, partner, &partner_value, axis, &mut report)?;
                }
            }
        }
        Ok(report)
    }

    /// Synthesizes and registers the placement `base` ⊕ `partner` along `axis`.
    fn merge(
        &mut self,
        base: &GroupPair,
        base_value: &Rc<NodeValue>,
        partner: GroupRef,
        partner_value: &Rc<NodeValue>,
        axis: Axis,
        report: &mut PassReport,
    ) -> Result<()> {
        // The region is fixed by its corner and extent; whichever derivation
        // filled the slot first stands for it.
        let size = base_value.size.offset(axis, partner_value.size[axis]);
        let occupant = self
            .tree
            .expect_node(base.anchor)?
            .width_index()
            .and_then(|w| w.get(&size.x, &size.y));
        if let Some(existing) = occupant {
            debug!(
                existing = %existing.id,
                base = %base_value.name,
                partner = %partner_value.name,
                at = %base.location,
                "absorbed alternative derivation of an existing placement"
            );
            report.absorbed += 1;
            return Ok(());
        }

        let mut parts = self.components(base.group_ref(), base_value, axis)?;
        parts.extend(self.components(partner, partner_value, axis)?);
        let values: Vec<Rc<NodeValue>> = parts.iter().map(|(v, _)| Rc::clone(v)).collect();
        let value = self.registry.intern_composite(axis, &values, None)?;

        let mut splits = Vec::with_capacity(parts.len() - 1);
        let mut acc: Option<EFloat> = None;
        for (v, _) in &parts[..parts.len() - 1] {
            let next = match acc {
                Some(a) => a + v.size[axis],
                None => v.size[axis],
            };
            splits.push(next);
            acc = Some(next);
        }
        let children: Vec<NodeHandle> = parts.iter().map(|(_, h)| *h).collect();
        let node = self
            .tree
            .allocate_group(LayoutNode::group(Rc::clone(&value), splits, children));
        let pair = GroupPair {
            id: value.id,
            node,
            anchor: base.anchor,
            location: base.location,
        };
        let summary = PlacementSummary {
            id: value.id,
            name: value.name.clone(),
            x: pair.location.x.value(),
            y: pair.location.y.value(),
        };
        if let Err(err) = self.register_pair(pair) {
            self.tree.release_group(node)?;
            return Err(err);
        }
        debug!(motif = %value.name, n = value.terminals, at = %base.location, "composed group");
        report.created.push(summary);
        Ok(())
    }

    /// The operand's components along `axis`: its own children if it is a
    /// composite along the same axis, else itself.
    fn components(
        &self,
        group: GroupRef,
        value: &Rc<NodeValue>,
        axis: Axis,
    ) -> Result<Vec<(Rc<NodeValue>, NodeHandle)>> {
        if value.axis != Some(axis) {
            return Ok(vec![(Rc::clone(value), group.node)]);
        }
        let node = self.tree.expect_node(group.node)?;
        if node.children().len() != value.children.len() {
            return Err(LayoutError::structural(
                "composition",
                format!("node for {} does not match its motif", value.name),
            ));
        }
        if let Some(dead) = node.children().iter().find(|&&c| !self.tree.is_live(c)) {
            return Err(LayoutError::structural(
                "composition",
                format!("{} refers to released component {dead}", value.name),
            ));
        }
        value
            .children
            .iter()
            .zip(node.children())
            .map(|(id, h)| Ok((Rc::clone(self.registry.expect_value(*id)?), *h)))
            .collect()
    }

    /// Discards every identity with exactly one placement.
    pub fn prune(&mut self) -> Result<Vec<GroupId>> {
        let singles = self.catalog.singletons();
        for &id in &singles {
            let location = match self.catalog.placements(id).first() {
                Some(pair) => pair.location,
                None => continue,
            };
            let pair = self.unregister_pair(id, &location)?;
            debug!(%id, at = %pair.location, "pruned non-repeating motif");
        }
        Ok(singles)
    }

    /// Removes one placement from the catalog and every index.
    ///
    /// A placement that is a component of a live larger placement stays: the
    /// larger group's node refers to it.
    pub fn remove_placement(&mut self, id: GroupId, location: &EVector) -> Result<GroupPair> {
        if let Some(pair) = self.catalog.find(id, location) {
            if let Some(&outer) = self.tree.groups_containing(pair.node).first() {
                let name = self.tree.expect_node(outer)?.value().name.clone();
                return Err(LayoutError::structural(
                    "composition",
                    format!("{id} at {location} is a component of live group {name}"),
                ));
            }
        }
        self.unregister_pair(id, location)
    }

    /// Registers `pair` in the catalog, then in the width and split indices.
    /// If an index rejects it, every earlier registration is undone.
    fn register_pair(&mut self, pair: GroupPair) -> Result<()> {
        let value = Rc::clone(self.registry.expect_value(pair.id)?);
        let crossings = if value.is_leaf() {
            Vec::new()
        } else {
            let max = pair.location + value.size;
            collect_overlapping_splits(&self.tree, pair.anchor, &pair.location, &pair.location, &max)
        };

        self.catalog.register(pair.clone())?;
        let mut undo = Vec::new();
        let indexed = self.index_pair(&pair, &value, &crossings, &mut undo);
        if let Err(err) = &indexed {
            warn!(motif = %value.name, at = %pair.location, %err, "rolling back placement registration");
            let group = pair.group_ref();
            for (node, line) in undo.into_iter().rev() {
                let node = self.tree.expect_node_mut(node)?;
                match line {
                    Some(line) => node.split_index_mut().map(|s| s.remove(line, &group)),
                    None => node.width_index_mut().map(|w| w.remove(&group)),
                };
            }
            self.catalog.unregister(pair.id, &pair.location)?;
        }
        indexed
    }

    /// Inserts `pair` into its anchor's width index (`(anchor, None)` in
    /// `undo`) and every crossed split line (`(branch, Some(line))`).
    fn index_pair(
        &mut self,
        pair: &GroupPair,
        value: &NodeValue,
        crossings: &[SplitCrossing],
        undo: &mut Vec<(NodeHandle, Option<usize>)>,
    ) -> Result<()> {
        let group = pair.group_ref();
        self.tree
            .expect_node_mut(pair.anchor)?
            .width_index_mut()
            .ok_or_else(|| LayoutError::structural("composition", "anchor is not a tree leaf"))?
            .insert(value.size.x, value.size.y, group)?;
        undo.push((pair.anchor, None));
        for crossing in crossings {
            let index = self
                .tree
                .expect_node_mut(crossing.branch)?
                .split_index_mut()
                .ok_or_else(|| LayoutError::structural("composition", "crossing on a non-branch"))?;
            for line in crossing.lines.clone() {
                index.insert(line, group)?;
                undo.push((crossing.branch, Some(line)));
                debug!(motif = %value.name, branch = %crossing.branch, line, "registered split crossing");
            }
        }
        Ok(())
    }

    fn unregister_pair(&mut self, id: GroupId, location: &EVector) -> Result<GroupPair> {
        let pair = self.catalog.unregister(id, location)?;
        let value = Rc::clone(self.registry.expect_value(id)?);
        let group = pair.group_ref();

        let removed = self
            .tree
            .expect_node_mut(pair.anchor)?
            .width_index_mut()
            .is_some_and(|w| w.remove(&group));
        if !removed {
            return Err(LayoutError::structural(
                "composition",
                format!("{} at {} missing from its anchor's width index", value.name, pair.location),
            ));
        }
        if !value.is_leaf() {
            let max = pair.location + value.size;
            let crossings =
                collect_overlapping_splits(&self.tree, pair.anchor, &pair.location, &pair.location, &max);
            for crossing in crossings {
                let node = self.tree.expect_node_mut(crossing.branch)?;
                for line in crossing.lines {
                    let removed = node.split_index_mut().is_some_and(|s| s.remove(line, &group));
                    if !removed {
                        return Err(LayoutError::structural(
                            "composition",
                            format!("{} missing from split line {line}", value.name),
                        ));
                    }
                }
            }
        }
        if self.tree.expect_node(pair.node)?.role() == NodeRole::Group {
            self.tree.release_group(pair.node)?;
        }
        Ok(pair)
    }

    /// Re-verifies the tree, the catalog and both index families against
    /// each other.
    pub fn check_consistency(&self) -> Result<()> {
        self.tree.verify()?;
        let fail = |detail: String| -> Result<()> { Err(LayoutError::structural("consistency", detail)) };

        let mut indexed = 0usize;
        for pair in self.catalog.pairs() {
            let value = self.registry.expect_value(pair.id)?;
            let node = match self.tree.node(pair.node) {
                Some(n) => n,
                None => return fail(format!("{} at {} has a dead node", value.name, pair.location)),
            };
            if !Rc::ptr_eq(node.value(), value) {
                return fail(format!("{} node carries a foreign value", value.name));
            }
            match self.tree.origin(pair.anchor) {
                Some(o) if o.planar_eq(&pair.location) => {}
                _ => return fail(format!("{} anchor is not at {}", value.name, pair.location)),
            }
            let anchored = self
                .tree
                .node(pair.anchor)
                .and_then(LayoutNode::width_index)
                .is_some_and(|w| w.contains(&pair.group_ref()));
            if !anchored {
                return fail(format!("{} at {} not in width index", value.name, pair.location));
            }
            if !value.is_leaf() {
                let max = pair.location + value.size;
                for crossing in
                    collect_overlapping_splits(&self.tree, pair.anchor, &pair.location, &pair.location, &max)
                {
                    let split = self.tree.node(crossing.branch).and_then(LayoutNode::split_index);
                    for line in crossing.lines {
                        indexed += 1;
                        if !split.is_some_and(|s| s.contains(line, &pair.group_ref())) {
                            return fail(format!("{} missing from split line {line}", value.name));
                        }
                    }
                }
            }
        }

        for leaf in self.tree.leaves() {
            let Some(index) = self.tree.node(leaf).and_then(LayoutNode::width_index) else {
                continue;
            };
            let Some(origin) = self.tree.origin(leaf) else {
                continue;
            };
            for group in index.iter() {
                let known = self
                    .catalog
                    .find(group.id, &origin)
                    .is_some_and(|p| p.node == group.node && p.anchor == leaf);
                if !known {
                    return fail(format!("width index entry {} has no placement", group.id));
                }
            }
        }

        let mut registered = 0usize;
        for branch in self.tree.branches() {
            if let Some(index) = self.tree.node(branch).and_then(LayoutNode::split_index) {
                registered += index.iter().count();
            }
        }
        if registered != indexed {
            return fail(format!(
                "split indices hold {registered} registrations, catalog implies {indexed}"
            ));
        }

        if let Some((group, child)) = self.tree.dangling_components().first() {
            return fail(format!("group node {group} refers to released component {child}"));
        }

        let group_nodes = self.tree.group_node_count();
        let composite_pairs = self
            .catalog
            .pairs()
            .filter(|p| self.tree.node(p.node).is_some_and(|n| n.role() == NodeRole::Group))
            .count();
        if group_nodes != composite_pairs {
            return fail(format!(
                "{group_nodes} group nodes alive for {composite_pairs} composite placements"
            ));
        }
        Ok(())
    }

    /// Placements of `id`; an identity absent from the catalog is `NotFound`.
    pub fn placements(&self, id: GroupId) -> Result<&[GroupPair]> {
        if !self.catalog.contains_id(id) {
            return Err(LayoutError::not_found(format!("motif {id} in catalog")));
        }
        Ok(self.catalog.placements(id))
    }

    pub fn summary(&self) -> CatalogSummary {
        let motifs = self
            .catalog
            .iter()
            .filter_map(|(id, pairs)| {
                let value = self.registry.value(id)?;
                let mut placements: Vec<[f32; 2]> = pairs.iter().map(|p| p.location.planar()).collect();
                placements.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
                Some(MotifSummary {
                    id,
                    name: value.name.clone(),
                    terminals: value.terminals,
                    width: value.size.x.value(),
                    height: value.size.y.value(),
                    placements,
                })
            })
            .collect();
        CatalogSummary {
            terminal_count: self.terminal_count,
            motifs,
        }
    }

    pub fn digest(&self) -> HashValue {
        catalog_digest(&self.catalog, &self.registry)
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Number of leaves in the layout.
    pub fn terminal_count(&self) -> u32 {
        self.terminal_count
    }
}
