//! Per-node lookup tables.
//!
//! Every tree leaf carries a [`WidthIndex`]: the group placements whose
//! lower-left corner is that leaf, one per extent. Every tree branch
//! carries a [`SplitIndex`]: for each of its split lines, the placements that
//! straddle it. Both are kept in lockstep with the catalog by the engine.

use std::collections::BTreeMap;

use crate::arena::NodeHandle;
use crate::error::{LayoutError, Result};
use crate::numeric::{Axis, EFloat};
use crate::tree::GroupId;

/// A placement as seen from an index: identity plus the node realizing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupRef {
    pub id: GroupId,
    pub node: NodeHandle,
}

#[derive(Debug, Clone)]
struct WidthSlot {
    width: EFloat,
    height: EFloat,
    group: GroupRef,
}

impl WidthSlot {
    fn matches(&self, width: &EFloat, height: &EFloat) -> bool {
        self.width.interval_eq(width) && self.height.interval_eq(height)
    }

    fn extent(&self, axis: Axis) -> &EFloat {
        match axis {
            Axis::X => &self.width,
            Axis::Y => &self.height,
        }
    }
}

/// The placement anchored at one leaf for each `(width, height)`.
///
/// A rectangle with a given corner and extent covers a fixed set of leaves,
/// so one slot per extent is enough: a second group for the same slot is a
/// different derivation of the same region. Extents are matched with
/// interval equality.
#[derive(Debug, Clone, Default)]
pub struct WidthIndex {
    slots: Vec<WidthSlot>,
}

impl WidthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the slot for `(width, height)`. An occupied slot, or the same
    /// identity anchored here under another extent, is an ambiguous match.
    pub fn insert(&mut self, width: EFloat, height: EFloat, group: GroupRef) -> Result<()> {
        if let Some(slot) = self
            .slots
            .iter()
            .find(|s| s.matches(&width, &height) || s.group.id == group.id)
        {
            return Err(LayoutError::structural(
                "width index",
                format!(
                    "ambiguous match: {} already anchored here for {}x{}",
                    slot.group.id,
                    slot.width.value(),
                    slot.height.value()
                ),
            ));
        }
        self.slots.push(WidthSlot { width, height, group });
        Ok(())
    }

    /// Empties the slot holding `group`. Returns `false` if absent.
    pub fn remove(&mut self, group: &GroupRef) -> bool {
        match self.slots.iter().position(|s| &s.group == group) {
            Some(pos) => {
                self.slots.remove(pos);
                true
            }
            None => false,
        }
    }

    /// The placement filling the `(width, height)` slot.
    pub fn get(&self, width: &EFloat, height: &EFloat) -> Option<GroupRef> {
        self.slots
            .iter()
            .find(|s| s.matches(width, height))
            .map(|s| s.group)
    }

    /// Placements whose extent across `axis` matches `across`: the candidates
    /// that can sit next to something of that extent along `axis`. At most
    /// one per extent along `axis`.
    pub fn adjoining(&self, axis: Axis, across: &EFloat) -> impl Iterator<Item = GroupRef> + '_ {
        let across = *across;
        self.slots
            .iter()
            .filter(move |s| s.extent(axis.other()).interval_eq(&across))
            .map(|s| s.group)
    }

    pub fn contains(&self, group: &GroupRef) -> bool {
        self.slots.iter().any(|s| &s.group == group)
    }

    pub fn iter(&self) -> impl Iterator<Item = GroupRef> + '_ {
        self.slots.iter().map(|s| s.group)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Placements straddling each split line of a branch.
#[derive(Debug, Clone, Default)]
pub struct SplitIndex {
    lines: Vec<BTreeMap<GroupId, Vec<GroupRef>>>,
}

impl SplitIndex {
    pub fn with_lines(count: usize) -> Self {
        Self {
            lines: vec![BTreeMap::new(); count],
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn insert(&mut self, line: usize, group: GroupRef) -> Result<()> {
        let map = self.lines.get_mut(line).ok_or_else(|| {
            LayoutError::structural("split index", format!("split line {line} out of range"))
        })?;
        let entries = map.entry(group.id).or_default();
        if entries.contains(&group) {
            return Err(LayoutError::structural(
                "split index",
                format!("group {} registered twice on line {line}", group.id),
            ));
        }
        entries.push(group);
        Ok(())
    }

    /// Returns `false` if the placement was not registered on `line`.
    pub fn remove(&mut self, line: usize, group: &GroupRef) -> bool {
        let Some(map) = self.lines.get_mut(line) else {
            return false;
        };
        let Some(entries) = map.get_mut(&group.id) else {
            return false;
        };
        let Some(pos) = entries.iter().position(|g| g == group) else {
            return false;
        };
        entries.remove(pos);
        if entries.is_empty() {
            map.remove(&group.id);
        }
        true
    }

    /// Placements straddling `line`, ordered by identity.
    pub fn on_line(&self, line: usize) -> impl Iterator<Item = GroupRef> + '_ {
        self.lines
            .get(line)
            .into_iter()
            .flat_map(|m| m.values().flat_map(|v| v.iter().copied()))
    }

    pub fn contains(&self, line: usize, group: &GroupRef) -> bool {
        self.lines
            .get(line)
            .and_then(|m| m.get(&group.id))
            .is_some_and(|v| v.contains(group))
    }

    /// Whether any placement of `id` straddles `line`.
    pub fn has_group(&self, line: usize, id: GroupId) -> bool {
        self.lines.get(line).is_some_and(|m| m.contains_key(&id))
    }

    /// `(line, placement)` for every registration.
    pub fn iter(&self) -> impl Iterator<Item = (usize, GroupRef)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .flat_map(|(i, m)| m.values().flat_map(move |v| v.iter().map(move |g| (i, *g))))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|m| m.is_empty())
    }
}
