//! Arena allocation for layout nodes.
//!
//! Provides `NodeHandle` (a slot index plus generation) and `NodeArena`
//! (contiguous storage with free-list reuse). Tree nodes and synthesized group
//! nodes live in the same arena; group nodes come and go as placements are
//! pruned, so handles must detect that their slot has been recycled.
//!
//! # Determinism
//! - `NodeHandle` ordering is by index, then generation.
//! - Iteration order over slots is by index (0..capacity).
//! - Free-list reuse is LIFO, so the same sequence of allocations and
//!   deallocations always yields the same handles.

use std::fmt;

/// Handle to an arena slot.
///
/// The generation is bumped every time the slot is freed, so a handle kept
/// past its node's deallocation resolves to `None` instead of aliasing a
/// newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    /// Returns the raw slot index.
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}v{})", self.index, self.generation)
    }
}

/// Slot in the node arena.
#[derive(Debug, Clone)]
struct NodeSlot<T> {
    data: Option<T>,
    generation: u32,
    next_free: Option<u32>, // index of next free slot, if any
}

/// Contiguous storage for node data with free-list reuse.
#[derive(Debug, Clone)]
pub struct NodeArena<T> {
    slots: Vec<NodeSlot<T>>,
    free_list_head: Option<u32>,
    /// Number of live nodes (slots with `data.is_some()`).
    live_count: usize,
}

impl<T> NodeArena<T> {
    /// Creates a new empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list_head: None,
            live_count: 0,
        }
    }

    /// Allocates a slot for `data` and returns its handle.
    ///
    /// If a free slot is available, reuses it (most recently freed first);
    /// otherwise pushes a new slot.
    pub fn allocate(&mut self, data: T) -> NodeHandle {
        self.live_count += 1;
        if let Some(idx) = self.free_list_head {
            let slot = &mut self.slots[idx as usize];
            debug_assert!(slot.data.is_none(), "free slot should have no data");
            self.free_list_head = slot.next_free;
            slot.data = Some(data);
            slot.next_free = None;
            NodeHandle {
                index: idx,
                generation: slot.generation,
            }
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(NodeSlot {
                data: Some(data),
                generation: 0,
                next_free: None,
            });
            NodeHandle {
                index: idx,
                generation: 0,
            }
        }
    }

    /// Frees the slot behind `handle` and returns its data.
    ///
    /// Returns `None` if the handle is stale or already freed.
    pub fn deallocate(&mut self, handle: NodeHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let data = slot.data.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.next_free = self.free_list_head;
        self.free_list_head = Some(handle.index);
        self.live_count -= 1;
        Some(data)
    }

    /// Returns a reference to the data behind `handle`, if still live.
    pub fn get(&self, handle: NodeHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.data.as_ref())
    }

    /// Returns a mutable reference to the data behind `handle`, if still live.
    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.data.as_mut())
    }

    #[inline]
    pub fn is_live(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Returns the number of live nodes (slots with data).
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns the total capacity (number of slots, including free ones).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterates over all live nodes in deterministic order (by index).
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.data.as_ref().map(|data| {
                (
                    NodeHandle {
                        index: idx as u32,
                        generation: slot.generation,
                    },
                    data,
                )
            })
        })
    }

    /// Iterates over all live nodes mutably in deterministic order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeHandle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(idx, slot)| {
            let generation = slot.generation;
            slot.data.as_mut().map(|data| {
                (
                    NodeHandle {
                        index: idx as u32,
                        generation,
                    },
                    data,
                )
            })
        })
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_basic() {
        let mut arena: NodeArena<&'static str> = NodeArena::new();
        assert_eq!(arena.live_count(), 0);
        assert_eq!(arena.capacity(), 0);

        let h1 = arena.allocate("hello");
        assert_eq!(h1.index(), 0);
        assert_eq!(arena.live_count(), 1);
        assert_eq!(arena.get(h1), Some(&"hello"));

        let h2 = arena.allocate("world");
        assert_eq!(h2.index(), 1);
        assert_eq!(arena.live_count(), 2);

        assert_eq!(arena.deallocate(h1), Some("hello"));
        assert_eq!(arena.live_count(), 1);
        assert_eq!(arena.get(h1), None);

        let h3 = arena.allocate("reused");
        assert_eq!(h3.index(), 0); // reused freed slot
        assert_ne!(h3, h1);
        assert_eq!(arena.live_count(), 2);
        assert_eq!(arena.get(h3), Some(&"reused"));
    }

    #[test]
    fn stale_handles_do_not_alias() {
        let mut arena: NodeArena<u32> = NodeArena::new();
        let old = arena.allocate(1);
        arena.deallocate(old);
        let new = arena.allocate(2);
        assert_eq!(old.index(), new.index());
        assert!(!arena.is_live(old));
        assert_eq!(arena.get(new), Some(&2));
        assert_eq!(arena.deallocate(old), None);
        assert!(arena.get_mut(old).is_none());
        assert_eq!(arena.live_count(), 1);
    }

    #[test]
    fn double_free_is_rejected() {
        let mut arena: NodeArena<()> = NodeArena::new();
        let h = arena.allocate(());
        assert!(arena.deallocate(h).is_some());
        assert!(arena.deallocate(h).is_none());
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn deterministic_iteration() {
        let mut arena: NodeArena<i32> = NodeArena::new();
        let ids: Vec<_> = (0..5).map(|i| arena.allocate(i)).collect();
        // Deallocate some to create free list
        arena.deallocate(ids[1]);
        arena.deallocate(ids[3]);
        // Reallocate, which will reuse free slots in LIFO order
        let _new1 = arena.allocate(100);
        let _new2 = arena.allocate(200);
        let collected: Vec<_> = arena.iter().map(|(h, &val)| (h.index(), val)).collect();
        let expected = vec![(0, 0), (1, 200), (2, 2), (3, 100), (4, 4)];
        assert_eq!(collected, expected);
        for (_, v) in arena.iter_mut() {
            *v += 1;
        }
        assert_eq!(arena.get(ids[0]), Some(&1));
    }
}
