// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational slot pool used for tree nodes and client tables.
//!
//! A [`Pool`] hands out slots through [`Pool::give`] and takes them back through
//! [`Pool::take`]. Taken slots go onto a free list and are recycled by later `give` calls.
//!
//! ## Semantics
//!
//! - A fresh slot starts at generation `0`.
//! - `take` empties the slot and increments its generation, so every [`Handle`] that pointed at
//!   it becomes stale.
//! - Stale handles never alias a live value: lookups check the generation and return `None`.
//! - Every pool has its own owner id, stamped into the handles it issues. A handle from another
//!   pool never resolves, even when its slot index and generation happen to match.
//! - `u32` is ample for practical lifetimes; generations wrap on overflow.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::{Index, IndexMut};
use core::sync::atomic::{AtomicU32, Ordering};

static NEXT_OWNER: AtomicU32 = AtomicU32::new(0);

/// Generational handle into a [`Pool`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    owner: u32,
    index: u32,
    generation: u32,
}

impl Handle {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Pool handles are intentionally 32-bit; pools never exceed u32::MAX slots."
    )]
    const fn new(owner: u32, index: usize, generation: u32) -> Self {
        Self {
            owner,
            index: index as u32,
            generation,
        }
    }

    /// Slot index of this handle.
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot at the time the handle was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Clone)]
struct Slot<N> {
    generation: u32,
    value: Option<N>,
}

/// Slot arena with a free list and per-slot generations.
pub struct Pool<N> {
    owner: u32,
    slots: Vec<Slot<N>>,
    free_list: Vec<usize>,
    live: usize,
}

impl<N> Default for Pool<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> Pool<N> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Create an empty pool with room for `n` slots.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            slots: Vec::with_capacity(n),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Store `value` in a recycled slot, or a new one if the free list is empty.
    pub fn give(&mut self, value: N) -> Handle {
        self.live += 1;
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx];
            slot.value = Some(value);
            Handle::new(self.owner, idx, slot.generation)
        } else {
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            Handle::new(self.owner, self.slots.len() - 1, 0)
        }
    }

    /// Return the slot behind `handle` to the pool, yielding its value.
    ///
    /// Returns `None` (and changes nothing) if the handle is stale.
    pub fn take(&mut self, handle: Handle) -> Option<N> {
        if handle.owner != self.owner {
            return None;
        }
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index());
        self.live -= 1;
        Some(value)
    }

    /// Return every live slot to the pool. All outstanding handles become stale.
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_list.push(idx);
            }
        }
        self.live = 0;
    }

    /// Look up a live value.
    pub fn get(&self, handle: Handle) -> Option<&N> {
        if handle.owner != self.owner {
            return None;
        }
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Look up a live value mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut N> {
        if handle.owner != self.owner {
            return None;
        }
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Whether `handle` refers to a live slot.
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Number of live slots.
    pub const fn len(&self) -> usize {
        self.live
    }

    /// True if no slot is live.
    pub const fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots ever allocated (live and free).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Iterate live values together with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &N)> + '_ {
        self.slots.iter().enumerate().filter_map(|(idx, slot)| {
            slot.value
                .as_ref()
                .map(|v| (Handle::new(self.owner, idx, slot.generation), v))
        })
    }

    /// Iterate live values mutably.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut N> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}

// Structures index their own pools with handles they issued; a stale handle there is a bug.
impl<N> Index<Handle> for Pool<N> {
    type Output = N;

    fn index(&self, handle: Handle) -> &N {
        match self.get(handle) {
            Some(v) => v,
            None => panic!("stale pool handle {handle:?}"),
        }
    }
}

impl<N> IndexMut<Handle> for Pool<N> {
    fn index_mut(&mut self, handle: Handle) -> &mut N {
        match self.get_mut(handle) {
            Some(v) => v,
            None => panic!("stale pool handle {handle:?}"),
        }
    }
}

impl<N> Debug for Pool<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pool")
            .field("owner", &self.owner)
            .field("total_slots", &self.slots.len())
            .field("alive", &self.live)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}
