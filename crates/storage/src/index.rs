//! Open-addressing slot index
//!
//! The table keeps its entries in a dense insertion-ordered vector and uses
//! this index to find them by hash. Each slot holds the position of an entry
//! in that vector, or is empty.
//!
//! - Linear probing from `hash & mask`
//! - Slots are never cleared individually: a deleted entry keeps its slot
//!   until the next rebuild, and probing simply skips it
//! - The slot count is a power of two and always leaves at least one empty
//!   slot, so every probe sequence terminates

const EMPTY: usize = usize::MAX;
const MIN_SLOTS: usize = 8;

/// Hash → entry position index
#[derive(Debug, Clone)]
pub(crate) struct SlotIndex {
    slots: Vec<usize>,
    mask: usize,
    /// Number of occupied slots
    occupied: usize,
}

impl SlotIndex {
    /// Index sized to hold `entries` positions under `max_load_factor`
    pub(crate) fn for_entries(entries: usize, max_load_factor: f64) -> Self {
        let wanted = ((entries as f64 / max_load_factor).ceil() as usize).saturating_add(1);
        let size = wanted.max(MIN_SLOTS).next_power_of_two();
        Self {
            slots: vec![EMPTY; size],
            mask: size - 1,
            occupied: 0,
        }
    }

    /// Number of slots
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether one more position fits without exceeding `max_load_factor`
    pub(crate) fn has_room(&self, max_load_factor: f64) -> bool {
        ((self.occupied + 1) as f64) <= (self.slots.len() as f64) * max_load_factor
            && self.occupied + 1 < self.slots.len()
    }

    /// Record `pos` under `hash`
    pub(crate) fn insert(&mut self, hash: u64, pos: usize) {
        debug_assert!(self.occupied + 1 < self.slots.len(), "index must keep an empty slot");
        let mut i = (hash as usize) & self.mask;
        while self.slots[i] != EMPTY {
            i = (i + 1) & self.mask;
        }
        self.slots[i] = pos;
        self.occupied += 1;
    }

    /// Entry positions along the probe sequence for `hash`
    ///
    /// Yields every position up to the first empty slot; callers filter by
    /// the stored hash and liveness.
    pub(crate) fn probe(&self, hash: u64) -> Probe<'_> {
        Probe {
            index: self,
            slot: (hash as usize) & self.mask,
            steps: 0,
        }
    }
}

/// Iterator over a probe sequence
pub(crate) struct Probe<'a> {
    index: &'a SlotIndex,
    slot: usize,
    steps: usize,
}

impl Iterator for Probe<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.steps >= self.index.slots.len() {
            return None;
        }
        let pos = self.index.slots[self.slot];
        if pos == EMPTY {
            return None;
        }
        self.slot = (self.slot + 1) & self.index.mask;
        self.steps += 1;
        Some(pos)
    }
}
