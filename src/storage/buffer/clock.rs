//! Clock (second-chance) replacement.
//!
//! Pages sit on a ring with a reference bit. An access sets the bit; the hand
//! sweeps the ring skipping pinned pages, clearing set bits, and picks the
//! first evictable page whose bit is already clear.

use super::replacer::{Replacer, Residency};
use crate::storage::page::PageId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
struct ClockEntry {
    page_id: PageId,
    referenced: bool,
}

#[derive(Debug)]
pub struct ClockReplacer {
    ring: Vec<ClockEntry>,
    positions: HashMap<PageId, usize>,
    hand: usize,
}

impl ClockReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity(capacity),
            hand: 0,
        }
    }

    fn update_indices(&mut self) {
        for (idx, entry) in self.ring.iter().enumerate() {
            self.positions.insert(entry.page_id, idx);
        }
    }

    fn advance(&mut self) {
        self.hand = (self.hand + 1) % self.ring.len().max(1);
    }
}

impl Replacer for ClockReplacer {
    fn record_access(&mut self, page_id: PageId) {
        match self.positions.get(&page_id) {
            Some(&idx) => self.ring[idx].referenced = true,
            None => {
                self.ring.push(ClockEntry {
                    page_id,
                    referenced: true,
                });
                self.positions.insert(page_id, self.ring.len() - 1);
            }
        }
    }

    fn remove(&mut self, page_id: PageId) {
        if let Some(idx) = self.positions.remove(&page_id) {
            self.ring.remove(idx);
            if idx < self.hand {
                self.hand -= 1;
            }
            if self.hand >= self.ring.len() {
                self.hand = 0;
            }
            self.update_indices();
        }
    }

    fn victim(&mut self, residency: &dyn Fn(PageId) -> Residency) -> Option<PageId> {
        // Two sweeps: the first may only clear reference bits.
        let mut budget = 2 * self.ring.len();

        while budget > 0 && !self.ring.is_empty() {
            budget -= 1;
            let entry = self.ring[self.hand];
            match residency(entry.page_id) {
                Residency::Absent => self.remove(entry.page_id),
                Residency::Pinned => self.advance(),
                Residency::Evictable if entry.referenced => {
                    self.ring[self.hand].referenced = false;
                    self.advance();
                }
                Residency::Evictable => return Some(entry.page_id),
            }
        }

        None
    }

    fn size(&self) -> usize {
        self.ring.len()
    }
}
