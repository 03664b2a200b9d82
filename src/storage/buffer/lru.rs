use super::replacer::{Replacer, Residency};
use crate::storage::page::PageId;
use linked_hash_map::LinkedHashMap;

/// Least-recently-used replacement.
///
/// The map keeps access order: least recently used at the front, most recently
/// used at the back. Access and removal are O(1); choosing a victim walks from
/// the front past pinned pages.
#[derive(Debug)]
pub struct LruReplacer {
    order: LinkedHashMap<PageId, ()>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: LinkedHashMap::with_capacity(capacity),
        }
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        if self.order.get_refresh(&page_id).is_none() {
            self.order.insert(page_id, ());
        }
    }

    fn remove(&mut self, page_id: PageId) {
        self.order.remove(&page_id);
    }

    fn victim(&mut self, residency: &dyn Fn(PageId) -> Residency) -> Option<PageId> {
        let mut stale = vec![];
        let mut chosen = None;

        for &page_id in self.order.keys() {
            match residency(page_id) {
                Residency::Absent => stale.push(page_id),
                Residency::Pinned => {}
                Residency::Evictable => {
                    chosen = Some(page_id);
                    break;
                }
            }
        }

        for page_id in stale {
            self.order.remove(&page_id);
        }
        chosen
    }

    fn size(&self) -> usize {
        self.order.len()
    }
}
