use crate::storage::page::PageId;
use log::debug;
use std::sync::atomic::{AtomicI64, Ordering};

const NO_PAGES: i64 = -1;

/// Tracks the highest allocated page id.
///
/// Lives in process memory only. A fresh manager reports page 0 as the last
/// page the first time it is asked, so the first insert lands on page 0.
#[derive(Debug)]
pub struct MetadataManager {
    last_page_id: AtomicI64,
}

impl MetadataManager {
    pub fn new() -> Self {
        Self {
            last_page_id: AtomicI64::new(NO_PAGES),
        }
    }

    /// Seeds the manager from a data file that already holds `num_pages` pages.
    pub fn with_page_count(num_pages: u32) -> Self {
        let last = if num_pages == 0 {
            NO_PAGES
        } else {
            i64::from(num_pages) - 1
        };
        Self {
            last_page_id: AtomicI64::new(last),
        }
    }

    pub fn get_last_page_id(&self) -> PageId {
        // Only the first caller sees the sentinel; later ones keep whatever
        // value is there.
        let _ = self.last_page_id.compare_exchange(
            NO_PAGES,
            0,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        PageId(self.last_page_id.load(Ordering::SeqCst) as u32)
    }

    /// Allocates the next page id.
    pub fn increment_last_page_id(&self) -> PageId {
        let next = self.last_page_id.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Allocated page {}", next);
        PageId(next as u32)
    }
}

impl Default for MetadataManager {
    fn default() -> Self {
        Self::new()
    }
}
