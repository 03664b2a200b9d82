use crate::storage::buffer::clock::ClockReplacer;
use crate::storage::buffer::lru::LruReplacer;
use crate::storage::page::PageId;
use std::fmt::Debug;

/// What the buffer pool reports about a page a replacer is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// No longer cached; the replacer should forget it.
    Absent,
    /// Cached and in use; must not be chosen.
    Pinned,
    /// Cached with a pin count of zero.
    Evictable,
}

pub trait Replacer: Send + Sync + Debug {
    /// Record that a page was fetched or admitted.
    fn record_access(&mut self, page_id: PageId);

    /// Stop tracking a page. Removing an untracked page is a no-op.
    fn remove(&mut self, page_id: PageId);

    /// Select a page to evict. Returns None if every tracked page is pinned.
    ///
    /// The victim stays tracked until the pool calls [`remove`](Self::remove),
    /// so a failed write-back leaves it eligible for the next attempt.
    fn victim(&mut self, residency: &dyn Fn(PageId) -> Residency) -> Option<PageId>;

    /// Get the number of tracked pages.
    fn size(&self) -> usize;
}

/// Replacement policies a buffer pool can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReplacerKind {
    #[default]
    Lru,
    Clock,
}

impl ReplacerKind {
    pub fn build(self, capacity: usize) -> Box<dyn Replacer> {
        match self {
            ReplacerKind::Lru => Box::new(LruReplacer::new(capacity)),
            ReplacerKind::Clock => Box::new(ClockReplacer::new(capacity)),
        }
    }
}
