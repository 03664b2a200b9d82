//! Storage layer error types.

use crate::storage::page::{PageId, SlotId};
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not enough space in page: requires {required} bytes but only {available} available")]
    NotEnoughSpace { required: usize, available: usize },

    #[error("Slot {slot_id} out of range (slot count: {slot_count})")]
    SlotOutOfRange { slot_id: SlotId, slot_count: usize },

    #[error("Record in slot {slot_id} has been deleted")]
    RecordDeleted { slot_id: SlotId },

    #[error("Record in slot {slot_id} is already deleted")]
    AlreadyDeleted { slot_id: SlotId },

    #[error("Page not found in buffer pool: {0}")]
    PageNotFound(PageId),

    #[error("Page already cached in buffer pool: {0}")]
    PageAlreadyCached(PageId),

    #[error("Page already exists in the data file: {0}")]
    PageAlreadyExists(PageId),

    #[error("Page is not pinned: {0}")]
    PageNotPinned(PageId),

    #[error("No page to evict: all {pinned} cached pages are pinned")]
    NoPageToEvict { pinned: usize },

    #[error("Page size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Corrupt page: {0}")]
    CorruptPage(String),

    #[error("Truncated record: field needs {needed} bytes but only {remaining} remain")]
    TruncatedRecord { needed: usize, remaining: usize },

    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the failed operation may succeed if retried later.
    ///
    /// Only a saturated buffer pool is transient: once some caller unpins a
    /// page, eviction can make progress again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::NoPageToEvict { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
