pub mod slotted_page;

use crate::storage::error::{StorageError, StorageResult};
use std::fmt;

/// Default size of one page on disk and in the buffer pool.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Smallest page size a pool may be configured with.
pub const MIN_PAGE_SIZE: usize = 64;

/// Largest page size whose offsets still fit the `u16` header fields.
pub const MAX_PAGE_SIZE: usize = 32768;

/// Bytes reserved at the start of each page: free-space pointer and slot count.
pub const PAGE_HEADER_SIZE: usize = 4;

/// Size of one slot directory entry: `u16` offset followed by `u32` length.
pub const SLOT_SIZE: usize = 6;

/// Checks that `page_size` is representable by the page header.
pub fn validate_page_size(page_size: usize) -> StorageResult<()> {
    if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(StorageError::InvalidConfig(format!(
            "page size {} outside [{}, {}]",
            page_size, MIN_PAGE_SIZE, MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Byte offset of this page inside the data file.
    pub fn file_offset(self, page_size: usize) -> u64 {
        self.0 as u64 * page_size as u64
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index into a page's slot directory.
pub type SlotId = u16;

/// Address of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot_id)
    }
}

pub use slotted_page::{Slot, SlottedPage};
