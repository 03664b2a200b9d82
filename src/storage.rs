//! Storage layer for slotdb.
//!
//! Data lives in one file of fixed-size pages. Key components:
//!
//! - **SlottedPage**: page format packing variable-length records behind a
//!   slot directory that grows down from the end of the page
//! - **Record**: length-prefixed field codec for the bytes stored in a slot
//! - **PageManager**: positioned reads and writes of whole pages
//! - **BufferPoolManager**: bounded page cache with pinning and a pluggable
//!   replacement policy
//! - **MetadataManager**: hands out page ids

pub mod buffer;
pub mod disk;
pub mod error;
pub mod metadata;
pub mod page;
pub mod record;

pub use buffer::replacer::{Replacer, ReplacerKind};
pub use buffer::{BufferPoolManager, FrameStatus, PageHandle};
pub use disk::PageManager;
pub use error::{StorageError, StorageResult};
pub use metadata::MetadataManager;
pub use page::{PageId, RecordId, SlotId, SlottedPage};
pub use record::Record;
