use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{validate_page_size, DEFAULT_PAGE_SIZE};
use crate::storage::ReplacerKind;

pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Knobs the storage core is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageConfig {
    pub page_size: usize,
    pub pool_capacity: usize,
    pub replacer: ReplacerKind,
}

impl StorageConfig {
    pub fn validate(&self) -> StorageResult<()> {
        validate_page_size(self.page_size)?;
        if self.pool_capacity == 0 {
            return Err(StorageError::InvalidConfig(
                "pool capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            replacer: ReplacerKind::Lru,
        }
    }
}
