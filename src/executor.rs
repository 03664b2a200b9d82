//! Statement execution against the storage core.
//!
//! INSERT encodes the literal values as one record and appends it to the last
//! allocated page, allocating a new page when the last one is full. Every
//! record shares a single heap file; table names are not used for placement.

use crate::sql::{InsertStatement, Statement};
use crate::storage::{
    BufferPoolManager, MetadataManager, PageHandle, PageId, Record, RecordId, SlottedPage,
    StorageError,
};
use anyhow::{bail, Result};
use log::{debug, info};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteResult {
    Inserted(RecordId),
}

impl fmt::Display for ExecuteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecuteResult::Inserted(record_id) => write!(f, "Inserted record {}", record_id),
        }
    }
}

pub struct Executor {
    buffer_pool: BufferPoolManager,
    metadata: Arc<MetadataManager>,
}

impl Executor {
    pub fn new(buffer_pool: BufferPoolManager, metadata: Arc<MetadataManager>) -> Self {
        Self {
            buffer_pool,
            metadata,
        }
    }

    pub fn execute(&self, statement: &Statement) -> Result<ExecuteResult> {
        match statement {
            Statement::Insert(insert) => self.execute_insert(insert).map(ExecuteResult::Inserted),
            Statement::Select(_) => bail!("SELECT execution is not supported"),
        }
    }

    fn execute_insert(&self, insert: &InsertStatement) -> Result<RecordId> {
        let record = Record::from_fields(insert.values.iter().map(|v| v.text().as_bytes()));
        let bytes = record.serialize();

        let max_size = SlottedPage::max_record_size(self.buffer_pool.page_size());
        if bytes.len() > max_size {
            bail!(
                "Record of {} bytes does not fit in a page (at most {} bytes)",
                bytes.len(),
                max_size
            );
        }

        let mut handle = self.find_page_for_record(bytes.len())?;
        let slot_id = loop {
            match self.buffer_pool.write_record_to_page(&handle, &bytes) {
                Ok(slot_id) => break slot_id,
                // Another writer filled the page since the space check.
                Err(StorageError::NotEnoughSpace { .. }) => {
                    debug!("Page {} filled up concurrently", handle.page_id());
                    drop(handle);
                    handle = self.allocate_page()?;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let record_id = RecordId::new(handle.page_id(), slot_id);
        self.buffer_pool.flush_page(record_id.page_id)?;
        debug!(
            "Inserted {} byte record into {} for table {}",
            bytes.len(),
            record_id,
            insert.table_name
        );

        Ok(record_id)
    }

    /// Pins the last page if the record fits there, otherwise a new page.
    fn find_page_for_record(&self, len: usize) -> Result<PageHandle> {
        let last_page_id = self.metadata.get_last_page_id();
        let handle = self.buffer_pool.fetch_page(last_page_id)?;

        if handle.read().can_fit(len) {
            return Ok(handle);
        }

        drop(handle);
        self.allocate_page()
    }

    fn allocate_page(&self) -> Result<PageHandle> {
        let page_id = self.metadata.increment_last_page_id();
        info!("Allocating page {}", page_id);
        self.pin_new_page(page_id)
    }

    /// Pins a freshly allocated page id.
    ///
    /// A concurrent insert may already have seen the id as the last page and
    /// stored records there, cached or flushed; that page is fetched as is.
    fn pin_new_page(&self, page_id: PageId) -> Result<PageHandle> {
        match self.buffer_pool.add_new_page(page_id) {
            Ok(handle) => Ok(handle),
            Err(StorageError::PageAlreadyCached(_) | StorageError::PageAlreadyExists(_)) => {
                debug!("Page {} was claimed by another insert", page_id);
                Ok(self.buffer_pool.fetch_page(page_id)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Parser;
    use crate::storage::{PageManager, ReplacerKind};
    use tempfile::{tempdir, TempDir};

    const PAGE_SIZE: usize = 128;

    fn create_test_executor(capacity: usize) -> Result<(TempDir, Executor, BufferPoolManager)> {
        let dir = tempdir()?;
        let page_manager = PageManager::create(&dir.path().join("test.db"), PAGE_SIZE)?;
        let buffer_pool = BufferPoolManager::new(
            page_manager,
            ReplacerKind::Lru.build(capacity),
            capacity,
        );
        let executor = Executor::new(buffer_pool.clone(), Arc::new(MetadataManager::new()));
        Ok((dir, executor, buffer_pool))
    }

    fn run(executor: &Executor, sql: &str) -> Result<ExecuteResult> {
        let statement = Parser::new(sql.to_string()).parse()?;
        executor.execute(&statement)
    }

    fn read_record(pool: &BufferPoolManager, record_id: RecordId) -> Result<Record> {
        let handle = pool.fetch_page(record_id.page_id)?;
        let page = handle.read();
        Ok(Record::deserialize(page.retrieve_record(record_id.slot_id)?)?)
    }

    #[test]
    fn test_insert_first_record_lands_on_page_zero() -> Result<()> {
        let (_dir, executor, pool) = create_test_executor(4)?;

        let result = run(&executor, "INSERT INTO users (name) VALUES ('alice')")?;
        let ExecuteResult::Inserted(record_id) = result;
        assert_eq!(record_id, RecordId::new(PageId(0), 0));

        let record = read_record(&pool, record_id)?;
        assert_eq!(record.fields(), &[b"alice".to_vec()]);

        // The page was flushed as part of the insert.
        assert!(!pool.get_buffer_page(PageId(0))?.is_dirty);
        assert_eq!(pool.page_manager().num_pages()?, 1);

        Ok(())
    }

    #[test]
    fn test_insert_fills_page_then_allocates() -> Result<()> {
        let (_dir, executor, pool) = create_test_executor(4)?;

        let mut record_ids = vec![];
        for i in 0..10 {
            let sql = format!("INSERT INTO t VALUES ('row-{:02}', {})", i, i);
            let ExecuteResult::Inserted(record_id) = run(&executor, &sql)?;
            record_ids.push(record_id);
        }

        // Slots on a page are handed out in order, and pages fill before
        // the next one is allocated.
        for pair in record_ids.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a.page_id == b.page_id {
                assert_eq!(b.slot_id, a.slot_id + 1);
            } else {
                assert_eq!(b.page_id.0, a.page_id.0 + 1);
                assert_eq!(b.slot_id, 0);
            }
        }
        assert!(record_ids.last().map(|r| r.page_id.0).unwrap_or(0) > 0);

        for (i, record_id) in record_ids.iter().enumerate() {
            let record = read_record(&pool, *record_id)?;
            assert_eq!(record.field(0), Some(format!("row-{:02}", i).as_bytes()));
            assert_eq!(record.field(1), Some(i.to_string().as_bytes()));
        }

        Ok(())
    }

    #[test]
    fn test_oversized_record_is_rejected() -> Result<()> {
        let (_dir, executor, pool) = create_test_executor(2)?;

        let big = "x".repeat(PAGE_SIZE);
        let err = run(&executor, &format!("INSERT INTO t VALUES ('{}')", big)).unwrap_err();
        assert!(err.to_string().contains("does not fit in a page"));

        // Nothing was allocated.
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.page_manager().num_pages()?, 0);

        Ok(())
    }

    #[test]
    fn test_select_is_not_supported() -> Result<()> {
        let (_dir, executor, _pool) = create_test_executor(2)?;

        let err = run(&executor, "SELECT * FROM t").unwrap_err();
        assert!(err.to_string().contains("not supported"));

        Ok(())
    }

    #[test]
    fn test_insert_fails_when_pool_is_pinned() -> Result<()> {
        let (_dir, executor, pool) = create_test_executor(1)?;

        let pinned = pool.fetch_page(PageId(7))?;
        let err = run(&executor, "INSERT INTO t VALUES ('a')").unwrap_err();
        let storage_err = err
            .downcast_ref::<StorageError>()
            .expect("storage error is preserved");
        assert!(storage_err.is_retryable());
        drop(pinned);

        run(&executor, "INSERT INTO t VALUES ('a')")?;

        Ok(())
    }

    #[test]
    fn test_allocation_keeps_records_of_a_racing_insert() -> Result<()> {
        let dir = tempdir()?;
        let page_manager = PageManager::create(&dir.path().join("test.db"), PAGE_SIZE)?;
        let pool = BufferPoolManager::new(page_manager, ReplacerKind::Lru.build(1), 1);
        let metadata = Arc::new(MetadataManager::new());
        let executor = Executor::new(pool.clone(), metadata.clone());

        run(&executor, "INSERT INTO t VALUES ('first')")?;

        // One insert reserves the next page id but has not pinned it yet.
        let reserved = metadata.increment_last_page_id();
        assert_eq!(reserved, PageId(1));

        // A second insert sees that id as the last page and commits there.
        let ExecuteResult::Inserted(other) = run(&executor, "INSERT INTO t VALUES ('B')")?;
        assert_eq!(other, RecordId::new(reserved, 0));

        // The committed page is evicted, leaving only the disk copy.
        drop(pool.fetch_page(PageId(0))?);
        assert!(!pool.contains(reserved));

        // The first insert now pins its reserved page and writes.
        let handle = executor.pin_new_page(reserved)?;
        let slot_id = pool.write_record_to_page(&handle, &Record::from_fields(["A"]).serialize())?;
        assert_eq!(slot_id, 1);
        drop(handle);
        pool.flush_page(reserved)?;

        assert_eq!(read_record(&pool, other)?.field(0), Some(&b"B"[..]));
        assert_eq!(
            read_record(&pool, RecordId::new(reserved, 1))?.field(0),
            Some(&b"A"[..])
        );

        Ok(())
    }

    #[test]
    fn test_execute_result_display() {
        let result = ExecuteResult::Inserted(RecordId::new(PageId(2), 3));
        assert_eq!(result.to_string(), "Inserted record (2, 3)");
    }
}
