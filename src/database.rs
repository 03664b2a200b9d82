use crate::config::StorageConfig;
use crate::executor::{ExecuteResult, Executor};
use crate::sql::{Parser, Statement};
use crate::storage::{BufferPoolManager, MetadataManager, PageManager, Record, RecordId};
use anyhow::{bail, Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;

/// High-level database interface that wires the storage core to the executor
pub struct Database {
    buffer_pool: BufferPoolManager,
    executor: Executor,
    config: StorageConfig,
}

impl Database {
    /// Create a new database at the specified path
    pub fn create(path: &Path, config: StorageConfig) -> Result<Self> {
        if path.exists() {
            bail!("Database file already exists at {:?}", path);
        }
        config.validate()?;

        let page_manager = PageManager::create(path, config.page_size)?;
        info!("Created database at {:?}", path);
        Ok(Self::assemble(page_manager, MetadataManager::new(), config))
    }

    /// Open an existing database
    pub fn open(path: &Path, config: StorageConfig) -> Result<Self> {
        if !path.exists() {
            bail!("Database file does not exist at {:?}", path);
        }
        config.validate()?;

        let page_manager = PageManager::open(path, config.page_size)?;
        let num_pages = page_manager.num_pages()?;
        info!("Opened database at {:?} with {} pages", path, num_pages);
        Ok(Self::assemble(
            page_manager,
            MetadataManager::with_page_count(num_pages),
            config,
        ))
    }

    pub fn open_or_create(path: &Path, config: StorageConfig) -> Result<Self> {
        if path.exists() {
            Self::open(path, config)
        } else {
            Self::create(path, config)
        }
    }

    fn assemble(page_manager: PageManager, metadata: MetadataManager, config: StorageConfig) -> Self {
        let replacer = config.replacer.build(config.pool_capacity);
        let buffer_pool = BufferPoolManager::new(page_manager, replacer, config.pool_capacity);
        let executor = Executor::new(buffer_pool.clone(), Arc::new(metadata));

        Self {
            buffer_pool,
            executor,
            config,
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn buffer_pool(&self) -> &BufferPoolManager {
        &self.buffer_pool
    }

    /// Parse and execute one SQL statement
    pub fn execute_sql(&self, sql: &str) -> Result<ExecuteResult> {
        let statement = Parser::new(sql.to_string()).parse()?;
        self.execute(&statement)
    }

    pub fn execute(&self, statement: &Statement) -> Result<ExecuteResult> {
        self.executor.execute(statement)
    }

    /// Read a stored record back by its address
    pub fn read_record(&self, record_id: RecordId) -> Result<Record> {
        let handle = self.buffer_pool.fetch_page(record_id.page_id)?;
        let page = handle.read();
        let bytes = page
            .retrieve_record(record_id.slot_id)
            .with_context(|| format!("Failed to read record {}", record_id))?;
        Ok(Record::deserialize(bytes)?)
    }

    /// Flush all dirty pages to disk
    pub fn flush(&self) -> Result<()> {
        self.buffer_pool.flush_all()?;
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Best effort flush on drop
        let _ = self.flush();
    }
}
