use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{DatabaseConfig, Result, TransactionId};
use crate::concurrency::LockManager;
use crate::storage::heap::HeapFile;
use crate::tuple::Schema;

/// Owns the catalog, lock manager and buffer pool shared by every
/// transaction in the process.
pub struct Database {
    config: DatabaseConfig,
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    buffer_pool: BufferPool,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;

        let catalog = Arc::new(Catalog::new());
        let lock_manager = Arc::new(LockManager::new(config.lock));
        let buffer_pool = BufferPool::new(
            config.buffer_pool_pages,
            catalog.clone(),
            lock_manager.clone(),
        );
        info!(
            pages = config.buffer_pool_pages,
            retry_limit = config.lock.retry_limit,
            "Database initialized"
        );

        Ok(Self {
            config,
            catalog,
            lock_manager,
            buffer_pool,
        })
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Opens (or creates) the heap file at `path` and registers it as `name`.
    pub fn open_table<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        schema: Arc<Schema>,
    ) -> Result<Arc<HeapFile>> {
        let file = Arc::new(HeapFile::open(path, schema)?);
        self.catalog.add_table(file.clone(), name);
        Ok(file)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Starts a transaction.
    pub fn begin(&self) -> TransactionId {
        let txn = TransactionId::new();
        debug!(%txn, "Transaction started");
        txn
    }

    pub fn commit(&self, txn: TransactionId) -> Result<()> {
        self.buffer_pool.transaction_complete(txn, true)
    }

    pub fn abort(&self, txn: TransactionId) -> Result<()> {
        self.buffer_pool.transaction_complete(txn, false)
    }
}
