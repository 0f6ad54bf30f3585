use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::HeapFileIterator;
use crate::buffer::BufferPool;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::disk::DiskManager;
use crate::storage::page::{HeapPage, Page, PageRef, MAX_TUPLE_SIZE};
use crate::storage::{DbFile, DbFileIterator};
use crate::tuple::{Schema, Tuple};

/// An unordered table: tuples are placed in the first page with room.
pub struct HeapFile {
    id: TableId,
    schema: Arc<Schema>,
    disk: DiskManager,
    /// Serializes file growth so concurrent inserters get distinct pages
    append_lock: Mutex<()>,
}

impl HeapFile {
    /// Opens or creates the table file at `path`. The table id is derived
    /// from the canonical path, so reopening the same file yields the same id.
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>) -> Result<Self> {
        let disk = DiskManager::open(path)?;
        let id = TableId::from_path_bytes(disk.path().to_string_lossy().as_bytes());
        debug!(table = %id, path = %disk.path().display(), "Opened heap file");

        Ok(Self {
            id,
            schema,
            disk,
            append_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    pub fn disk_manager(&self) -> &DiskManager {
        &self.disk
    }

    /// Scans the file in page then slot order under `txn`.
    pub fn scan<'a>(&'a self, pool: &'a BufferPool, txn: TransactionId) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, pool, txn)
    }

    /// Writes an empty page at the end of the file, bypassing the cache.
    fn append_empty_page(&self) -> Result<PageId> {
        let _guard = self.append_lock.lock();
        let pid = PageId::new(self.id, self.disk.num_pages()?);
        self.disk.write_page(pid, &HeapPage::empty_page_data())?;
        debug!(page = %pid, "Appended empty page");
        Ok(pid)
    }
}

impl DbFile for HeapFile {
    fn id(&self) -> TableId {
        self.id
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read_page(&self, pid: PageId) -> Result<Box<dyn Page>> {
        let mut data = HeapPage::empty_page_data();
        self.disk.read_page(pid, &mut data)?;
        Ok(Box::new(HeapPage::new(pid, &data, self.schema.clone())?))
    }

    fn write_page(&self, page: &dyn Page) -> Result<()> {
        self.disk.write_page(page.id(), &page.page_data())
    }

    fn num_pages(&self) -> Result<u32> {
        self.disk.num_pages()
    }

    fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch(self.id));
        }
        let len = tuple.to_bytes()?.len();
        if len > MAX_TUPLE_SIZE {
            return Err(DbError::TupleTooLarge(len));
        }

        let mut next_page = 0;
        loop {
            let num_pages = self.num_pages()?;
            for page_number in next_page..num_pages {
                let pid = PageId::new(self.id, page_number);
                let page = pool.get_page(txn, pid, Permissions::ReadWrite)?;
                {
                    let mut guard = page.write();
                    let heap = HeapPage::from_page_mut(&mut **guard)?;
                    if !heap.has_room(len) {
                        continue;
                    }
                    heap.insert_tuple(tuple)?;
                }
                return Ok(vec![page]);
            }
            next_page = num_pages;
            self.append_empty_page()?;
        }
    }

    fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if rid.page_id.table_id() != self.id || rid.page_id.page_number() >= self.num_pages()? {
            return Err(DbError::TupleNotFound(rid.page_id));
        }

        let page = pool.get_page(txn, rid.page_id, Permissions::ReadWrite)?;
        HeapPage::from_page_mut(&mut **page.write())?.delete_tuple(tuple)?;
        Ok(vec![page])
    }

    fn iterator<'a>(
        &'a self,
        pool: &'a BufferPool,
        txn: TransactionId,
    ) -> Box<dyn DbFileIterator + 'a> {
        Box::new(self.scan(pool, txn))
    }
}
