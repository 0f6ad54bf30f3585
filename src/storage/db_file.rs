use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Result, TableId, TransactionId};
use crate::storage::page::{Page, PageRef};
use crate::tuple::{Schema, Tuple};

/// A table stored on disk as a sequence of pages.
///
/// Tuple-level operations take the buffer pool explicitly; they fetch pages
/// through it so that locking and caching apply.
pub trait DbFile: Send + Sync {
    fn id(&self) -> TableId;

    fn schema(&self) -> &Arc<Schema>;

    /// Reads a page straight from disk, bypassing the cache.
    fn read_page(&self, pid: PageId) -> Result<Box<dyn Page>>;

    fn write_page(&self, page: &dyn Page) -> Result<()>;

    fn num_pages(&self) -> Result<u32>;

    /// Stores `tuple`, setting its record id. Returns the pages it modified.
    fn insert_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageRef>>;

    /// Removes the tuple its record id points at. Returns the pages it modified.
    fn delete_tuple(
        &self,
        pool: &BufferPool,
        txn: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageRef>>;

    /// Returns a closed iterator over every tuple of the file.
    fn iterator<'a>(
        &'a self,
        pool: &'a BufferPool,
        txn: TransactionId,
    ) -> Box<dyn DbFileIterator + 'a>;
}

/// Cursor over the tuples of a [`DbFile`].
///
/// An iterator starts closed. Calling anything but `open` or `close` on a
/// closed iterator fails with `IteratorNotOpen`. As a std [`Iterator`] a
/// closed cursor yields nothing, and an error closes the cursor after it is
/// yielded.
pub trait DbFileIterator: Iterator<Item = Result<Tuple>> {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next tuple, or `IteratorExhausted` past the end.
    fn next_tuple(&mut self) -> Result<Tuple>;

    /// Restarts from the first page.
    fn rewind(&mut self) -> Result<()>;

    /// Drops the iteration state. Locks taken while scanning stay held.
    fn close(&mut self);
}
