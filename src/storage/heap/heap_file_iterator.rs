use std::collections::VecDeque;

use super::HeapFile;
use crate::buffer::BufferPool;
use crate::common::{DbError, PageId, Permissions, Result, TransactionId};
use crate::storage::page::HeapPage;
use crate::storage::{DbFile, DbFileIterator};
use crate::tuple::Tuple;

/// Position of an open scan.
struct Cursor {
    next_page: u32,
    pending: VecDeque<Tuple>,
}

impl Cursor {
    fn start() -> Self {
        Self {
            next_page: 0,
            pending: VecDeque::new(),
        }
    }
}

/// Sequential scan over a [`HeapFile`]. Pages are fetched read-only through
/// the buffer pool one at a time, as the scan reaches them.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    txn: TransactionId,
    cursor: Option<Cursor>,
}

impl<'a> HeapFileIterator<'a> {
    pub fn new(file: &'a HeapFile, pool: &'a BufferPool, txn: TransactionId) -> Self {
        Self {
            file,
            pool,
            txn,
            cursor: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Loads pages until a tuple is pending or the file ends.
    fn fill(&mut self) -> Result<bool> {
        let cursor = self.cursor.as_mut().ok_or(DbError::IteratorNotOpen)?;
        while cursor.pending.is_empty() {
            if cursor.next_page >= self.file.num_pages()? {
                return Ok(false);
            }
            let pid = PageId::new(self.file.id(), cursor.next_page);
            let page = self.pool.get_page(self.txn, pid, Permissions::ReadOnly)?;
            let tuples = HeapPage::from_page(&**page.read())?.tuples()?;
            cursor.pending.extend(tuples);
            cursor.next_page += 1;
        }
        Ok(true)
    }
}

impl DbFileIterator for HeapFileIterator<'_> {
    fn open(&mut self) -> Result<()> {
        if self.cursor.is_some() {
            return Err(DbError::IteratorAlreadyOpen);
        }
        self.cursor = Some(Cursor::start());
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.fill()
    }

    fn next_tuple(&mut self) -> Result<Tuple> {
        if !self.fill()? {
            return Err(DbError::IteratorExhausted);
        }
        self.cursor
            .as_mut()
            .and_then(|c| c.pending.pop_front())
            .ok_or(DbError::IteratorExhausted)
    }

    fn rewind(&mut self) -> Result<()> {
        let cursor = self.cursor.as_mut().ok_or(DbError::IteratorNotOpen)?;
        *cursor = Cursor::start();
        Ok(())
    }

    fn close(&mut self) {
        self.cursor = None;
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_open() {
            return None;
        }
        match self.fill() {
            Ok(true) => Some(self.next_tuple()),
            Ok(false) => None,
            Err(e) => {
                // Stop after reporting the failure
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}
