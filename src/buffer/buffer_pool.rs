use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex, MutexGuard, RwLock};
use tracing::{debug, warn};

use super::LruReplacer;
use crate::catalog::Catalog;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::concurrency::LockManager;
use crate::storage::page::PageRef;
use crate::tuple::Tuple;

/// Resident pages and their replacement state.
struct PoolState {
    pages: HashMap<PageId, PageRef>,
    replacer: LruReplacer,
}

impl PoolState {
    /// Evicts the least recently used clean page. Pages another thread is
    /// writing right now are skipped.
    fn evict_clean(&mut self) -> Option<PageId> {
        let PoolState { pages, replacer } = self;
        let victim = replacer.evict_if(|pid| {
            pages.get(&pid).map_or(true, |page| {
                page.try_read()
                    .map_or(false, |guard| guard.is_dirty().is_none())
            })
        })?;
        pages.remove(&victim);
        Some(victim)
    }

    /// Resident pages whose dirty marker names `txn`.
    fn dirtied_by(&self, txn: TransactionId) -> Vec<PageId> {
        self.pages
            .iter()
            .filter(|(_, page)| page.read().is_dirty() == Some(txn))
            .map(|(pid, _)| *pid)
            .collect()
    }
}

/// BufferPool caches pages of every table in memory, at most `capacity` of
/// them at a time. Pages are handed out only after the requesting transaction
/// holds the matching lock.
///
/// Dirty pages are never evicted and never written before their transaction
/// commits, so an abort only has to throw the cached copies away.
pub struct BufferPool {
    capacity: usize,
    catalog: Arc<Catalog>,
    lock_manager: Arc<LockManager>,
    state: Mutex<PoolState>,
    /// Signalled when a page is flushed or leaves the cache
    space_freed: Condvar,
}

impl BufferPool {
    pub fn new(capacity: usize, catalog: Arc<Catalog>, lock_manager: Arc<LockManager>) -> Self {
        Self {
            capacity,
            catalog,
            lock_manager,
            state: Mutex::new(PoolState {
                pages: HashMap::with_capacity(capacity),
                replacer: LruReplacer::new(),
            }),
            space_freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident pages.
    pub fn len(&self) -> usize {
        self.state.lock().pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_cached(&self, pid: PageId) -> bool {
        self.state.lock().pages.contains_key(&pid)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.lock_manager
    }

    /// Returns the page with the given id, loading it from its table file on a
    /// miss. Blocks until `txn` holds the lock `perm` requires; fails with
    /// `TransactionAborted` if that takes too long.
    pub fn get_page(&self, txn: TransactionId, pid: PageId, perm: Permissions) -> Result<PageRef> {
        self.lock_manager.acquire(txn, pid, perm.into())?;

        let mut state = self.state.lock();
        if let Some(page) = state.pages.get(&pid).cloned() {
            state.replacer.record_access(pid);
            return Ok(page);
        }

        self.make_room(&mut state)?;
        let file = self.catalog.file(pid.table_id())?;
        let page: PageRef = Arc::new(RwLock::new(file.read_page(pid)?));
        state.pages.insert(pid, page.clone());
        state.replacer.record_access(pid);
        state.replacer.set_evictable(pid, true);
        debug!(%txn, page = %pid, "Loaded page into buffer pool");

        Ok(page)
    }

    /// Drops `txn`'s lock on a page before the transaction ends.
    pub fn release_page(&self, txn: TransactionId, pid: PageId) {
        self.lock_manager.release(txn, pid);
    }

    pub fn holds_lock(&self, txn: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds(txn, pid)
    }

    /// Adds `tuple` to the table, marking every page it touched dirty.
    pub fn insert_tuple(
        &self,
        txn: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        let pages = file.insert_tuple(self, txn, tuple)?;
        self.cache_dirty_pages(txn, pages)
    }

    /// Removes `tuple` from the table named by its record id.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        let file = self.catalog.file(rid.page_id.table_id())?;
        let pages = file.delete_tuple(self, txn, tuple)?;
        self.cache_dirty_pages(txn, pages)
    }

    /// Marks pages dirty under `txn` and makes sure they are resident.
    fn cache_dirty_pages(&self, txn: TransactionId, pages: Vec<PageRef>) -> Result<()> {
        let mut state = self.state.lock();
        for page in pages {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(txn));
                guard.id()
            };
            if !state.pages.contains_key(&pid) {
                self.make_room(&mut state)?;
                state.pages.insert(pid, page);
            }
            state.replacer.record_access(pid);
            state.replacer.set_evictable(pid, false);
        }
        Ok(())
    }

    /// Frees a slot if the pool is full. When every resident page is dirty,
    /// waits for a flush or discard for up to the lock wait budget, then
    /// fails with `BufferPoolFull`.
    fn make_room(&self, state: &mut MutexGuard<'_, PoolState>) -> Result<()> {
        let deadline = Instant::now() + self.lock_manager.config().max_wait();
        loop {
            if state.pages.len() < self.capacity {
                return Ok(());
            }
            if let Some(victim) = state.evict_clean() {
                debug!(page = %victim, "Evicted page");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(capacity = self.capacity, "Buffer pool full of dirty pages");
                return Err(DbError::BufferPoolFull {
                    capacity: self.capacity,
                });
            }
            self.space_freed.wait_until(state, deadline);
        }
    }

    /// Writes the page back to its table file if it is dirty.
    pub fn flush_page(&self, pid: PageId) -> Result<()> {
        let mut state = self.state.lock();
        self.flush_locked(&mut state, pid)?;
        drop(state);
        self.space_freed.notify_all();
        Ok(())
    }

    fn flush_locked(&self, state: &mut PoolState, pid: PageId) -> Result<()> {
        let Some(page) = state.pages.get(&pid) else {
            return Ok(());
        };
        {
            let mut guard = page.write();
            if guard.is_dirty().is_none() {
                return Ok(());
            }
            self.catalog.file(pid.table_id())?.write_page(&**guard)?;
            guard.mark_dirty(None);
        }
        state.replacer.set_evictable(pid, true);
        debug!(page = %pid, "Flushed page");
        Ok(())
    }

    /// Flushes every page dirtied by `txn`.
    pub fn flush_pages(&self, txn: TransactionId) -> Result<()> {
        let mut state = self.state.lock();
        let result = state
            .dirtied_by(txn)
            .into_iter()
            .try_for_each(|pid| self.flush_locked(&mut state, pid));
        drop(state);
        self.space_freed.notify_all();
        result
    }

    /// Flushes every dirty page. Writes uncommitted data; meant for shutdown
    /// and tests.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut state = self.state.lock();
        let pids: Vec<PageId> = state.pages.keys().copied().collect();
        let result = pids
            .into_iter()
            .try_for_each(|pid| self.flush_locked(&mut state, pid));
        drop(state);
        self.space_freed.notify_all();
        result
    }

    /// Drops a page from the cache without writing it.
    pub fn discard_page(&self, pid: PageId) {
        let mut state = self.state.lock();
        if state.pages.remove(&pid).is_some() {
            state.replacer.remove(pid);
            debug!(page = %pid, "Discarded page");
        }
        drop(state);
        self.space_freed.notify_all();
    }

    fn discard_pages(&self, txn: TransactionId) {
        let mut state = self.state.lock();
        for pid in state.dirtied_by(txn) {
            state.pages.remove(&pid);
            state.replacer.remove(pid);
        }
        drop(state);
        self.space_freed.notify_all();
    }

    /// Ends `txn`. On commit its dirty pages are written to disk; on abort, or
    /// if a write fails, they are dropped so the next read sees the on-disk
    /// state. Either way all of its locks are released.
    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) -> Result<()> {
        let result = if commit {
            self.flush_pages(txn)
        } else {
            Ok(())
        };

        if let Err(e) = &result {
            warn!(%txn, error = %e, "Commit failed, discarding dirty pages");
        }
        if !commit || result.is_err() {
            self.discard_pages(txn);
        }

        let released = self.lock_manager.release_all(txn);
        debug!(%txn, commit, released, "Transaction complete");
        result
    }
}
