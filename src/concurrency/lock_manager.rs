//! Page-level two-phase locking.
//!
//! Each page is held either exclusively by one transaction or shared by any
//! number of them. A blocked request sleeps on its page's condition variable,
//! which only releases of that page signal. Every wait interval that passes
//! without the lock being granted counts as one failed attempt, and a
//! transaction that exceeds its retry budget is told to abort. There is no
//! wait-for graph: bounded waiting is the only deadlock handling.
//!
//! # Lock Compatibility Matrix
//!
//! ```text
//!          │ S  │ X  │
//! ─────────┼────┼────┤
//!     S    │ ✓  │ ✗  │
//!     X    │ ✗  │ ✗  │
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::common::{DbError, LockConfig, PageId, Permissions, Result, TransactionId};

/// Lock mode for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock (read lock).
    Shared,
    /// Exclusive lock (write lock).
    Exclusive,
}

impl LockMode {
    pub fn is_compatible_with(&self, other: &LockMode) -> bool {
        matches!((self, other), (LockMode::Shared, LockMode::Shared))
    }

    /// Returns true if holding `self` makes a request for `requested` a no-op.
    pub fn covers(&self, requested: &LockMode) -> bool {
        *self == LockMode::Exclusive || *requested == LockMode::Shared
    }
}

impl From<Permissions> for LockMode {
    fn from(perm: Permissions) -> Self {
        match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => write!(f, "S"),
            LockMode::Exclusive => write!(f, "X"),
        }
    }
}

/// Holders of one page's lock.
#[derive(Debug)]
struct PageLock {
    mode: LockMode,
    holders: HashSet<TransactionId>,
}

impl PageLock {
    fn new(mode: LockMode) -> Self {
        Self {
            mode,
            holders: HashSet::new(),
        }
    }

    fn can_grant(&self, txn: TransactionId, mode: LockMode) -> bool {
        if self.holders.is_empty() {
            return true;
        }
        if self.holders.contains(&txn) {
            // Upgrade only when no one else shares the page
            return self.mode.covers(&mode) || self.holders.len() == 1;
        }
        mode.is_compatible_with(&self.mode)
    }

    /// Grants the lock. Returns true if this was a shared-to-exclusive upgrade.
    fn grant(&mut self, txn: TransactionId, mode: LockMode) -> bool {
        let upgrade = !self.holders.is_empty() && !self.mode.covers(&mode);
        if self.holders.is_empty() || upgrade {
            self.mode = mode;
        }
        self.holders.insert(txn);
        upgrade
    }
}

/// Counters describing lock manager activity.
#[derive(Debug, Default)]
pub struct LockStats {
    pub acquisitions: AtomicU64,
    pub upgrades: AtomicU64,
    /// Wait intervals that ended without a grant.
    pub waits: AtomicU64,
    /// Requests that ran out of retries.
    pub aborts: AtomicU64,
}

impl LockStats {
    fn record(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<PageId, PageLock>,
    /// Pages each transaction holds a lock on
    txn_pages: HashMap<TransactionId, HashSet<PageId>>,
    /// Failed attempts since the transaction's last successful acquisition
    retries: HashMap<TransactionId, u32>,
    /// Wake-up signal per page with blocked requests
    waiters: HashMap<PageId, Arc<Condvar>>,
}

impl LockTable {
    /// Grants the lock if compatible. Returns `Some(upgraded)` on success.
    fn try_grant(&mut self, txn: TransactionId, pid: PageId, mode: LockMode) -> Option<bool> {
        let lock = self.locks.entry(pid).or_insert_with(|| PageLock::new(mode));
        if !lock.can_grant(txn, mode) {
            return None;
        }
        let upgraded = lock.grant(txn, mode);
        self.txn_pages.entry(txn).or_default().insert(pid);
        Some(upgraded)
    }

    /// The signal blocked requests on `pid` sleep on.
    fn waiter(&mut self, pid: PageId) -> Arc<Condvar> {
        self.waiters.entry(pid).or_default().clone()
    }

    /// Drops the page's signal once the caller is its last user.
    fn forget_waiter(&mut self, pid: PageId, signal: &Arc<Condvar>) {
        let last = self
            .waiters
            .get(&pid)
            .is_some_and(|s| Arc::ptr_eq(s, signal) && Arc::strong_count(s) == 2);
        if last {
            self.waiters.remove(&pid);
        }
    }

    /// Wakes every request blocked on `pid`.
    fn wake(&mut self, pid: PageId) {
        if let Some(signal) = self.waiters.remove(&pid) {
            signal.notify_all();
        }
    }

    fn remove_holder(&mut self, txn: TransactionId, pid: PageId) -> bool {
        let Some(lock) = self.locks.get_mut(&pid) else {
            return false;
        };
        let removed = lock.holders.remove(&txn);
        if lock.holders.is_empty() {
            self.locks.remove(&pid);
        }
        removed
    }
}

/// Grants and revokes per-page shared and exclusive locks.
pub struct LockManager {
    config: LockConfig,
    table: Mutex<LockTable>,
    stats: LockStats,
}

impl LockManager {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            table: Mutex::new(LockTable::default()),
            stats: LockStats::default(),
        }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Acquires `mode` on `pid` for `txn`, blocking while incompatible locks
    /// are held. Fails with `TransactionAborted` once the transaction has
    /// failed more than `retry_limit` attempts. Releases of other pages never
    /// use up an attempt.
    pub fn acquire(&self, txn: TransactionId, pid: PageId, mode: LockMode) -> Result<()> {
        let mut table = self.table.lock();
        let mut signal: Option<Arc<Condvar>> = None;
        let mut attempt_ends: Option<Instant> = None;
        loop {
            if let Some(upgraded) = table.try_grant(txn, pid, mode) {
                if let Some(signal) = &signal {
                    table.forget_waiter(pid, signal);
                }
                table.retries.remove(&txn);
                LockStats::record(&self.stats.acquisitions);
                if upgraded {
                    LockStats::record(&self.stats.upgrades);
                    debug!(%txn, page = %pid, "Upgraded lock to exclusive");
                }
                return Ok(());
            }

            let now = Instant::now();
            let end = match attempt_ends {
                Some(end) if now < end => end,
                _ => {
                    let attempts = table.retries.entry(txn).or_insert(0);
                    *attempts += 1;
                    if *attempts > self.config.retry_limit {
                        let attempts = *attempts;
                        if let Some(signal) = &signal {
                            table.forget_waiter(pid, signal);
                        }
                        LockStats::record(&self.stats.aborts);
                        warn!(%txn, page = %pid, %mode, attempts, "Lock retry budget exhausted");
                        return Err(DbError::TransactionAborted(txn));
                    }
                    LockStats::record(&self.stats.waits);
                    let end = now + self.config.wait_interval;
                    attempt_ends = Some(end);
                    end
                }
            };

            // A release replaces the page's signal, so fetch it on every pass
            let current = table.waiter(pid);
            current.wait_until(&mut table, end);
            signal = Some(current);
        }
    }

    /// Releases `txn`'s lock on `pid`. Returns false if it held none.
    pub fn release(&self, txn: TransactionId, pid: PageId) -> bool {
        let mut table = self.table.lock();
        let removed = table.remove_holder(txn, pid);
        if let Some(pages) = table.txn_pages.get_mut(&txn) {
            pages.remove(&pid);
            if pages.is_empty() {
                table.txn_pages.remove(&txn);
            }
        }
        if removed {
            table.wake(pid);
        }
        removed
    }

    /// Releases every lock held by `txn` and forgets its retry count.
    /// Returns the number of locks released.
    pub fn release_all(&self, txn: TransactionId) -> usize {
        let mut table = self.table.lock();
        let pages = table.txn_pages.remove(&txn).unwrap_or_default();
        for pid in &pages {
            table.remove_holder(txn, *pid);
            table.wake(*pid);
        }
        table.retries.remove(&txn);

        if !pages.is_empty() {
            debug!(%txn, count = pages.len(), "Released all locks");
        }
        pages.len()
    }

    pub fn holds(&self, txn: TransactionId, pid: PageId) -> bool {
        self.lock_mode(txn, pid).is_some()
    }

    /// The mode `txn` holds on `pid`, if any.
    pub fn lock_mode(&self, txn: TransactionId, pid: PageId) -> Option<LockMode> {
        let table = self.table.lock();
        table
            .locks
            .get(&pid)
            .filter(|lock| lock.holders.contains(&txn))
            .map(|lock| lock.mode)
    }

    /// Pages `txn` holds a lock on, in ascending order.
    pub fn locked_pages(&self, txn: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<PageId> = table
            .txn_pages
            .get(&txn)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    pub fn stats(&self) -> &LockStats {
        &self.stats
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new(LockConfig::default())
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock();
        f.debug_struct("LockManager")
            .field("locked_pages", &table.locks.len())
            .field("transactions", &table.txn_pages.len())
            .finish()
    }
}
