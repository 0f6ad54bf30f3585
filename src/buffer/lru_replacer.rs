use std::collections::HashMap;

use crate::common::PageId;

type Timestamp = u64;

#[derive(Debug)]
struct AccessInfo {
    last_access: Timestamp,
    is_evictable: bool,
}

/// Least-recently-used replacement over resident pages.
///
/// Only pages marked evictable are candidates. The pool keeps clean pages
/// evictable and dirty pages pinned. The replacer is not synchronized on its
/// own; it lives inside the buffer pool's state mutex.
#[derive(Debug, Default)]
pub struct LruReplacer {
    current_timestamp: Timestamp,
    pages: HashMap<PageId, AccessInfo>,
    num_evictable: usize,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes the page's access marker, tracking it if new.
    /// New pages start out non-evictable.
    pub fn record_access(&mut self, page_id: PageId) {
        self.current_timestamp += 1;
        let now = self.current_timestamp;
        self.pages
            .entry(page_id)
            .and_modify(|info| info.last_access = now)
            .or_insert(AccessInfo {
                last_access: now,
                is_evictable: false,
            });
    }

    /// Sets whether a tracked page may be evicted. Untracked pages are ignored.
    pub fn set_evictable(&mut self, page_id: PageId, is_evictable: bool) {
        if let Some(info) = self.pages.get_mut(&page_id) {
            if info.is_evictable != is_evictable {
                if is_evictable {
                    self.num_evictable += 1;
                } else {
                    self.num_evictable -= 1;
                }
                info.is_evictable = is_evictable;
            }
        }
    }

    /// Evicts the least recently used evictable page.
    pub fn evict(&mut self) -> Option<PageId> {
        self.evict_if(|_| true)
    }

    /// Evicts the least recently used evictable page accepted by `can_evict`.
    /// Rejected candidates keep their position.
    pub fn evict_if(&mut self, mut can_evict: impl FnMut(PageId) -> bool) -> Option<PageId> {
        let mut candidates: Vec<(Timestamp, PageId)> = self
            .pages
            .iter()
            .filter(|(_, info)| info.is_evictable)
            .map(|(pid, info)| (info.last_access, *pid))
            .collect();
        candidates.sort_unstable();

        let victim = candidates
            .into_iter()
            .map(|(_, pid)| pid)
            .find(|pid| can_evict(*pid))?;
        self.remove(victim);
        Some(victim)
    }

    /// Stops tracking a page.
    pub fn remove(&mut self, page_id: PageId) {
        if let Some(info) = self.pages.remove(&page_id) {
            if info.is_evictable {
                self.num_evictable -= 1;
            }
        }
    }

    /// Returns the number of evictable pages.
    pub fn size(&self) -> usize {
        self.num_evictable
    }
}
