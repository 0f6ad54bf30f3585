use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::{PageId, TransactionId};

/// A cached page of some table file.
///
/// The dirty marker names the transaction that last modified the page. It is
/// set while that transaction holds the page's exclusive lock and cleared
/// when the page is flushed.
pub trait Page: Send + Sync + fmt::Debug {
    fn id(&self) -> PageId;

    /// Serializes the page into a `PAGE_SIZE` byte image.
    fn page_data(&self) -> Vec<u8>;

    fn is_dirty(&self) -> Option<TransactionId>;

    fn mark_dirty(&mut self, txn: Option<TransactionId>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to a resident page. Every caller asking the buffer pool for
/// the same id gets a clone of the same handle.
pub type PageRef = Arc<RwLock<Box<dyn Page>>>;
