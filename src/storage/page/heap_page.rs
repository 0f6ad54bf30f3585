use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Page, SlottedPage};
use crate::common::{DbError, PageId, RecordId, Result, SlotId, TransactionId, PAGE_SIZE};
use crate::tuple::{Schema, Tuple};

/// A page of a heap file: a slotted page whose records are encoded tuples of
/// one schema.
pub struct HeapPage {
    pid: PageId,
    schema: Arc<Schema>,
    data: Box<[u8]>,
    dirtied_by: Option<TransactionId>,
}

impl HeapPage {
    /// Builds a page from its on-disk image, checking the slot directory.
    pub fn new(pid: PageId, data: &[u8], schema: Arc<Schema>) -> Result<Self> {
        if data.len() != PAGE_SIZE || !SlottedPage::new(data).is_well_formed() {
            return Err(DbError::Corrupted(pid));
        }

        let mut data: Box<[u8]> = data.into();
        SlottedPage::new(&mut data[..]).set_page_number(pid.page_number());

        Ok(Self {
            pid,
            schema,
            data,
            dirtied_by: None,
        })
    }

    /// Image of a page holding no tuples.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    /// Borrows the heap page behind a type-erased page.
    pub fn from_page(page: &dyn Page) -> Result<&HeapPage> {
        page.as_any()
            .downcast_ref::<HeapPage>()
            .ok_or(DbError::UnexpectedPageType(page.id()))
    }

    pub fn from_page_mut(page: &mut dyn Page) -> Result<&mut HeapPage> {
        let pid = page.id();
        page.as_any_mut()
            .downcast_mut::<HeapPage>()
            .ok_or(DbError::UnexpectedPageType(pid))
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn slots(&self) -> SlottedPage<&[u8]> {
        SlottedPage::new(&self.data[..])
    }

    pub fn tuple_count(&self) -> usize {
        self.slots().tuple_count()
    }

    /// Returns whether an encoded tuple of `len` bytes fits on this page.
    pub fn has_room(&self, len: usize) -> bool {
        self.slots().can_insert(len)
    }

    /// Stores the tuple and points its record id at the chosen slot.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> Result<()> {
        let bytes = tuple.to_bytes()?;
        let slot = SlottedPage::new(&mut self.data[..]).insert_tuple(&bytes)?;
        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        Ok(())
    }

    /// Removes the tuple named by the record id of `tuple`.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<()> {
        let rid = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        if rid.page_id != self.pid {
            return Err(DbError::TupleNotFound(self.pid));
        }
        SlottedPage::new(&mut self.data[..]).delete_tuple(rid.slot_id)
    }

    /// Decodes the tuple stored in one slot.
    pub fn tuple(&self, slot_id: SlotId) -> Result<Tuple> {
        let slots = self.slots();
        let bytes = slots.get_tuple(slot_id)?;
        let mut tuple =
            Tuple::from_bytes(self.schema.clone(), bytes).ok_or(DbError::Corrupted(self.pid))?;
        tuple.set_record_id(Some(RecordId::new(self.pid, slot_id)));
        Ok(tuple)
    }

    /// Decodes every stored tuple in slot order.
    pub fn tuples(&self) -> Result<Vec<Tuple>> {
        self.slots().slot_ids().map(|slot| self.tuple(slot)).collect()
    }
}

impl Page for HeapPage {
    fn id(&self) -> PageId {
        self.pid
    }

    fn page_data(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    fn is_dirty(&self) -> Option<TransactionId> {
        self.dirtied_by
    }

    fn mark_dirty(&mut self, txn: Option<TransactionId>) {
        self.dirtied_by = txn;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapPage")
            .field("pid", &self.pid)
            .field("tuples", &self.tuple_count())
            .field("dirtied_by", &self.dirtied_by)
            .finish()
    }
}
