use crate::common::{DbError, Result, SlotId, PAGE_SIZE};

/// Slotted page layout:
///
/// ```text
/// +------------------+ 0
/// | page_number u32  |
/// | num_slots   u16  |
/// | data_bytes  u16  |
/// +------------------+ HEADER_SIZE
/// | [slot 0]         |  (offset u16, length u16)
/// | [slot 1]         |
/// | ...              |
/// +------------------+ free_space_start
/// | Free Space       |
/// +------------------+ free_space_end = PAGE_SIZE - data_bytes
/// | [tuple n]        |
/// | ...              |
/// | [tuple 0]        |
/// +------------------+ PAGE_SIZE
/// ```
///
/// A slot with length 0 is free. Every field is zero on a fresh page, so an
/// all-zero buffer is a valid empty page.
pub const HEADER_SIZE: usize = 8;

/// Size of each slot entry in bytes
pub const SLOT_SIZE: usize = 4;

/// Largest record an empty page can hold.
pub const MAX_TUPLE_SIZE: usize = PAGE_SIZE - HEADER_SIZE - SLOT_SIZE;

const PAGE_NUMBER_OFFSET: usize = 0;
const NUM_SLOTS_OFFSET: usize = 4;
const DATA_BYTES_OFFSET: usize = 6;

/// Represents a slot entry in the slot array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    pub offset: u16,
    pub length: u16,
}

impl SlotEntry {
    pub fn is_free(&self) -> bool {
        self.length == 0
    }
}

/// View over a page-sized buffer interpreting it as a slotted page.
///
/// Read accessors work on any `AsRef<[u8]>`; mutation needs `AsMut<[u8]>` too,
/// so the same type serves as both a shared and an exclusive view.
pub struct SlottedPage<B> {
    data: B,
}

impl<B: AsRef<[u8]>> SlottedPage<B> {
    pub fn new(data: B) -> Self {
        debug_assert_eq!(data.as_ref().len(), PAGE_SIZE);
        Self { data }
    }

    fn read_u16(&self, offset: usize) -> u16 {
        let d = self.data.as_ref();
        u16::from_le_bytes([d[offset], d[offset + 1]])
    }

    pub fn page_number(&self) -> u32 {
        let d = &self.data.as_ref()[PAGE_NUMBER_OFFSET..PAGE_NUMBER_OFFSET + 4];
        u32::from_le_bytes([d[0], d[1], d[2], d[3]])
    }

    pub fn num_slots(&self) -> u16 {
        self.read_u16(NUM_SLOTS_OFFSET)
    }

    /// Bytes between `free_space_end` and the end of the page, including
    /// records left behind by deletes.
    pub fn data_bytes(&self) -> u16 {
        self.read_u16(DATA_BYTES_OFFSET)
    }

    pub fn free_space_start(&self) -> usize {
        HEADER_SIZE + self.num_slots() as usize * SLOT_SIZE
    }

    pub fn free_space_end(&self) -> usize {
        PAGE_SIZE.saturating_sub(self.data_bytes() as usize)
    }

    /// Contiguous gap between the slot array and the record area.
    pub fn free_space(&self) -> usize {
        self.free_space_end().saturating_sub(self.free_space_start())
    }

    /// Space available after compaction.
    fn reclaimable_space(&self) -> usize {
        let live: usize = self.slots().map(|(_, e)| e.length as usize).sum();
        PAGE_SIZE.saturating_sub(self.free_space_start() + live)
    }

    pub fn slot(&self, slot_id: SlotId) -> Option<SlotEntry> {
        if slot_id.as_u16() >= self.num_slots() {
            return None;
        }
        let base = HEADER_SIZE + slot_id.as_u16() as usize * SLOT_SIZE;
        Some(SlotEntry {
            offset: self.read_u16(base),
            length: self.read_u16(base + 2),
        })
    }

    fn slots(&self) -> impl Iterator<Item = (SlotId, SlotEntry)> + '_ {
        (0..self.num_slots()).filter_map(move |i| {
            let id = SlotId::new(i);
            self.slot(id).map(|e| (id, e))
        })
    }

    fn first_free_slot(&self) -> Option<SlotId> {
        self.slots().find(|(_, e)| e.is_free()).map(|(id, _)| id)
    }

    /// Returns whether a record of `len` bytes fits, counting space that a
    /// compaction would recover.
    pub fn can_insert(&self, len: usize) -> bool {
        let slot_cost = if self.first_free_slot().is_some() {
            0
        } else {
            SLOT_SIZE
        };
        len > 0 && self.reclaimable_space() >= len + slot_cost
    }

    pub fn get_tuple(&self, slot_id: SlotId) -> Result<&[u8]> {
        let entry = self
            .slot(slot_id)
            .ok_or(DbError::InvalidSlotId(slot_id.as_u16()))?;
        if entry.is_free() {
            return Err(DbError::EmptySlot(slot_id.as_u16()));
        }
        let start = entry.offset as usize;
        Ok(&self.data.as_ref()[start..start + entry.length as usize])
    }

    /// Ids of the occupied slots, ascending.
    pub fn slot_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots().filter(|(_, e)| !e.is_free()).map(|(id, _)| id)
    }

    pub fn tuple_count(&self) -> usize {
        self.slot_ids().count()
    }

    /// Checks that the header and every occupied slot stay inside the page.
    pub fn is_well_formed(&self) -> bool {
        let start = self.free_space_start();
        let end = PAGE_SIZE - self.data_bytes().min(PAGE_SIZE as u16) as usize;
        start <= end
            && self.slots().all(|(_, e)| {
                e.is_free()
                    || (e.offset as usize >= end
                        && e.offset as usize + e.length as usize <= PAGE_SIZE)
            })
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> SlottedPage<B> {
    fn write_u16(&mut self, offset: usize, value: u16) {
        self.data.as_mut()[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn set_page_number(&mut self, page_number: u32) {
        self.data.as_mut()[PAGE_NUMBER_OFFSET..PAGE_NUMBER_OFFSET + 4]
            .copy_from_slice(&page_number.to_le_bytes());
    }

    fn set_num_slots(&mut self, num_slots: u16) {
        self.write_u16(NUM_SLOTS_OFFSET, num_slots);
    }

    fn set_data_bytes(&mut self, data_bytes: u16) {
        self.write_u16(DATA_BYTES_OFFSET, data_bytes);
    }

    fn set_slot(&mut self, slot_id: SlotId, entry: SlotEntry) {
        let base = HEADER_SIZE + slot_id.as_u16() as usize * SLOT_SIZE;
        self.write_u16(base, entry.offset);
        self.write_u16(base + 2, entry.length);
    }

    /// Stores a record, reusing the lowest free slot if there is one.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> Result<SlotId> {
        if !self.can_insert(tuple.len()) {
            return Err(DbError::PageOverflow {
                tuple_size: tuple.len(),
                available: self.reclaimable_space().saturating_sub(SLOT_SIZE),
            });
        }

        let reused = self.first_free_slot();
        let slot_cost = if reused.is_some() { 0 } else { SLOT_SIZE };
        if self.free_space() < tuple.len() + slot_cost {
            self.compact();
        }

        let slot_id = match reused {
            Some(id) => id,
            None => {
                let id = SlotId::new(self.num_slots());
                self.set_num_slots(id.as_u16() + 1);
                id
            }
        };

        let offset = self.free_space_end() - tuple.len();
        self.data.as_mut()[offset..offset + tuple.len()].copy_from_slice(tuple);
        self.set_data_bytes((PAGE_SIZE - offset) as u16);
        self.set_slot(
            slot_id,
            SlotEntry {
                offset: offset as u16,
                length: tuple.len() as u16,
            },
        );

        Ok(slot_id)
    }

    /// Frees a slot. The record bytes stay until the next compaction.
    pub fn delete_tuple(&mut self, slot_id: SlotId) -> Result<()> {
        let entry = self
            .slot(slot_id)
            .ok_or(DbError::InvalidSlotId(slot_id.as_u16()))?;
        if entry.is_free() {
            return Err(DbError::EmptySlot(slot_id.as_u16()));
        }
        self.set_slot(slot_id, SlotEntry { offset: 0, length: 0 });
        Ok(())
    }

    /// Packs live records against the end of the page. Slot ids are unchanged.
    pub fn compact(&mut self) {
        let live: Vec<(SlotId, Vec<u8>)> = self
            .slot_ids()
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|id| self.get_tuple(id).ok().map(|t| (id, t.to_vec())))
            .collect();

        let mut end = PAGE_SIZE;
        for (slot_id, record) in live {
            end -= record.len();
            self.data.as_mut()[end..end + record.len()].copy_from_slice(&record);
            self.set_slot(
                slot_id,
                SlotEntry {
                    offset: end as u16,
                    length: record.len() as u16,
                },
            );
        }
        self.set_data_bytes((PAGE_SIZE - end) as u16);
    }
}
