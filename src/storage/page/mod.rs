mod heap_page;
mod page;
mod slotted_page;

pub use heap_page::HeapPage;
pub use page::{Page, PageRef};
pub use slotted_page::{SlotEntry, SlottedPage, HEADER_SIZE, MAX_TUPLE_SIZE, SLOT_SIZE};
