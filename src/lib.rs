//! heapdb - a disk-oriented page store with a transactional buffer pool
//!
//! Tables live in heap files of fixed-size pages. Transactions read and modify
//! them through a shared buffer pool that caches pages in memory and hands each
//! one out only after the page lock has been granted.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): page formats and table files
//!   - `DiskManager`: page-granular reads and writes of one file
//!   - `SlottedPage`: variable-length records within a page
//!   - `HeapPage` / `HeapFile`: unordered tuple storage and sequential scans
//!
//! - **Buffer Pool** (`buffer`): page cache with LRU replacement of clean
//!   pages. Commit writes a transaction's dirty pages; abort drops them.
//!
//! - **Concurrency** (`concurrency`): page-level shared/exclusive locks with
//!   bounded waiting. A transaction that waits too long is told to abort.
//!
//! - **Catalog** (`catalog`): table ids and names to files and schemas.
//!
//! - **Tuples** (`tuple`): types, values, schemas and the tuple codec.
//!
//! # Example
//!
//! ```rust,no_run
//! use heapdb::common::DatabaseConfig;
//! use heapdb::tuple::{DataType, Schema, TupleBuilder};
//! use heapdb::storage::{DbFile, DbFileIterator};
//! use heapdb::Database;
//!
//! # fn main() -> heapdb::Result<()> {
//! let db = Database::new(DatabaseConfig::default())?;
//! let schema = Schema::builder()
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::VarChar(32))
//!     .build_arc();
//! let table = db.open_table("users.dat", "users", schema.clone())?;
//!
//! let txn = db.begin();
//! let mut tuple = TupleBuilder::new(schema).value(1).value("alice").build();
//! db.buffer_pool().insert_tuple(txn, table.id(), &mut tuple)?;
//! db.commit(txn)?;
//!
//! let txn = db.begin();
//! let mut scan = table.iterator(db.buffer_pool(), txn);
//! scan.open()?;
//! for tuple in scan {
//!     println!("{}", tuple?);
//! }
//! db.commit(txn)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
mod database;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, RecordId, Result, SlotId, TableId, TransactionId};
pub use database::Database;
