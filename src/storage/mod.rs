//! On-disk table storage: page formats, the per-file disk manager and heap files.

mod db_file;
pub mod disk;
pub mod heap;
pub mod page;

pub use db_file::{DbFile, DbFileIterator};
