use thiserror::Error;

use super::types::{PageId, TableId, TransactionId};

/// Broad category of a [`DbError`], used by callers to decide how to unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The transaction must be aborted via `transaction_complete(txn, false)`.
    Abort,
    /// The backing file could not be read or written.
    Storage,
    /// No room for the requested data.
    Capacity,
    /// Programmer-level misuse of the API.
    Usage,
}

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("{0} aborted: lock not acquired within the retry budget")]
    TransactionAborted(TransactionId),

    #[error("Buffer pool is full: all {capacity} resident pages are dirty")]
    BufferPoolFull { capacity: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table file {path} has length {len}, not a multiple of the page size")]
    InvalidTableFile { path: String, len: u64 },

    #[error("{0} lies past the end of its table file")]
    PageOutOfRange(PageId),

    #[error("Page overflow: tuple size {tuple_size} exceeds available space {available}")]
    PageOverflow { tuple_size: usize, available: usize },

    #[error("Tuple of {0} bytes can never fit in a page")]
    TupleTooLarge(usize),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table '{0}' not found")]
    TableNameNotFound(String),

    #[error("Tuple schema does not match table {0}")]
    SchemaMismatch(TableId),

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Tuple not found on {0}")]
    TupleNotFound(PageId),

    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(u16),

    #[error("Slot {0} is empty")]
    EmptySlot(u16),

    #[error("Iterator is already open")]
    IteratorAlreadyOpen,

    #[error("Iterator is not open")]
    IteratorNotOpen,

    #[error("Iterator has no more tuples")]
    IteratorExhausted,

    #[error("Value for column '{column}' does not match type {expected}")]
    TypeMismatch { column: String, expected: String },

    #[error("Column '{0}' is not nullable")]
    NullViolation(String),

    #[error("Corrupted tuple data on {0}")]
    Corrupted(PageId),

    #[error("{0} is not a heap page")]
    UnexpectedPageType(PageId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

impl DbError {
    /// Classifies the error.
    pub fn class(&self) -> ErrorClass {
        match self {
            DbError::TransactionAborted(_) | DbError::BufferPoolFull { .. } => ErrorClass::Abort,
            DbError::Io(_) | DbError::InvalidTableFile { .. } | DbError::PageOutOfRange(_) => {
                ErrorClass::Storage
            }
            DbError::PageOverflow { .. } | DbError::TupleTooLarge(_) => ErrorClass::Capacity,
            _ => ErrorClass::Usage,
        }
    }

    /// Returns true if the caller must abort its transaction.
    pub fn is_abort(&self) -> bool {
        self.class() == ErrorClass::Abort
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
