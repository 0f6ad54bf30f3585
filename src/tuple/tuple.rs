use std::fmt;
use std::sync::Arc;

use crate::common::{DbError, RecordId, Result};

use super::{Schema, Value};

/// A row of a table, plus the location it was read from or written to.
///
/// ## Encoding
///
/// ```text
/// +-------------+-----------------+--------------------+
/// | Null Bitmap | Fixed columns   | Variable columns   |
/// | (N bytes)   | (schema order)  | (u16 len + bytes)  |
/// +-------------+-----------------+--------------------+
/// ```
///
/// Bit `i % 8` of bitmap byte `i / 8` is set when column `i` is NULL. NULL
/// fixed columns are written as zeros of their width, NULL variable columns
/// as a zero length.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a tuple that has not been stored yet.
    ///
    /// # Panics
    /// Panics if the number of values doesn't match the schema column count.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            schema.column_count(),
            "Value count must match schema column count"
        );
        Self {
            schema,
            values,
            record_id: None,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.values.get(i))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Replaces the value of one column. Returns false if the index is out of range.
    pub fn set_value(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Where this tuple lives on disk, if it has been stored.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Encodes the tuple, checking every value against its column.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; self.schema.null_bitmap_size()];
        for (i, (col, value)) in self.schema.columns().zip(&self.values).enumerate() {
            if value.is_null() {
                if !col.is_nullable() {
                    return Err(DbError::NullViolation(col.name().to_string()));
                }
                bytes[i / 8] |= 1 << (i % 8);
            }
        }

        // Fixed-width columns first, then the variable ones
        for fixed_pass in [true, false] {
            for (col, value) in self.schema.columns().zip(&self.values) {
                if col.data_type().is_fixed_size() != fixed_pass {
                    continue;
                }
                if !value.encode(col.data_type(), &mut bytes) {
                    return Err(DbError::TypeMismatch {
                        column: col.name().to_string(),
                        expected: col.data_type().to_string(),
                    });
                }
            }
        }

        Ok(bytes)
    }

    /// Decodes a tuple written by [`Tuple::to_bytes`]. Returns None if `data`
    /// is too short for the schema.
    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Option<Self> {
        let bitmap_len = schema.null_bitmap_size();
        if data.len() < bitmap_len {
            return None;
        }
        let (bitmap, mut rest) = data.split_at(bitmap_len);
        let is_null = |i: usize| bitmap[i / 8] & (1 << (i % 8)) != 0;

        let mut values = vec![Value::Null; schema.column_count()];
        for fixed_pass in [true, false] {
            for (i, col) in schema.columns().enumerate() {
                if col.data_type().is_fixed_size() != fixed_pass {
                    continue;
                }
                let value = Value::decode(col.data_type(), &mut rest)?;
                if !is_null(i) {
                    values[i] = value;
                }
            }
        }

        Some(Self {
            schema,
            values,
            record_id: None,
        })
    }
}

/// Tuples compare by schema and values; the record id is ignored.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

/// Builder for constructing tuples fluently.
pub struct TupleBuilder {
    schema: Arc<Schema>,
    values: Vec<Value>,
    next: usize,
}

impl TupleBuilder {
    pub fn new(schema: Arc<Schema>) -> Self {
        let count = schema.column_count();
        Self {
            schema,
            values: vec![Value::Null; count],
            next: 0,
        }
    }

    /// Sets the next column in schema order.
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        if let Some(slot) = self.values.get_mut(self.next) {
            *slot = value.into();
            self.next += 1;
        }
        self
    }

    /// Leaves the next column NULL.
    pub fn null(mut self) -> Self {
        if self.next < self.values.len() {
            self.next += 1;
        }
        self
    }

    /// Sets a column by name. Unknown names are ignored.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        if let Some(index) = self.schema.column_index(name) {
            self.values[index] = value.into();
        }
        self
    }

    pub fn build(self) -> Tuple {
        Tuple::new(self.schema, self.values)
    }
}
