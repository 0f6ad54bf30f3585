use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// Represents a single column in a table schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: bool,
}

impl Column {
    /// Creates a new column definition.
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

/// Ordered list of columns describing the tuples of one table.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    /// Map from column name to column index for fast lookup
    name_to_index: HashMap<String, usize>,
    /// Size of the null bitmap in bytes (ceiling of column_count / 8)
    null_bitmap_size: usize,
}

impl Schema {
    /// Creates a new schema from a list of columns.
    ///
    /// # Panics
    /// Panics if `columns` is empty; a tuple must encode to at least one byte.
    pub fn new(columns: Vec<Column>) -> Self {
        assert!(!columns.is_empty(), "Schema needs at least one column");

        let name_to_index = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.clone(), i))
            .collect();
        let null_bitmap_size = (columns.len() + 7) / 8;

        Self {
            columns,
            name_to_index,
            null_bitmap_size,
        }
    }

    /// Creates a schema builder for fluent construction.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn null_bitmap_size(&self) -> usize {
        self.null_bitmap_size
    }

    /// Returns the largest possible encoded tuple size for this schema.
    pub fn max_tuple_size(&self) -> usize {
        self.null_bitmap_size
            + self
                .columns
                .iter()
                .map(|c| c.data_type.max_size())
                .sum::<usize>()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for Schema {}

/// Builder for constructing schemas fluently.
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Adds a non-nullable column.
    pub fn column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type, false));
        self
    }

    /// Adds a nullable column.
    pub fn nullable_column(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.columns.push(Column::new(name, data_type, true));
        self
    }

    /// # Panics
    /// Panics if no column was added.
    pub fn build(self) -> Schema {
        Schema::new(self.columns)
    }

    /// Builds the schema wrapped in an Arc for shared ownership.
    ///
    /// # Panics
    /// Panics if no column was added.
    pub fn build_arc(self) -> Arc<Schema> {
        Arc::new(self.build())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
