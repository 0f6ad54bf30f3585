//! Registry of open tables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{DbError, Result, TableId};
use crate::storage::DbFile;
use crate::tuple::Schema;

/// A registered table.
#[derive(Clone)]
pub struct TableInfo {
    pub name: String,
    pub file: Arc<dyn DbFile>,
}

#[derive(Default)]
struct Tables {
    by_id: HashMap<TableId, TableInfo>,
    by_name: HashMap<String, TableId>,
}

/// Maps table ids and names to their files.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<Tables>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `file` under `name`. An existing table with the same name or
    /// the same id is replaced.
    pub fn add_table(&self, file: Arc<dyn DbFile>, name: impl Into<String>) {
        let name = name.into();
        let id = file.id();
        let mut tables = self.tables.write();

        if let Some(old_id) = tables.by_name.remove(&name) {
            tables.by_id.remove(&old_id);
        }
        if let Some(old) = tables.by_id.remove(&id) {
            tables.by_name.remove(&old.name);
        }

        debug!(table = %id, %name, "Registered table");
        tables.by_name.insert(name.clone(), id);
        tables.by_id.insert(id, TableInfo { name, file });
    }

    pub fn file(&self, id: TableId) -> Result<Arc<dyn DbFile>> {
        self.info(id).map(|info| info.file)
    }

    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.tables
            .read()
            .by_name
            .get(name)
            .copied()
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    pub fn schema(&self, id: TableId) -> Result<Arc<Schema>> {
        self.info(id).map(|info| info.file.schema().clone())
    }

    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.info(id).map(|info| info.name)
    }

    fn info(&self, id: TableId) -> Result<TableInfo> {
        self.tables
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(DbError::TableNotFound(id))
    }

    /// Ids of every registered table, ascending.
    pub fn table_ids(&self) -> Vec<TableId> {
        let mut ids: Vec<TableId> = self.tables.read().by_id.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_id.clear();
        tables.by_name.clear();
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_map()
            .entries(tables.by_name.iter().map(|(name, id)| (name, id)))
            .finish()
    }
}
