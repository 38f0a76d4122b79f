use std::collections::BTreeMap;
use std::sync::Mutex;

use super::TableStore;
use crate::error::{FtopwspError, Result};
use crate::table::Table;

/// In-process table store keyed by stem.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, builder-style.
    pub fn with(self, stem: &str, table: Table) -> Self {
        self.lock().insert(stem.to_string(), table);
        self
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, stem: &str) -> bool {
        self.lock().contains_key(stem)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Table>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TableStore for MemoryStore {
    fn list(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    fn read(&self, stem: &str) -> Result<Table> {
        self.lock()
            .get(stem)
            .cloned()
            .ok_or_else(|| FtopwspError::NotFound(stem.to_string()))
    }

    fn write(&self, stem: &str, table: &Table) -> Result<()> {
        self.lock().insert(stem.to_string(), table.clone());
        Ok(())
    }
}
