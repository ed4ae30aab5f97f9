use std::collections::HashMap;
use crate::core::error::DbError;
use crate::core::types::Table;
use super::Storage;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: HashMap<String, Table>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage {
            tables: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get_table(&self, table_name: &str) -> Option<&Table> {
        self.tables.get(table_name)
    }
}

impl Storage for MemoryStorage {
    fn load(&self, table_name: &str) -> Result<Table, DbError> {
        self.tables
            .get(table_name)
            .cloned()
            .ok_or_else(|| DbError::table_not_found(table_name))
    }

    fn persist(&mut self, table_name: &str, table: &Table) -> Result<(), DbError> {
        self.tables.insert(table_name.to_string(), table.clone());
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>, DbError> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
