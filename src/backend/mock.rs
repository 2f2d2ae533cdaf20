//! Mock importer for testing.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::schema::TableSchema;
use crate::{DbError, DbResult};

use super::traits::Importer;

/// One recorded `import` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCall {
    pub table: String,
    pub csv: PathBuf,
    /// CSV contents at import time, if the file was readable
    pub contents: Option<String>,
    /// Data columns of the schema passed in
    pub columns: Vec<String>,
}

/// Importer that records calls and fails on request.
#[derive(Debug, Clone, Default)]
pub struct MockImporter {
    calls: Arc<Mutex<Vec<ImportCall>>>,
    fail_all: bool,
    fail_tables: Vec<String>,
}

impl MockImporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every import fail.
    pub fn fails(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Make imports of `table` fail.
    pub fn fails_for(mut self, table: impl Into<String>) -> Self {
        self.fail_tables.push(table.into());
        self
    }

    /// Shared view of the recorded calls; stays valid after the importer is boxed.
    pub fn calls(&self) -> Arc<Mutex<Vec<ImportCall>>> {
        Arc::clone(&self.calls)
    }
}

impl Importer for MockImporter {
    fn name(&self) -> &str {
        "mock"
    }

    fn import(&self, table: &str, csv: &Path, schema: &TableSchema) -> DbResult<()> {
        let call = ImportCall {
            table: table.to_string(),
            csv: csv.to_path_buf(),
            contents: std::fs::read_to_string(csv).ok(),
            columns: schema.data_columns().map(|c| c.name.clone()).collect(),
        };
        self.calls
            .lock()
            .map_err(|_| DbError::Message("mock call log poisoned".into()))?
            .push(call);

        if self.fail_all || self.fail_tables.iter().any(|t| t == table) {
            return Err(DbError::Message(format!("mock import of {table} failed")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Column, ColumnType, MemorySchemaSource, SchemaRegistry};

    fn registry() -> SchemaRegistry {
        let source = MemorySchemaSource::new(vec![])
            .with_table("a", vec![Column::new("x", ColumnType::Int)])
            .with_table("b", vec![]);
        SchemaRegistry::new(Box::new(source), vec![])
    }

    #[test]
    fn test_records_calls() {
        let mut reg = registry();
        let mock = MockImporter::new();
        let calls = mock.calls();
        mock.import("a", Path::new("/missing.csv"), reg.schema("a").unwrap())
            .unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].table, "a");
        assert_eq!(calls[0].columns, vec!["x"]);
        assert!(calls[0].contents.is_none());
    }

    #[test]
    fn test_fails_for_table() {
        let mut reg = registry();
        let mock = MockImporter::new().fails_for("b");
        assert!(mock.import("a", Path::new("a.csv"), reg.schema("a").unwrap()).is_ok());
        assert!(mock.import("b", Path::new("b.csv"), reg.schema("b").unwrap()).is_err());
    }

    #[test]
    fn test_fails_all() {
        let mut reg = registry();
        let mock = MockImporter::new().fails();
        assert!(mock.import("a", Path::new("a.csv"), reg.schema("a").unwrap()).is_err());
    }
}
