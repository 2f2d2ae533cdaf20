//! Column schemas for benchmark tables.
//!
//! A table schema is the overlay of a shared baseline (`common.json`) and a
//! table-specific column list (`<table>.json`). Columns are keyed by name and
//! always iterate in lexicographic order, which is also the CSV column order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DbError, DbResult};

/// Tables whose steady-state columns are dropped from the schema.
pub const STEADY_STATE_TABLES: &[&str] = &["fio", "wsat"];

/// Name prefix of steady-state columns.
pub const STEADY_STATE_PREFIX: &str = "ss_";

/// File name of the shared baseline column list.
pub const COMMON_SCHEMA_FILE: &str = "common.json";

/// Column data type as declared in the schema files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    String,
    Int,
    Float,
    Timestamp,
    Boolean,
    /// Schema bookkeeping only, never written to output.
    Index,
    Other(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Boolean => "boolean",
            ColumnType::Index => "index",
            ColumnType::Other(s) => s,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, ColumnType::Index)
    }
}

impl From<String> for ColumnType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "string" => ColumnType::String,
            "int" => ColumnType::Int,
            "float" => ColumnType::Float,
            "timestamp" => ColumnType::Timestamp,
            "boolean" => ColumnType::Boolean,
            "index" => ColumnType::Index,
            _ => ColumnType::Other(s),
        }
    }
}

impl From<ColumnType> for String {
    fn from(t: ColumnType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Any further keys of the column object (description, units, ...).
    #[serde(flatten)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Column {
            name: name.into(),
            column_type,
            meta: serde_json::Map::new(),
        }
    }
}

/// Resolved, immutable schema of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    columns: BTreeMap<String, Column>,
}

impl TableSchema {
    /// All columns, index columns included, in lexicographic name order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Columns written to output, in lexicographic name order.
    pub fn data_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values().filter(|c| !c.column_type.is_index())
    }

    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Where column lists come from.
pub trait SchemaSource {
    /// The baseline columns shared by every table.
    fn common(&self) -> DbResult<Vec<Column>>;

    /// The columns specific to `table`.
    fn table(&self, table: &str) -> DbResult<Vec<Column>>;
}

/// Reads `common.json` and `<table>.json` from a directory.
#[derive(Debug, Clone)]
pub struct DirSchemaSource {
    dir: PathBuf,
}

impl DirSchemaSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirSchemaSource { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, file_name: &str) -> DbResult<Vec<Column>> {
        let path = self.dir.join(file_name);
        let s = std::fs::read_to_string(&path).map_err(|e| {
            DbError::Config(format!("failed to read schema {}: {e}", path.display()))
        })?;
        serde_json::from_str(&s).map_err(|e| {
            DbError::Config(format!("failed to parse schema {}: {e}", path.display()))
        })
    }
}

impl SchemaSource for DirSchemaSource {
    fn common(&self) -> DbResult<Vec<Column>> {
        self.read(COMMON_SCHEMA_FILE)
    }

    fn table(&self, table: &str) -> DbResult<Vec<Column>> {
        self.read(&format!("{table}.json"))
    }
}

/// In-memory column lists, for embedding callers and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaSource {
    common: Vec<Column>,
    tables: HashMap<String, Vec<Column>>,
}

impl MemorySchemaSource {
    pub fn new(common: Vec<Column>) -> Self {
        MemorySchemaSource {
            common,
            tables: HashMap::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>, columns: Vec<Column>) -> Self {
        self.tables.insert(table.into(), columns);
        self
    }
}

impl SchemaSource for MemorySchemaSource {
    fn common(&self) -> DbResult<Vec<Column>> {
        Ok(self.common.clone())
    }

    fn table(&self, table: &str) -> DbResult<Vec<Column>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| DbError::Config(format!("no schema for table {table}")))
    }
}

/// Builds and caches table schemas.
pub struct SchemaRegistry {
    source: Box<dyn SchemaSource>,
    remove: Vec<String>,
    cache: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// `remove` names columns excluded from every schema.
    pub fn new(source: Box<dyn SchemaSource>, remove: Vec<String>) -> Self {
        SchemaRegistry {
            source,
            remove,
            cache: HashMap::new(),
        }
    }

    /// Returns the schema for `table`, building it on first use.
    pub fn schema(&mut self, table: &str) -> DbResult<&TableSchema> {
        if !self.cache.contains_key(table) {
            let schema = self.build(table)?;
            debug!(table, columns = schema.len(), "loaded schema");
            self.cache.insert(table.to_string(), schema);
        }
        Ok(&self.cache[table])
    }

    fn build(&self, table: &str) -> DbResult<TableSchema> {
        let mut columns = BTreeMap::new();
        for col in self.source.common()?.into_iter().chain(self.source.table(table)?) {
            if self.remove.iter().any(|r| *r == col.name) {
                continue;
            }
            columns.insert(col.name.clone(), col);
        }
        if STEADY_STATE_TABLES.contains(&table) {
            columns.retain(|name, _| !name.starts_with(STEADY_STATE_PREFIX));
        }
        Ok(TableSchema { columns })
    }
}
