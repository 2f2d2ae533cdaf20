//! In-memory row storage.
//!
//! Rows are grouped by table in first-insertion order. Every appended row is
//! completed with the benchmark version, system facts and pending artifact
//! URLs, then frozen.

mod row;

use std::collections::BTreeMap;

use tracing::{debug, warn};

pub use row::{Row, Value};

/// Prefix of injected system-fact columns.
pub const META_PREFIX: &str = "meta_";

/// Column receiving the benchmark version.
pub const BENCHMARK_VERSION_COLUMN: &str = "benchmark_version";

/// Rows of one table, in insertion order.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Artifact URLs saved so far. Each entry applies to rows added after it.
#[derive(Debug, Clone, Default)]
pub struct ArtifactLog {
    entries: Vec<(String, String)>,
}

impl ArtifactLog {
    pub fn record(&mut self, column: impl Into<String>, url: impl Into<String>) {
        self.entries.push((column.into(), url.into()));
    }

    /// Current `column -> url` view; later saves win.
    pub fn current(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|(c, u)| (c.as_str(), u.as_str()))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct RowStore {
    tables: Vec<Table>,
    artifacts: ArtifactLog,
    system_facts: BTreeMap<String, String>,
    benchmark_version: Option<String>,
}

impl RowStore {
    pub fn new(system_facts: BTreeMap<String, String>, benchmark_version: Option<String>) -> Self {
        RowStore {
            tables: Vec::new(),
            artifacts: ArtifactLog::default(),
            system_facts,
            benchmark_version,
        }
    }

    /// Append `row` to `table`. Returns `false` if the table name is empty or
    /// contains a path separator.
    ///
    /// Caller-supplied values always win over injected metadata and artifact
    /// URLs.
    pub fn add_row(&mut self, table: &str, mut row: Row) -> bool {
        if table.is_empty() {
            warn!("rejected row with empty table name");
            return false;
        }
        if table.contains(['/', '\\']) {
            warn!(table, "rejected row with path-like table name");
            return false;
        }

        if let Some(version) = &self.benchmark_version {
            row.set_missing(BENCHMARK_VERSION_COLUMN, version.as_str());
        }
        for (fact, value) in &self.system_facts {
            row.set_missing(&format!("{META_PREFIX}{fact}"), value.as_str());
        }
        for (column, url) in self.artifacts.current() {
            row.set_missing(column, url);
        }

        match self.tables.iter_mut().find(|t| t.name == table) {
            Some(t) => t.rows.push(row),
            None => {
                debug!(table, "created table");
                self.tables.push(Table {
                    name: table.to_string(),
                    rows: vec![row],
                });
            }
        }
        true
    }

    /// JSON entry point: rejects values that are not objects of scalars.
    pub fn add_json_row(&mut self, table: &str, row: serde_json::Value) -> bool {
        match Row::from_json(row) {
            Some(row) => self.add_row(table, row),
            None => {
                warn!(table, "rejected row that is not an object of scalar values");
                false
            }
        }
    }

    /// Make `url` the value of `column` for rows added from now on.
    pub fn record_artifact(&mut self, column: &str, url: &str) {
        self.artifacts.record(column, url);
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}
