//! Import contract between the dispatcher and storage backends.

use std::path::Path;

use crate::DbResult;
use crate::core::schema::TableSchema;

/// Loads a serialized table into a datastore.
///
/// Implementations must not panic on import failure: return `Err` and the
/// dispatcher records the table as failed while other tables proceed.
pub trait Importer {
    /// Backend name used in log messages (e.g., "mysql").
    fn name(&self) -> &str;

    /// Import the CSV file at `csv` into `table`.
    ///
    /// # Arguments
    /// * `table` - Base table name, before any configured prefix
    /// * `csv` - Path to the CSV file, header line included
    /// * `schema` - Schema the CSV was written with
    fn import(&self, table: &str, csv: &Path, schema: &TableSchema) -> DbResult<()>;
}

/// Importer that accepts everything and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopImporter;

impl Importer for NoopImporter {
    fn name(&self) -> &str {
        "noop"
    }

    fn import(&self, _table: &str, _csv: &Path, _schema: &TableSchema) -> DbResult<()> {
        Ok(())
    }
}
