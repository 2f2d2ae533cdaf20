//! CSV export for benchmark tables.
//!
//! The dialect is deliberately minimal and matches what the import tools
//! expect: a field is quoted only when it contains a comma, and embedded
//! double quotes inside a quoted field are escaped with a backslash. Nothing
//! else is escaped.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::schema::TableSchema;
use crate::store::Row;
use crate::{DbError, DbResult};

/// Path of the CSV file for `table` inside `dir`.
pub fn csv_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.csv"))
}

/// Quote `value` if it contains a comma.
pub fn quote_field(value: &str) -> Cow<'_, str> {
    if value.contains(',') {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\\\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Writes rows in schema column order, skipping index columns.
#[derive(Debug, Clone, Default)]
pub struct CsvExporter;

impl CsvExporter {
    pub fn new() -> Self {
        CsvExporter
    }

    /// Export rows to a CSV file, replacing any existing file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn export(&self, schema: &TableSchema, rows: &[Row], output: &Path) -> DbResult<()> {
        let file = File::create(output).map_err(|e| {
            DbError::Message(format!("failed to create {}: {e}", output.display()))
        })?;
        self.export_to_writer(schema, rows, file)
    }

    /// Export rows to any writer implementing Write.
    pub fn export_to_writer<W: Write>(
        &self,
        schema: &TableSchema,
        rows: &[Row],
        writer: W,
    ) -> DbResult<()> {
        let mut w = BufWriter::new(writer);
        let columns: Vec<&str> = schema.data_columns().map(|c| c.name.as_str()).collect();

        let mut header = columns.join(",");
        header.push('\n');
        w.write_all(header.as_bytes())
            .map_err(|e| DbError::Message(format!("failed to write CSV header: {e}")))?;

        for row in rows {
            let line = self.row_line(&columns, row);
            w.write_all(line.as_bytes())
                .map_err(|e| DbError::Message(format!("failed to write CSV row: {e}")))?;
        }

        w.flush()
            .map_err(|e| DbError::Message(format!("failed to flush CSV writer: {e}")))?;
        Ok(())
    }

    /// Render one row, newline-terminated.
    fn row_line(&self, columns: &[&str], row: &Row) -> String {
        let mut line = String::new();
        for (i, col) in columns.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            if let Some(v) = row.get(col) {
                line.push_str(&quote_field(&v.to_string()));
            }
        }
        line.push('\n');
        line
    }
}
