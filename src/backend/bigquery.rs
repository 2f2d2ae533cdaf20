//! Google BigQuery backend (`bq load`).

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::json;
use tracing::debug;

use crate::config::SaveOptions;
use crate::core::schema::{ColumnType, TableSchema};
use crate::{DbError, DbResult};

use super::command;
use super::traits::Importer;

/// Configuration for the BigQuery backend.
#[derive(Debug, Clone)]
pub struct BigQueryConfig {
    /// Path to the bq binary
    pub bq_path: PathBuf,
    /// Dataset receiving the tables
    pub dataset: String,
    pub table_prefix: String,
}

impl BigQueryConfig {
    pub fn from_options(opts: &SaveOptions) -> Self {
        BigQueryConfig {
            bq_path: PathBuf::from("bq"),
            dataset: opts.db_name.clone().unwrap_or_default(),
            table_prefix: opts.table_name(""),
        }
    }
}

pub struct BigQueryImporter {
    config: BigQueryConfig,
}

impl BigQueryImporter {
    pub fn new(config: BigQueryConfig) -> Self {
        BigQueryImporter { config }
    }

    fn target(&self, table: &str) -> String {
        format!("{}.{}{}", self.config.dataset, self.config.table_prefix, table)
    }

    /// BigQuery schema for the columns written to CSV.
    pub fn schema_json(schema: &TableSchema) -> serde_json::Value {
        let fields: Vec<_> = schema
            .data_columns()
            .map(|c| json!({"name": c.name, "type": bq_type(&c.column_type), "mode": "NULLABLE"}))
            .collect();
        serde_json::Value::Array(fields)
    }

    pub fn build_command(&self, table: &str, csv: &Path, schema_file: &Path) -> Command {
        let mut cmd = Command::new(&self.config.bq_path);
        cmd.arg("load")
            .arg("--source_format=CSV")
            .arg("--skip_leading_rows=1")
            .arg(self.target(table))
            .arg(csv)
            .arg(schema_file);
        cmd
    }
}

fn bq_type(t: &ColumnType) -> &'static str {
    match t {
        ColumnType::Int => "INTEGER",
        ColumnType::Float => "FLOAT",
        ColumnType::Timestamp => "TIMESTAMP",
        ColumnType::Boolean => "BOOLEAN",
        _ => "STRING",
    }
}

impl Importer for BigQueryImporter {
    fn name(&self) -> &str {
        "bigquery"
    }

    fn import(&self, table: &str, csv: &Path, schema: &TableSchema) -> DbResult<()> {
        let schema_file = tempfile::Builder::new()
            .prefix("bq-schema-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| DbError::Message(format!("failed to create schema file: {e}")))?;
        serde_json::to_writer(schema_file.as_file(), &Self::schema_json(schema))?;
        debug!(path = %schema_file.path().display(), "wrote bigquery schema");

        let cmd = self.build_command(table, csv, schema_file.path());
        command::run(cmd, "bq load")?;
        Ok(())
    }
}
