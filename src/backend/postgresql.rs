//! PostgreSQL backend (`psql` with `\copy`).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::DbResult;
use crate::core::schema::TableSchema;

use super::command;
use super::mysql::ConnectionConfig;
use super::traits::Importer;

pub struct PostgreSqlImporter {
    conn: ConnectionConfig,
    psql_path: PathBuf,
}

impl PostgreSqlImporter {
    pub fn new(conn: ConnectionConfig) -> Self {
        PostgreSqlImporter {
            conn,
            psql_path: PathBuf::from("psql"),
        }
    }

    /// `\copy` meta-command reading the exporter's dialect (backslash escape).
    pub fn copy_statement(&self, table: &str, csv: &Path, schema: &TableSchema) -> String {
        let columns: Vec<&str> = schema.data_columns().map(|c| c.name.as_str()).collect();
        format!(
            "\\copy {}{}({}) FROM '{}' WITH (FORMAT csv, HEADER true, ESCAPE '\\')",
            self.conn.table_prefix,
            table,
            columns.join(","),
            csv.display().to_string().replace('\'', "''")
        )
    }

    pub fn build_command(&self, table: &str, csv: &Path, schema: &TableSchema) -> Command {
        let mut cmd = Command::new(&self.psql_path);
        if let Some(host) = &self.conn.host {
            cmd.arg("-h").arg(host);
        }
        if let Some(port) = self.conn.port {
            cmd.arg("-p").arg(port.to_string());
        }
        if let Some(user) = &self.conn.user {
            cmd.arg("-U").arg(user);
        }
        if let Some(db) = &self.conn.database {
            cmd.arg("-d").arg(db);
        }
        if let Some(password) = &self.conn.password {
            cmd.env("PGPASSWORD", password);
        }
        cmd.arg("-v")
            .arg("ON_ERROR_STOP=1")
            .arg("-c")
            .arg(self.copy_statement(table, csv, schema));
        cmd
    }
}

impl Importer for PostgreSqlImporter {
    fn name(&self) -> &str {
        "postgresql"
    }

    fn import(&self, table: &str, csv: &Path, schema: &TableSchema) -> DbResult<()> {
        command::run(self.build_command(table, csv, schema), "psql")?;
        Ok(())
    }
}
