//! MySQL backend (`mysql` client with `LOAD DATA LOCAL INFILE`).

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::DbResult;
use crate::config::SaveOptions;
use crate::core::schema::TableSchema;

use super::command;
use super::traits::Importer;

/// Connection settings shared by the relational backends.
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub table_prefix: String,
}

impl ConnectionConfig {
    pub fn from_options(opts: &SaveOptions) -> Self {
        ConnectionConfig {
            host: opts.db_host.clone(),
            port: opts.db_port,
            user: opts.db_user.clone(),
            password: opts.db_pswd.clone(),
            database: opts.db_name.clone(),
            table_prefix: opts.table_name(""),
        }
    }
}

pub struct MySqlImporter {
    conn: ConnectionConfig,
    mysql_path: PathBuf,
}

impl MySqlImporter {
    pub fn new(conn: ConnectionConfig) -> Self {
        MySqlImporter {
            conn,
            mysql_path: PathBuf::from("mysql"),
        }
    }

    /// `LOAD DATA` statement matching the CSV dialect written by the exporter.
    pub fn load_statement(&self, table: &str, csv: &Path, schema: &TableSchema) -> String {
        let columns: Vec<&str> = schema.data_columns().map(|c| c.name.as_str()).collect();
        format!(
            "LOAD DATA LOCAL INFILE '{}' INTO TABLE {}{} FIELDS TERMINATED BY ',' \
             OPTIONALLY ENCLOSED BY '\"' ESCAPED BY '\\\\' LINES TERMINATED BY '\\n' \
             IGNORE 1 LINES ({})",
            csv.display().to_string().replace('\'', "\\'"),
            self.conn.table_prefix,
            table,
            columns.join(",")
        )
    }

    pub fn build_command(&self, table: &str, csv: &Path, schema: &TableSchema) -> Command {
        let mut cmd = Command::new(&self.mysql_path);
        if let Some(host) = &self.conn.host {
            cmd.arg("-h").arg(host);
        }
        if let Some(port) = self.conn.port {
            cmd.arg("-P").arg(port.to_string());
        }
        if let Some(user) = &self.conn.user {
            cmd.arg("-u").arg(user);
        }
        if let Some(password) = &self.conn.password {
            cmd.env("MYSQL_PWD", password);
        }
        cmd.arg("--local-infile=1")
            .arg("-e")
            .arg(self.load_statement(table, csv, schema));
        if let Some(db) = &self.conn.database {
            cmd.arg(db);
        }
        cmd
    }
}

impl Importer for MySqlImporter {
    fn name(&self) -> &str {
        "mysql"
    }

    fn import(&self, table: &str, csv: &Path, schema: &TableSchema) -> DbResult<()> {
        command::run(self.build_command(table, csv, schema), "mysql")?;
        Ok(())
    }
}
