//! HTTP callback backend: POSTs the CSV to a URL with curl.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::DbResult;
use crate::config::SaveOptions;
use crate::core::schema::TableSchema;

use super::command;
use super::traits::Importer;

/// Header naming the target table of a callback request.
pub const TABLE_HEADER: &str = "X-Benchmark-Table";

#[derive(Debug, Clone)]
pub struct CallbackConfig {
    pub url: String,
    /// Extra `Name: value` headers
    pub headers: Vec<String>,
    pub table_prefix: String,
    pub curl_path: PathBuf,
}

impl CallbackConfig {
    pub fn from_options(opts: &SaveOptions) -> Self {
        CallbackConfig {
            url: opts.db_host.clone().unwrap_or_default(),
            headers: opts.db_callback_header.clone(),
            table_prefix: opts.table_name(""),
            curl_path: PathBuf::from("curl"),
        }
    }
}

pub struct CallbackImporter {
    config: CallbackConfig,
}

impl CallbackImporter {
    pub fn new(config: CallbackConfig) -> Self {
        CallbackImporter { config }
    }

    pub fn build_command(&self, table: &str, csv: &Path) -> Command {
        let mut cmd = Command::new(&self.config.curl_path);
        cmd.arg("-sf")
            .arg("-X")
            .arg("POST")
            .arg("-H")
            .arg("Content-Type: text/csv")
            .arg("-H")
            .arg(format!("{TABLE_HEADER}: {}{}", self.config.table_prefix, table));
        for header in &self.config.headers {
            cmd.arg("-H").arg(header);
        }
        let mut data = std::ffi::OsString::from("@");
        data.push(csv);
        cmd.arg("--data-binary").arg(data).arg(&self.config.url);
        cmd
    }
}

impl Importer for CallbackImporter {
    fn name(&self) -> &str {
        "callback"
    }

    fn import(&self, table: &str, csv: &Path, _schema: &TableSchema) -> DbResult<()> {
        command::run(self.build_command(table, csv), "curl")?;
        Ok(())
    }
}
