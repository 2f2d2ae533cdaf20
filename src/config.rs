//! Save options and the optional TOML config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::backend::BackendKind;
use crate::{DbError, DbResult};

/// Default config file, relative to the home directory.
pub const CONFIG_FILE_NAME: &str = ".ch_benchmark";

/// Prefix applied to table names in the target database.
pub const DEFAULT_TABLE_PREFIX: &str = "block_storage_";

/// Options controlling where and how rows are saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveOptions {
    /// Backend selector: bigquery, callback, mysql or postgresql. CSV only when unset.
    pub db: Option<String>,
    /// Keep the CSV file after a successful import.
    pub db_and_csv: bool,
    /// Extra HTTP headers for the callback backend (`Name: value`).
    #[serde(deserialize_with = "one_or_many")]
    pub db_callback_header: Vec<String>,
    pub db_host: Option<String>,
    pub db_name: Option<String>,
    pub db_port: Option<u16>,
    pub db_pswd: Option<String>,
    pub db_prefix: Option<String>,
    pub db_user: Option<String>,
    /// Directory receiving CSV files. Defaults to the working directory.
    pub output: Option<PathBuf>,
    /// Columns removed from every schema.
    #[serde(deserialize_with = "comma_list")]
    pub remove: Vec<String>,
    /// Base URL of the artifact store.
    pub store: Option<String>,
    /// Directory holding `common.json` and the per-table schemas.
    pub schema_dir: Option<PathBuf>,
    pub verbose: bool,
}

impl SaveOptions {
    /// The selected backend, or `None` for CSV-only output.
    ///
    /// # Errors
    /// Returns a configuration error for an unrecognized selector.
    pub fn backend_kind(&self) -> DbResult<Option<BackendKind>> {
        self.db.as_deref().map(str::parse).transpose()
    }

    /// Name of `table` in the target database.
    pub fn table_name(&self, table: &str) -> String {
        let prefix = self.db_prefix.as_deref().unwrap_or(DEFAULT_TABLE_PREFIX);
        format!("{prefix}{table}")
    }

    /// Fill every unset option from `other`. Values already set win.
    pub fn merge_missing(&mut self, other: SaveOptions) {
        fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
            if slot.is_none() {
                *slot = value;
            }
        }
        fill(&mut self.db, other.db);
        fill(&mut self.db_host, other.db_host);
        fill(&mut self.db_name, other.db_name);
        fill(&mut self.db_port, other.db_port);
        fill(&mut self.db_pswd, other.db_pswd);
        fill(&mut self.db_prefix, other.db_prefix);
        fill(&mut self.db_user, other.db_user);
        fill(&mut self.output, other.output);
        fill(&mut self.store, other.store);
        fill(&mut self.schema_dir, other.schema_dir);
        if self.db_callback_header.is_empty() {
            self.db_callback_header = other.db_callback_header;
        }
        if self.remove.is_empty() {
            self.remove = other.remove;
        }
        self.db_and_csv |= other.db_and_csv;
        self.verbose |= other.verbose;
    }

    /// Trim removal entries and drop empty ones.
    pub fn normalize(&mut self) {
        self.remove = self
            .remove
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
    }
}

/// Default tracing filter when `BENCHMARK_DB_LOG` is unset.
pub fn log_filter(verbose: bool) -> &'static str {
    if verbose { "benchmark_db=debug" } else { "benchmark_db=info" }
}

/// `~/.ch_benchmark`, if a home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE_NAME))
}

/// Load options from a TOML file. A missing file yields `None`.
pub fn load_config_file(path: &Path) -> DbResult<Option<SaveOptions>> {
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(path)
        .map_err(|e| DbError::Config(format!("failed to read {}: {e}", path.display())))?;
    let opts: SaveOptions = toml::from_str(&s)
        .map_err(|e| DbError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(opts))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn comma_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match StringOrList::deserialize(d)? {
        StringOrList::One(s) => s.split(',').map(|r| r.trim().to_string()).collect(),
        StringOrList::Many(v) => v,
    })
}

fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match StringOrList::deserialize(d)? {
        StringOrList::One(s) => vec![s],
        StringOrList::Many(v) => v,
    })
}
