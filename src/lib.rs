pub mod archive;
pub mod backend;
pub mod config;
pub mod core;
pub mod db;
pub mod save_cmd;
pub mod storage;
pub mod store;

use thiserror::Error;

pub use db::{BenchmarkDb, BenchmarkDbBuilder, SaveReport, TableOutcome};

#[derive(Debug, Error)]
pub enum DbError {
    /// Invalid option values, unknown backend names, unreadable schemas.
    #[error("configuration error: {0}")]
    Config(String),
    /// External tools required by the selected backend or archiver are absent.
    #[error("missing dependencies: {}", missing.join(", "))]
    Dependency { missing: Vec<String> },
    /// Output directory problems.
    #[error("{0}")]
    Environment(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type DbResult<T> = Result<T, DbError>;
