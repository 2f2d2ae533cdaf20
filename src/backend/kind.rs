use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DbError;

/// An external tool a backend or archiver shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    /// Executable looked up on PATH
    pub binary: &'static str,
    /// Human readable package name for error messages
    pub description: &'static str,
}

pub const CURL: Dependency = Dependency {
    binary: "curl",
    description: "curl",
};

/// The fixed set of storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    BigQuery,
    Callback,
    MySql,
    PostgreSql,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::BigQuery,
        BackendKind::Callback,
        BackendKind::MySql,
        BackendKind::PostgreSql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::BigQuery => "bigquery",
            BackendKind::Callback => "callback",
            BackendKind::MySql => "mysql",
            BackendKind::PostgreSql => "postgresql",
        }
    }

    /// External tools this backend needs at import time.
    pub fn dependencies(&self) -> &'static [Dependency] {
        match self {
            BackendKind::BigQuery => &[Dependency {
                binary: "bq",
                description: "Google Cloud SDK",
            }],
            BackendKind::Callback => &[CURL],
            BackendKind::MySql => &[Dependency {
                binary: "mysql",
                description: "mysql",
            }],
            BackendKind::PostgreSql => &[Dependency {
                binary: "psql",
                description: "postgresql",
            }],
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DbError::Config(format!("--db {s} is not valid")))
    }
}
