//! Storage backends receiving serialized tables.
//!
//! The set of backends is closed (`BackendKind`). A kind is resolved once, at
//! construction, into a boxed `Importer`; the dispatcher only ever talks to
//! that trait.

pub mod bigquery;
pub mod callback;
pub(crate) mod command;
pub mod deps;
pub mod kind;
pub mod mock;
pub mod mysql;
pub mod postgresql;
pub mod traits;

// Re-export key types
pub use bigquery::{BigQueryConfig, BigQueryImporter};
pub use callback::{CallbackConfig, CallbackImporter};
pub use command::display_command;
pub use deps::{DependencyChecker, PathLookup, missing_dependencies};
pub use kind::{BackendKind, CURL, Dependency};
pub use mock::{ImportCall, MockImporter};
pub use mysql::{ConnectionConfig, MySqlImporter};
pub use postgresql::PostgreSqlImporter;
pub use traits::{Importer, NoopImporter};

use crate::config::SaveOptions;
use crate::{DbError, DbResult};

/// Check that `opts` carries what the `kind` importer needs.
///
/// # Errors
/// Returns a configuration error naming the missing option.
pub fn validate_options(kind: BackendKind, opts: &SaveOptions) -> DbResult<()> {
    let require = |value: &Option<String>, flag: &str| {
        if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
            Err(DbError::Config(format!("--{flag} is required for --db {kind}")))
        } else {
            Ok(())
        }
    };
    match kind {
        BackendKind::BigQuery | BackendKind::MySql | BackendKind::PostgreSql => {
            require(&opts.db_name, "db_name")
        }
        BackendKind::Callback => {
            require(&opts.db_host, "db_host")?;
            let url = opts.db_host.as_deref().unwrap_or_default();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(())
            } else {
                Err(DbError::Config(format!("--db_host {url} is not a valid callback URL")))
            }
        }
    }
}

/// The real importer for `kind`.
pub fn build_importer(kind: BackendKind, opts: &SaveOptions) -> Box<dyn Importer> {
    match kind {
        BackendKind::BigQuery => Box::new(BigQueryImporter::new(BigQueryConfig::from_options(opts))),
        BackendKind::Callback => Box::new(CallbackImporter::new(CallbackConfig::from_options(opts))),
        BackendKind::MySql => Box::new(MySqlImporter::new(ConnectionConfig::from_options(opts))),
        BackendKind::PostgreSql => {
            Box::new(PostgreSqlImporter::new(ConnectionConfig::from_options(opts)))
        }
    }
}
