//! The benchmark database: row collection, CSV serialization and dispatch to
//! the selected backend.
//!
//! Construction runs every check up front (backend name, external tools,
//! backend options, output directory, preloaded schemas). A `BenchmarkDb`
//! that exists is ready to accept rows.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::archive::{ArtifactSave, Archiver, HttpArchiver};
use crate::backend::{
    BackendKind, DependencyChecker, Importer, PathLookup, build_importer, missing_dependencies,
    validate_options,
};
use crate::config::SaveOptions;
use crate::core::env::{SysinfoSource, SystemInfoSource};
use crate::core::meta::{BenchmarkMeta, IniBenchmarkMeta};
use crate::core::schema::{DirSchemaSource, SchemaRegistry, SchemaSource, TableSchema};
use crate::storage::{CsvExporter, csv_path};
use crate::store::{Row, RowStore};
use crate::{DbError, DbResult};

/// Default schema directory, relative to the working directory.
pub const DEFAULT_SCHEMA_DIR: &str = "schema";

/// What happened to one table during `save`.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// No backend configured; the CSV file is the result.
    CsvOnly { csv: PathBuf },
    /// Imported. `csv` is set when the file was kept.
    Imported { csv: Option<PathBuf> },
    /// The backend rejected the import; the CSV file is kept.
    ImportFailed { csv: PathBuf, reason: String },
    /// The schema could not be built; nothing was written.
    SchemaFailed { reason: String },
    /// Writing the CSV file failed.
    WriteFailed { reason: String },
}

impl TableOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TableOutcome::CsvOnly { .. } | TableOutcome::Imported { .. })
    }
}

/// Per-table outcomes of a `save` call, in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub tables: Vec<(String, TableOutcome)>,
}

impl SaveReport {
    /// True when there was something to save and every table succeeded.
    pub fn is_success(&self) -> bool {
        !self.tables.is_empty() && self.tables.iter().all(|(_, o)| o.is_success())
    }

    pub fn outcome(&self, table: &str) -> Option<&TableOutcome> {
        self.tables.iter().find(|(t, _)| t == table).map(|(_, o)| o)
    }
}

/// Builder wiring collaborators into a `BenchmarkDb`.
///
/// Every collaborator has a production default; tests replace them.
pub struct BenchmarkDbBuilder {
    options: SaveOptions,
    schema_source: Option<Box<dyn SchemaSource>>,
    system_info: Option<Box<dyn SystemInfoSource>>,
    benchmark_meta: Option<Box<dyn BenchmarkMeta>>,
    dependency_checker: Option<Box<dyn DependencyChecker>>,
    importer: Option<Box<dyn Importer>>,
    archiver: Option<Box<dyn Archiver>>,
    preload: Vec<String>,
}

impl BenchmarkDbBuilder {
    pub fn new(options: SaveOptions) -> Self {
        BenchmarkDbBuilder {
            options,
            schema_source: None,
            system_info: None,
            benchmark_meta: None,
            dependency_checker: None,
            importer: None,
            archiver: None,
            preload: Vec::new(),
        }
    }

    pub fn schema_source(mut self, source: impl SchemaSource + 'static) -> Self {
        self.schema_source = Some(Box::new(source));
        self
    }

    pub fn system_info(mut self, source: impl SystemInfoSource + 'static) -> Self {
        self.system_info = Some(Box::new(source));
        self
    }

    pub fn benchmark_meta(mut self, meta: impl BenchmarkMeta + 'static) -> Self {
        self.benchmark_meta = Some(Box::new(meta));
        self
    }

    pub fn dependency_checker(mut self, checker: impl DependencyChecker + 'static) -> Self {
        self.dependency_checker = Some(Box::new(checker));
        self
    }

    /// Replace the importer of the selected backend. Ignored in CSV-only mode.
    pub fn importer(mut self, importer: impl Importer + 'static) -> Self {
        self.importer = Some(Box::new(importer));
        self
    }

    /// Use `archiver` instead of the one derived from the `store` option.
    pub fn archiver(mut self, archiver: impl Archiver + 'static) -> Self {
        self.archiver = Some(Box::new(archiver));
        self
    }

    /// Build the schema of `table` during construction so schema errors are
    /// reported before any row is accepted.
    pub fn preload_table(mut self, table: impl Into<String>) -> Self {
        self.preload.push(table.into());
        self
    }

    /// Run all validation and produce a ready `BenchmarkDb`.
    ///
    /// # Errors
    /// - `DbError::Config` for an unknown backend, missing backend options or
    ///   an unloadable preloaded schema
    /// - `DbError::Dependency` when required tools are not installed
    /// - `DbError::Environment` when the output directory is unusable
    pub fn build(self) -> DbResult<BenchmarkDb> {
        let mut options = self.options;
        options.normalize();

        let backend = options.backend_kind()?;
        let archiver: Option<Box<dyn Archiver>> = match self.archiver {
            Some(a) => Some(a),
            None => options
                .store
                .as_deref()
                .map(|url| Box::new(HttpArchiver::new(url)) as Box<dyn Archiver>),
        };

        let mut deps = backend.map(|k| k.dependencies().to_vec()).unwrap_or_default();
        if let Some(a) = &archiver {
            deps.extend(a.dependencies());
        }
        let checker = self
            .dependency_checker
            .unwrap_or_else(|| Box::new(PathLookup));
        let missing = missing_dependencies(checker.as_ref(), &deps);
        if !missing.is_empty() {
            for dep in &missing {
                error!("Missing dependency {dep}");
            }
            return Err(DbError::Dependency { missing });
        }

        if let Some(kind) = backend {
            validate_options(kind, &options)?;
        }
        let output_dir = validate_output_dir(options.output.as_deref())?;

        let source = match self.schema_source {
            Some(s) => s,
            None => {
                let dir = options
                    .schema_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_DIR));
                Box::new(DirSchemaSource::new(dir)) as Box<dyn SchemaSource>
            }
        };
        let mut registry = SchemaRegistry::new(source, options.remove.clone());
        for table in &self.preload {
            registry.schema(table)?;
        }

        let importer = backend.map(|kind| {
            self.importer
                .unwrap_or_else(|| build_importer(kind, &options))
        });

        let facts = self
            .system_info
            .unwrap_or_else(|| Box::new(SysinfoSource))
            .collect();
        let version = self
            .benchmark_meta
            .unwrap_or_else(|| Box::new(IniBenchmarkMeta::from_cwd()))
            .version();
        debug!(facts = facts.len(), version = ?version, "collected row metadata");

        info!(
            backend = backend.map(|k| k.as_str()).unwrap_or("csv"),
            output = %output_dir.display(),
            "benchmark db ready"
        );
        Ok(BenchmarkDb {
            options,
            backend,
            output_dir,
            registry,
            store: RowStore::new(facts, version),
            importer,
            archiver,
        })
    }
}

/// Resolve the output directory and check it exists and is writable.
fn validate_output_dir(dir: Option<&Path>) -> DbResult<PathBuf> {
    let dir = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        return Err(DbError::Environment(format!(
            "{} is not a valid output directory",
            dir.display()
        )));
    }
    // Try a real file; permission bits alone do not account for ACLs
    // or read-only mounts.
    tempfile::NamedTempFile::new_in(&dir)
        .map_err(|_| DbError::Environment(format!("{} is not writable", dir.display())))?;
    Ok(dir)
}

/// Collects benchmark rows and saves them to CSV and the configured backend.
pub struct BenchmarkDb {
    options: SaveOptions,
    backend: Option<BackendKind>,
    output_dir: PathBuf,
    registry: SchemaRegistry,
    store: RowStore,
    importer: Option<Box<dyn Importer>>,
    archiver: Option<Box<dyn Archiver>>,
}

impl BenchmarkDb {
    pub fn builder(options: SaveOptions) -> BenchmarkDbBuilder {
        BenchmarkDbBuilder::new(options)
    }

    pub fn options(&self) -> &SaveOptions {
        &self.options
    }

    pub fn backend(&self) -> Option<BackendKind> {
        self.backend
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn rows(&self) -> &RowStore {
        &self.store
    }

    /// Schema of `table`, built on first use.
    pub fn schema(&mut self, table: &str) -> DbResult<&TableSchema> {
        self.registry.schema(table)
    }

    /// Add a row to `table`. Returns `false` if the table name is empty.
    pub fn add_row(&mut self, table: &str, row: Row) -> bool {
        self.store.add_row(table, row)
    }

    /// Add a row given as JSON. Returns `false` unless `row` is an object of
    /// scalar values and `table` is non-empty.
    pub fn add_json_row(&mut self, table: &str, row: serde_json::Value) -> bool {
        self.store.add_json_row(table, row)
    }

    /// Archive `file` and record its URL under `column` for rows added after
    /// this call.
    pub fn save_artifact(&mut self, file: &Path, column: &str) -> ArtifactSave {
        if !file.exists() {
            debug!(file = %file.display(), "artifact does not exist");
            return ArtifactSave::NotApplicable;
        }
        let Some(archiver) = &self.archiver else {
            return ArtifactSave::Unsupported;
        };
        match archiver.save(file) {
            Ok(url) => {
                info!(column, url = %url, "saved artifact {}", file.display());
                self.store.record_artifact(column, &url);
                ArtifactSave::Saved
            }
            Err(e) => {
                error!(column, "failed to save artifact {}: {e}", file.display());
                ArtifactSave::NotApplicable
            }
        }
    }

    /// Serialize every table to CSV and hand it to the backend, if any.
    ///
    /// Tables are processed in first-insertion order; a failing table does not
    /// stop the others. With no rows at all nothing is written and the report
    /// is unsuccessful.
    pub fn save(&mut self) -> SaveReport {
        let mut report = SaveReport::default();
        if self.store.is_empty() {
            warn!("no rows to save");
            return report;
        }

        let exporter = CsvExporter::new();
        let backend = self.backend.map(|k| k.as_str()).unwrap_or("csv");
        for table in self.store.tables() {
            let outcome = match self.registry.schema(&table.name) {
                Err(e) => {
                    error!(table = %table.name, "{e}");
                    TableOutcome::SchemaFailed {
                        reason: e.to_string(),
                    }
                }
                Ok(schema) => {
                    let csv = csv_path(&self.output_dir, &table.name);
                    info!(
                        "Saving {} rows to CSV file {}",
                        table.rows.len(),
                        csv.display()
                    );
                    match exporter.export(schema, &table.rows, &csv) {
                        Err(e) => {
                            error!(table = %table.name, "{e}");
                            TableOutcome::WriteFailed {
                                reason: e.to_string(),
                            }
                        }
                        Ok(()) => match &self.importer {
                            None => TableOutcome::CsvOnly { csv },
                            Some(importer) => dispatch(
                                importer.as_ref(),
                                backend,
                                &table.name,
                                csv,
                                schema,
                                self.options.db_and_csv,
                            ),
                        },
                    }
                }
            };
            report.tables.push((table.name.clone(), outcome));
        }
        report
    }
}

/// Import one serialized table and apply the keep/delete rule for its CSV.
fn dispatch(
    importer: &dyn Importer,
    backend: &str,
    table: &str,
    csv: PathBuf,
    schema: &TableSchema,
    keep_csv: bool,
) -> TableOutcome {
    if let Err(e) = importer.import(table, &csv, schema) {
        error!("Failed to import CSV to table {table} in {backend} db: {e}");
        return TableOutcome::ImportFailed {
            csv,
            reason: e.to_string(),
        };
    }
    info!("Successfully imported CSV to table {table} in {backend} db");
    if keep_csv {
        return TableOutcome::Imported { csv: Some(csv) };
    }
    match std::fs::remove_file(&csv) {
        Ok(()) => {
            info!("Deleted CSV file {}", csv.display());
            TableOutcome::Imported { csv: None }
        }
        Err(e) => {
            warn!("failed to delete CSV file {}: {e}", csv.display());
            TableOutcome::Imported { csv: Some(csv) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::core::schema::{Column, ColumnType, MemorySchemaSource};

    fn source() -> MemorySchemaSource {
        MemorySchemaSource::new(vec![Column::new("meta_os", ColumnType::String)]).with_table(
            "t",
            vec![
                Column::new("id", ColumnType::Index),
                Column::new("name", ColumnType::String),
                Column::new("value", ColumnType::Int),
            ],
        )
    }

    fn builder(opts: SaveOptions) -> BenchmarkDbBuilder {
        BenchmarkDb::builder(opts)
            .schema_source(source())
            .system_info(BTreeMap::from([("os".to_string(), "TestOS".to_string())]))
            .benchmark_meta(None::<String>)
            .dependency_checker(vec!["bq", "curl", "mysql", "psql"])
    }

    #[test]
    fn test_validate_output_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_output_dir(Some(&dir.path().join("nope"))).unwrap_err();
        assert!(matches!(err, DbError::Environment(_)));
        assert!(err.to_string().contains("is not a valid output directory"));
    }

    #[test]
    fn test_validate_output_dir_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        validate_output_dir(Some(dir.path())).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_output_dir_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind root.
        if std::fs::write(locked.join("canary"), "x").is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = validate_output_dir(Some(&locked)).unwrap_err();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(matches!(err, DbError::Environment(_)));
        assert!(err.to_string().contains("is not writable"));
    }

    #[test]
    fn test_csv_only_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = builder(SaveOptions {
            output: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .build()
        .unwrap();
        assert!(db.backend().is_none());

        assert!(db.add_row("t", Row::new().with("name", "a").with("value", 1)));
        let report = db.save();
        assert!(report.is_success());
        let csv = dir.path().join("t.csv");
        assert_eq!(report.outcome("t"), Some(&TableOutcome::CsvOnly { csv: csv.clone() }));
        assert_eq!(
            std::fs::read_to_string(csv).unwrap(),
            "meta_os,name,value\nTestOS,a,1\n"
        );
    }

    #[test]
    fn test_unknown_schema_fails_table_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = builder(SaveOptions {
            output: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .build()
        .unwrap();
        db.add_row("unknown", Row::new().with("x", 1));
        db.add_row("t", Row::new().with("name", "a"));
        let report = db.save();
        assert!(!report.is_success());
        assert!(matches!(
            report.outcome("unknown"),
            Some(TableOutcome::SchemaFailed { .. })
        ));
        assert!(report.outcome("t").unwrap().is_success());
        assert!(!dir.path().join("unknown.csv").exists());
    }

    #[test]
    fn test_preload_reports_schema_errors_at_build() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(SaveOptions {
            output: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .preload_table("unknown")
        .build()
        .err()
        .unwrap();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[test]
    fn test_archiver_adds_curl_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(SaveOptions {
            output: Some(dir.path().to_path_buf()),
            store: Some("https://store.example.test".into()),
            ..Default::default()
        })
        .dependency_checker(Vec::<&'static str>::new())
        .build()
        .err()
        .unwrap();
        match err {
            DbError::Dependency { missing } => assert_eq!(missing, vec!["curl"]),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_backend_options_validated() {
        let dir = tempfile::tempdir().unwrap();
        let err = builder(SaveOptions {
            output: Some(dir.path().to_path_buf()),
            db: Some("callback".into()),
            ..Default::default()
        })
        .build()
        .err()
        .unwrap();
        assert!(err.to_string().contains("--db_host is required"));
    }
}
