//! End-to-end tests for collecting rows and saving them.

use std::collections::BTreeMap;
use std::path::Path;

use benchmark_db::archive::{ArtifactSave, Archiver};
use benchmark_db::backend::MockImporter;
use benchmark_db::config::SaveOptions;
use benchmark_db::core::schema::{Column, ColumnType, MemorySchemaSource};
use benchmark_db::store::Row;
use benchmark_db::{BenchmarkDb, BenchmarkDbBuilder, DbError, DbResult, TableOutcome};

/// Archiver returning a fixed URL per file name, or failing.
struct FakeArchiver {
    fail: bool,
}

impl Archiver for FakeArchiver {
    fn save(&self, file: &Path) -> DbResult<String> {
        if self.fail {
            return Err(DbError::Message("upload refused".into()));
        }
        let name = file.file_name().unwrap().to_string_lossy();
        Ok(format!("https://store.example.test/{name}"))
    }
}

fn schemas() -> MemorySchemaSource {
    MemorySchemaSource::new(vec![])
        .with_table(
            "scores",
            vec![
                Column::new("id", ColumnType::Index),
                Column::new("name", ColumnType::String),
                Column::new("value", ColumnType::Int),
            ],
        )
        .with_table(
            "fio",
            vec![
                Column::new("benchmark_version", ColumnType::String),
                Column::new("fio_log", ColumnType::String),
                Column::new("iops", ColumnType::Float),
                Column::new("meta_os", ColumnType::String),
                Column::new("ss_rounds", ColumnType::Int),
            ],
        )
}

fn builder(dir: &Path, opts: SaveOptions) -> BenchmarkDbBuilder {
    BenchmarkDb::builder(SaveOptions {
        output: Some(dir.to_path_buf()),
        ..opts
    })
    .schema_source(schemas())
    .system_info(BTreeMap::new())
    .benchmark_meta(None::<String>)
    .dependency_checker(vec!["bq", "curl", "mysql", "psql"])
}

fn mysql_options() -> SaveOptions {
    SaveOptions {
        db: Some("mysql".into()),
        db_name: Some("results".into()),
        ..Default::default()
    }
}

#[test]
fn test_index_columns_skipped_and_commas_quoted() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = builder(dir.path(), SaveOptions::default()).build().unwrap();

    assert!(db.add_row("scores", Row::new().with("name", "a").with("value", 1)));
    assert!(db.add_row("scores", Row::new().with("name", "b,c").with("value", 2)));
    assert!(db.save().is_success());

    let csv = std::fs::read_to_string(dir.path().join("scores.csv")).unwrap();
    assert_eq!(csv, "name,value\na,1\n\"b,c\",2\n");
}

#[test]
fn test_unknown_backend_fails_before_rows() {
    let dir = tempfile::tempdir().unwrap();
    let result = builder(
        dir.path(),
        SaveOptions {
            db: Some("oracle".into()),
            ..Default::default()
        },
    )
    .build();

    assert!(matches!(result, Err(DbError::Config(_))));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_missing_backend_tool_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let result = builder(dir.path(), mysql_options())
        .dependency_checker(vec!["curl"])
        .build();
    match result {
        Err(DbError::Dependency { missing }) => assert_eq!(missing, vec!["mysql"]),
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("construction should fail"),
    }
}

#[test]
fn test_csv_removed_after_successful_import() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockImporter::new();
    let calls = mock.calls();
    let mut db = builder(dir.path(), mysql_options()).importer(mock).build().unwrap();

    db.add_row("scores", Row::new().with("name", "a").with("value", 1));
    let report = db.save();

    assert!(report.is_success());
    assert_eq!(report.outcome("scores"), Some(&TableOutcome::Imported { csv: None }));
    assert!(!dir.path().join("scores.csv").exists());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].table, "scores");
    assert_eq!(calls[0].csv, dir.path().join("scores.csv"));
    assert_eq!(calls[0].contents.as_deref(), Some("name,value\na,1\n"));
    assert_eq!(calls[0].columns, vec!["name", "value"]);
}

#[test]
fn test_csv_kept_with_dual_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = builder(
        dir.path(),
        SaveOptions {
            db_and_csv: true,
            ..mysql_options()
        },
    )
    .importer(MockImporter::new())
    .build()
    .unwrap();

    db.add_row("scores", Row::new().with("name", "a"));
    let report = db.save();

    let csv = dir.path().join("scores.csv");
    assert!(report.is_success());
    assert_eq!(report.outcome("scores"), Some(&TableOutcome::Imported { csv: Some(csv.clone()) }));
    assert!(csv.exists());
}

#[test]
fn test_failed_import_keeps_csv_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockImporter::new().fails_for("scores");
    let calls = mock.calls();
    let mut db = builder(dir.path(), mysql_options()).importer(mock).build().unwrap();

    db.add_row("scores", Row::new().with("name", "a"));
    db.add_row("fio", Row::new().with("iops", 1200.5));
    let report = db.save();

    assert!(!report.is_success());
    assert!(matches!(report.outcome("scores"), Some(TableOutcome::ImportFailed { .. })));
    assert_eq!(report.outcome("fio"), Some(&TableOutcome::Imported { csv: None }));
    assert!(dir.path().join("scores.csv").exists());
    assert!(!dir.path().join("fio.csv").exists());
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn test_zero_rows_is_not_success() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = builder(dir.path(), SaveOptions::default()).build().unwrap();
    assert!(!db.add_row("", Row::new().with("name", "a")));

    let report = db.save();
    assert!(!report.is_success());
    assert!(report.tables.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_artifact_urls_apply_to_later_rows_only() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("fio.log");
    std::fs::write(&log, "fio output").unwrap();
    let mut db = builder(dir.path(), SaveOptions::default())
        .archiver(FakeArchiver { fail: false })
        .build()
        .unwrap();

    db.add_row("fio", Row::new().with("iops", 1));
    assert_eq!(db.save_artifact(&log, "fio_log"), ArtifactSave::Saved);
    db.add_row("fio", Row::new().with("iops", 2));
    assert!(db.save().is_success());

    let csv = std::fs::read_to_string(dir.path().join("fio.csv")).unwrap();
    assert_eq!(
        csv,
        "benchmark_version,fio_log,iops,meta_os\n,,1,\n,https://store.example.test/fio.log,2,\n"
    );
}

#[test]
fn test_save_artifact_three_way_result() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.log");
    std::fs::write(&present, "x").unwrap();
    let absent = dir.path().join("absent.log");

    let mut plain = builder(dir.path(), SaveOptions::default()).build().unwrap();
    assert_eq!(plain.save_artifact(&absent, "c"), ArtifactSave::NotApplicable);
    assert_eq!(plain.save_artifact(&present, "c"), ArtifactSave::Unsupported);

    let mut failing = builder(dir.path(), SaveOptions::default())
        .archiver(FakeArchiver { fail: true })
        .build()
        .unwrap();
    assert_eq!(failing.save_artifact(&absent, "c"), ArtifactSave::NotApplicable);
    assert_eq!(failing.save_artifact(&present, "c"), ArtifactSave::NotApplicable);

    // A failed save records nothing.
    failing.add_row("scores", Row::new());
    assert!(!failing.rows().table("scores").unwrap().rows[0].contains("c"));
}

#[test]
fn test_injected_metadata_fills_gaps_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = builder(dir.path(), SaveOptions::default())
        .system_info(BTreeMap::from([("os".to_string(), "Linux".to_string())]))
        .benchmark_meta(Some("1.4".to_string()))
        .build()
        .unwrap();

    db.add_row("fio", Row::new().with("iops", 10));
    db.add_row("fio", Row::new().with("iops", 20).with("meta_os", "FreeBSD"));
    assert!(db.save().is_success());

    let csv = std::fs::read_to_string(dir.path().join("fio.csv")).unwrap();
    assert_eq!(
        csv,
        "benchmark_version,fio_log,iops,meta_os\n1.4,,10,Linux\n1.4,,20,FreeBSD\n"
    );
}

#[test]
fn test_removed_columns_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = builder(
        dir.path(),
        SaveOptions {
            remove: vec!["meta_os".into(), " fio_log ".into()],
            ..Default::default()
        },
    )
    .build()
    .unwrap();

    db.add_row("fio", Row::new().with("iops", 1).with("meta_os", "Linux"));
    assert!(db.save().is_success());
    let csv = std::fs::read_to_string(dir.path().join("fio.csv")).unwrap();
    assert_eq!(csv, "benchmark_version,iops\n,1\n");
}

#[test]
fn test_missing_output_dir_is_environment_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = builder(&dir.path().join("missing"), SaveOptions::default()).build();
    assert!(matches!(result, Err(DbError::Environment(_))));
}
