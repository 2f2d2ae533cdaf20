use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};

use crate::archive::ArtifactSave;
use crate::config::{SaveOptions, default_config_path, load_config_file};
use crate::core::meta::IniBenchmarkMeta;
use crate::db::BenchmarkDb;
use crate::{DbError, DbResult};

/// Inputs of the `save` command.
#[derive(Debug, Clone)]
pub struct SaveCommand {
    /// Options with the config file already merged, see [`resolve_options`]
    pub options: SaveOptions,
    pub table: String,
    /// JSON array or JSON-lines file of row objects
    pub rows: PathBuf,
    /// `(column, file)` pairs archived before rows are added
    pub artifacts: Vec<(String, PathBuf)>,
    /// Where to look for `benchmark.ini`; the working directory when unset
    pub benchmark_dir: Option<PathBuf>,
}

/// Merge `config` (or `~/.ch_benchmark`) into command-line `options`.
///
/// Runs before logging is set up so the file can enable verbose output.
pub fn resolve_options(mut options: SaveOptions, config: Option<&Path>) -> DbResult<SaveOptions> {
    let path = config.map(Path::to_path_buf).or_else(default_config_path);
    if let Some(path) = path {
        if let Some(file_opts) = load_config_file(&path)? {
            options.merge_missing(file_opts);
        }
    }
    Ok(options)
}

pub fn run(cmd: SaveCommand) -> DbResult<()> {
    let options = cmd.options;
    debug!(verbose = options.verbose, backend = ?options.db, "resolved save options");

    let rows = read_rows(&cmd.rows)?;

    let meta = match &cmd.benchmark_dir {
        Some(dir) => IniBenchmarkMeta::new(dir),
        None => IniBenchmarkMeta::from_cwd(),
    };
    let mut db = BenchmarkDb::builder(options)
        .benchmark_meta(meta)
        .preload_table(cmd.table.clone())
        .build()?;

    for (column, file) in &cmd.artifacts {
        match db.save_artifact(file, column) {
            ArtifactSave::Saved => {}
            ArtifactSave::Unsupported => {
                warn!(column = %column, "no artifact store configured; skipping {}", file.display())
            }
            ArtifactSave::NotApplicable => {
                warn!(column = %column, "artifact {} not saved", file.display())
            }
        }
    }

    let total = rows.len();
    let added = rows
        .into_iter()
        .map(|row| db.add_json_row(&cmd.table, row))
        .filter(|added| *added)
        .count();
    if added < total {
        warn!("rejected {} of {total} rows", total - added);
    }

    let report = db.save();
    if !report.is_success() {
        let failed: Vec<&str> = report
            .tables
            .iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(t, _)| t.as_str())
            .collect();
        return Err(DbError::Message(if failed.is_empty() {
            "no rows to save".to_string()
        } else {
            format!("failed to save tables: {}", failed.join(", "))
        }));
    }
    Ok(())
}

/// Read rows from a JSON array, or from JSON lines when the file is not an array.
pub fn read_rows(path: &Path) -> DbResult<Vec<serde_json::Value>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rows from {}", path.display()))?;
    if s.trim_start().starts_with('[') {
        let rows: Vec<serde_json::Value> = serde_json::from_str(&s)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        return Ok(rows);
    }
    let mut rows = Vec::new();
    for (i, line) in s.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("failed to parse {} line {}", path.display(), i + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a `column=path` artifact argument.
pub fn parse_artifact_arg(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((column, path)) if !column.trim().is_empty() && !path.is_empty() => {
            Ok((column.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected COLUMN=PATH, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::log_filter;

    #[test]
    fn test_read_rows_array_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let arr = dir.path().join("rows.json");
        std::fs::write(&arr, r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(read_rows(&arr).unwrap().len(), 2);

        let lines = dir.path().join("rows.jsonl");
        std::fs::write(&lines, "{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(read_rows(&lines).unwrap().len(), 2);
    }

    #[test]
    fn test_read_rows_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let lines = dir.path().join("rows.jsonl");
        std::fs::write(&lines, "{\"a\":1}\n{oops\n").unwrap();
        let err = format!("{:#}", anyhow::Error::from(read_rows(&lines).unwrap_err()));
        assert!(err.contains("line 2"), "{err}");
    }

    #[test]
    fn test_config_file_enables_verbose() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bench.toml");
        std::fs::write(&config, "verbose = true\ndb_prefix = \"nightly_\"\n").unwrap();

        let options = resolve_options(SaveOptions::default(), Some(&config)).unwrap();
        assert!(options.verbose);
        assert_eq!(options.db_prefix.as_deref(), Some("nightly_"));
        assert_eq!(log_filter(options.verbose), "benchmark_db=debug");
    }

    #[test]
    fn test_command_line_wins_over_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("bench.toml");
        std::fs::write(&config, "db_prefix = \"nightly_\"\n").unwrap();

        let cli = SaveOptions {
            db_prefix: Some("adhoc_".into()),
            ..Default::default()
        };
        let options = resolve_options(cli, Some(&config)).unwrap();
        assert!(!options.verbose);
        assert_eq!(options.db_prefix.as_deref(), Some("adhoc_"));
        assert_eq!(log_filter(options.verbose), "benchmark_db=info");
    }

    #[test]
    fn test_parse_artifact_arg() {
        assert_eq!(
            parse_artifact_arg("log_url=/tmp/fio.log").unwrap(),
            ("log_url".to_string(), PathBuf::from("/tmp/fio.log"))
        );
        assert!(parse_artifact_arg("nocolumn").is_err());
        assert!(parse_artifact_arg("=path").is_err());
        assert!(parse_artifact_arg("col=").is_err());
    }
}
