//! Benchmark version discovery from `benchmark.ini`.

use std::path::PathBuf;

use tracing::debug;

/// File holding benchmark metadata.
pub const BENCHMARK_INI: &str = "benchmark.ini";

/// Key of the benchmark version inside `benchmark.ini`.
pub const META_VERSION_KEY: &str = "meta-version";

/// Supplies the version of the benchmark producing the rows, if known.
pub trait BenchmarkMeta {
    fn version(&self) -> Option<String>;
}

impl BenchmarkMeta for Option<String> {
    fn version(&self) -> Option<String> {
        self.clone()
    }
}

/// Looks for `benchmark.ini` in a directory and its ancestors.
#[derive(Debug, Clone)]
pub struct IniBenchmarkMeta {
    start: PathBuf,
}

impl IniBenchmarkMeta {
    pub fn new(start: impl Into<PathBuf>) -> Self {
        IniBenchmarkMeta {
            start: start.into(),
        }
    }

    /// Start the search in the current working directory.
    pub fn from_cwd() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    fn find(&self) -> Option<PathBuf> {
        self.start
            .ancestors()
            .map(|dir| dir.join(BENCHMARK_INI))
            .find(|p| p.is_file())
    }
}

impl BenchmarkMeta for IniBenchmarkMeta {
    fn version(&self) -> Option<String> {
        let path = self.find()?;
        debug!(path = %path.display(), "reading benchmark metadata");
        let contents = std::fs::read_to_string(&path).ok()?;
        parse_ini_value(&contents, META_VERSION_KEY)
    }
}

/// Look up `key` in flat `key=value` ini text. Section headers and comments
/// are skipped; surrounding quotes are stripped.
pub fn parse_ini_value(contents: &str, key: &str) -> Option<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(';') && !l.starts_with('#') && !l.starts_with('['))
        .filter_map(|l| l.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| unquote(v.trim()).to_string())
        .filter(|v| !v.is_empty())
}

fn unquote(v: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}
