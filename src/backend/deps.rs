//! Presence checks for the external tools backends shell out to.

use std::path::Path;

use super::kind::Dependency;

/// Answers whether an executable can be run.
pub trait DependencyChecker {
    fn is_available(&self, binary: &str) -> bool;
}

/// Searches the directories of `PATH`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLookup;

impl DependencyChecker for PathLookup {
    fn is_available(&self, binary: &str) -> bool {
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(binary)))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

// A fixed list of installed binaries.
impl DependencyChecker for Vec<&'static str> {
    fn is_available(&self, binary: &str) -> bool {
        self.iter().any(|b| *b == binary)
    }
}

/// Descriptions of the dependencies that are not available, deduplicated by
/// binary and in declaration order.
pub fn missing_dependencies(checker: &dyn DependencyChecker, deps: &[Dependency]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut missing = Vec::new();
    for dep in deps {
        if seen.contains(&dep.binary) {
            continue;
        }
        seen.push(dep.binary);
        if !checker.is_available(dep.binary) {
            missing.push(dep.description.to_string());
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::kind::{BackendKind, CURL};

    #[test]
    fn test_missing_dependencies_dedup() {
        let checker: Vec<&'static str> = vec![];
        let mut deps = BackendKind::Callback.dependencies().to_vec();
        deps.push(CURL);
        assert_eq!(missing_dependencies(&checker, &deps), vec!["curl"]);
    }

    #[test]
    fn test_available_dependencies() {
        let checker = vec!["bq"];
        assert!(missing_dependencies(&checker, BackendKind::BigQuery.dependencies()).is_empty());
        assert_eq!(
            missing_dependencies(&checker, BackendKind::MySql.dependencies()),
            vec!["mysql"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_path_lookup_finds_sh() {
        assert!(PathLookup.is_available("sh"));
        assert!(!PathLookup.is_available("definitely-not-a-real-binary-1234"));
    }
}
