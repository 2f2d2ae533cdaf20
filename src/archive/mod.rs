//! Artifact archiving.
//!
//! An archiver uploads a file (logs, plots, raw tool output) and returns the
//! URL it can be fetched from. The URL is then recorded as a column value of
//! rows added afterwards.

use std::path::Path;
use std::process::Command;

use crate::backend::command;
use crate::backend::{CURL, Dependency};
use crate::{DbError, DbResult};

/// Result of saving an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSave {
    /// Archived; the URL applies to subsequent rows.
    Saved,
    /// The file exists but no archiver is configured.
    Unsupported,
    /// Nothing to do (missing file) or the archiver failed.
    NotApplicable,
}

/// Uploads files and returns their URLs.
pub trait Archiver {
    fn save(&self, file: &Path) -> DbResult<String>;

    /// External tools required by this archiver.
    fn dependencies(&self) -> Vec<Dependency> {
        Vec::new()
    }
}

/// Uploads with `curl -T` to `<base_url>/<digest prefix>/<file name>`.
#[derive(Debug, Clone)]
pub struct HttpArchiver {
    base_url: String,
}

impl HttpArchiver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        HttpArchiver {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Destination URL for `file`, keyed by a prefix of its content digest so
    /// equal names from different runs do not collide.
    pub fn object_url(&self, file: &Path, contents: &[u8]) -> DbResult<String> {
        let name = file
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| DbError::Message(format!("invalid artifact name {}", file.display())))?;
        let digest = sha256::digest(contents);
        Ok(format!("{}/{}/{}", self.base_url, &digest[..12], name))
    }
}

impl Archiver for HttpArchiver {
    fn save(&self, file: &Path) -> DbResult<String> {
        let contents = std::fs::read(file)?;
        let url = self.object_url(file, &contents)?;

        let mut cmd = Command::new(CURL.binary);
        cmd.arg("-sf").arg("-T").arg(file).arg(&url);
        command::run(cmd, "artifact upload")?;
        Ok(url)
    }

    fn dependencies(&self) -> Vec<Dependency> {
        vec![CURL]
    }
}
