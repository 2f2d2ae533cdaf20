//! Blocking execution of backend CLI tools.

use std::process::{Command, Stdio};

use tracing::debug;

use crate::{DbError, DbResult};

/// Run `cmd` to completion and return its stdout.
///
/// There is no timeout: a hung tool hangs the caller.
pub(crate) fn run(mut cmd: Command, what: &str) -> DbResult<String> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!(command = %display_command(&cmd), "running {what}");

    let output = cmd
        .output()
        .map_err(|e| DbError::Message(format!("failed to run {what}: {e}")))?;
    if !output.status.success() {
        return Err(DbError::Message(format!(
            "{what} failed: status={} stderr={}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Shell-quoted rendering of a command line, for logs.
pub fn display_command(cmd: &Command) -> String {
    let words: Vec<String> = std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect();
    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}
