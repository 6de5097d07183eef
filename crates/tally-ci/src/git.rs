//! Git CLI helper.
//!
//! Every git operation in the pipeline goes through [`run_git`]: the system
//! `git` binary, an explicit working directory, and a deadline. Nothing
//! here mutates process-global state.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use tally_core::domain::error::{Result, TallyError};

/// Run `git <args>` in `dir` and return trimmed stdout.
///
/// Non-zero exit, spawn failure, and deadline overrun all map to
/// [`TallyError::Git`]. Error text includes the git subcommand and stderr;
/// callers passing credential-bearing URLs must redact before surfacing.
pub async fn run_git(dir: &Path, args: &[&str], timeout_secs: u64) -> Result<String> {
    let subcommand = args.first().copied().unwrap_or("<none>");

    let child = Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| TallyError::Git(format!("failed to run git {subcommand}: {e}")))?;

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output())
        .await
        .map_err(|_| {
            TallyError::Git(format!(
                "git {subcommand} timed out after {timeout_secs} seconds"
            ))
        })?
        .map_err(|e| TallyError::Git(format!("git {subcommand}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TallyError::Git(format!(
            "git {subcommand} failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_git_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let version = run_git(dir.path(), &["--version"], 30).await.unwrap();
        assert!(version.starts_with("git version"));
    }

    #[tokio::test]
    async fn run_git_surfaces_stderr_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_git(dir.path(), &["rev-parse", "HEAD"], 30)
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Git(_)));
        assert!(err.to_string().contains("rev-parse"));
    }

    #[tokio::test]
    async fn run_git_fails_for_missing_directory() {
        let missing = Path::new("/nonexistent/tally/workdir");
        let result = run_git(missing, &["status"], 30).await;
        assert!(result.is_err());
    }
}
