//! Analysis-tool execution with timeout and failure isolation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use tokio::process::Command;
use tracing::{info, warn};

use tally_core::domain::error::{Result, TallyError};
use tally_core::domain::tool::ToolKind;

use crate::changes::ChangeSet;
use crate::sync::Workspace;
use crate::tool::ToolConfig;

/// Raw output of one tool invocation.
#[derive(Debug, Clone)]
pub struct ToolRunOutput {
    /// Tool name from the configuration.
    pub name: String,

    /// Parser selection for this output.
    pub kind: ToolKind,

    /// Combined stdout + stderr, lossy UTF-8. Tools scatter findings
    /// across both streams.
    pub raw: String,

    /// Exit code (-1 when unavailable). Non-zero is a finding signal for
    /// the format checker, not a failure.
    pub exit_code: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

/// One tool that could not run at all (spawn failure or timeout).
#[derive(Debug, Clone)]
pub struct ToolFailure {
    pub tool: String,
    pub reason: String,
}

/// Executes the configured tools against a change set.
pub struct ToolRunner;

impl ToolRunner {
    /// Run every enabled tool and return (raw outputs, failures).
    ///
    /// Tool failures are isolated: a tool that times out or fails to spawn
    /// contributes a `ToolFailure` record and nothing else, and the
    /// remaining tools still run.
    pub async fn run_all(
        tools: &[ToolConfig],
        changes: &ChangeSet,
        workspace: &Workspace,
    ) -> (Vec<ToolRunOutput>, Vec<ToolFailure>) {
        let existing = existing_files(&changes.files, &workspace.path);
        if existing.len() != changes.files.len() {
            warn!(
                expected = changes.files.len(),
                found = existing.len(),
                "some changed files vanished before analysis"
            );
        }

        let mut outputs = Vec::new();
        let mut failures = Vec::new();

        if existing.is_empty() {
            info!("no files left on disk to analyze");
            return (outputs, failures);
        }

        for tool in tools.iter().filter(|t| t.enabled) {
            info!(tool = %tool.name, files = existing.len(), "running analysis tool");
            match Self::execute_tool(tool, &existing, &workspace.path).await {
                Ok(output) => {
                    if output.exit_code != 0 {
                        // Expected for checkers that signal findings via
                        // exit status; the parser decides what it means.
                        info!(tool = %tool.name, exit_code = output.exit_code, "tool reported findings");
                    }
                    outputs.push(output);
                }
                Err(e) => {
                    warn!(tool = %tool.name, error = %e, "tool invocation failed, continuing without it");
                    failures.push(ToolFailure {
                        tool: tool.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        (outputs, failures)
    }

    /// Execute a single tool scoped to the working copy root, with the
    /// file list as explicit trailing arguments.
    async fn execute_tool(
        config: &ToolConfig,
        files: &[PathBuf],
        workdir: &Path,
    ) -> Result<ToolRunOutput> {
        if config.command.is_empty() {
            return Err(TallyError::Tool {
                tool: config.name.clone(),
                reason: "empty command".to_string(),
            });
        }

        let start = Instant::now();
        let exe = &config.command[0];
        let args = &config.command[1..];

        let child = Command::new(exe)
            .args(args)
            .args(files)
            .current_dir(workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TallyError::Tool {
                tool: config.name.clone(),
                reason: format!("failed to spawn {exe}: {e}"),
            })?;

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| TallyError::Tool {
            tool: config.name.clone(),
            reason: format!("timed out after {} seconds", config.timeout_secs),
        })?
        .map_err(|e| TallyError::Tool {
            tool: config.name.clone(),
            reason: e.to_string(),
        })?;

        let mut raw = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !raw.is_empty() && !raw.ends_with('\n') {
                raw.push('\n');
            }
            raw.push_str(&stderr);
        }

        Ok(ToolRunOutput {
            name: config.name.clone(),
            kind: config.kind,
            raw,
            exit_code: output.status.code().unwrap_or(-1),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Keep only change-set entries that still exist under the workspace.
fn existing_files(files: &[PathBuf], workdir: &Path) -> Vec<PathBuf> {
    files
        .iter()
        .filter(|f| workdir.join(f).is_file())
        .cloned()
        .collect()
}
