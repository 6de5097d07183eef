//! Pipeline orchestration.
//!
//! Drives one run through its stages in strict sequence and maps every
//! failure class to a report instead of a panic or a silent abort:
//! setup failures stop analysis but still notify, a tool failure only
//! silences that tool, and anything unexpected becomes a synthetic
//! single-issue report. The only silent paths are malformed ingress
//! (dropped before the pipeline is reached) and mail-transport failure.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use tracing::Instrument;

use tally_core::config::TallyConfig;
use tally_core::domain::error::{Result, TallyError};
use tally_core::domain::event::RunCoordinates;
use tally_core::domain::issue::{dedup_issues, Issue};
use tally_core::domain::report::{average_score, Report};
use tally_core::obs;
use tally_core::parse::parse_tool_output;

use crate::changes::ChangeDetector;
use crate::notify::Mailer;
use crate::runner::ToolRunner;
use crate::sync::Synchronizer;
use crate::tool::{default_tools, ToolConfig};

/// The event-to-report pipeline, constructed once at startup from the
/// immutable configuration and shared across workers.
pub struct Pipeline {
    synchronizer: Synchronizer,
    detector: ChangeDetector,
    tools: Vec<ToolConfig>,
    mailer: Mailer,
}

impl Pipeline {
    /// Build the pipeline, including the SMTP transport, from config.
    pub fn new(config: &TallyConfig) -> Result<Self> {
        let mailer = Mailer::from_config(&config.smtp)?;
        Ok(Self::with_mailer(config, mailer))
    }

    /// Build the pipeline around a caller-supplied mailer.
    pub fn with_mailer(config: &TallyConfig, mailer: Mailer) -> Self {
        Self {
            synchronizer: Synchronizer::new(&config.git),
            detector: ChangeDetector::new(
                config.analysis.source_extension.clone(),
                config.git.op_timeout_secs,
            ),
            tools: default_tools(
                config.analysis.lint_timeout_secs,
                config.analysis.format_timeout_secs,
            ),
            mailer,
        }
    }

    /// Replace the builtin tool pair (used by tests and bespoke deployments).
    pub fn with_tools(mut self, tools: Vec<ToolConfig>) -> Self {
        self.tools = tools;
        self
    }

    /// Working-copy path a run for `repo_url` would use. The ingress layer
    /// keys its per-repository locks on this.
    pub fn workspace_key(&self, repo_url: &str) -> PathBuf {
        self.synchronizer.workspace_path(repo_url)
    }

    /// Drive one run end to end and return the report that was delivered.
    ///
    /// Never returns an error: every failure mode maps to a report, and
    /// delivery failures are logged and swallowed.
    pub async fn execute(&self, coords: RunCoordinates) -> Report {
        // Monotonic per-process run id derived from the start time.
        let run_id = Utc::now().timestamp_millis();
        let span = obs::run_span(run_id);

        async {
            let started = Instant::now();
            obs::emit_run_started(run_id, &coords.repo_url, &coords.branch, &coords.commit);

            let report = match self.run_stages(run_id, &coords).await {
                Ok(report) => report,
                Err(TallyError::Setup(reason)) => Report::setup_failed(&coords, reason),
                Err(other) => Report::internal_error(&coords, other.to_string()),
            };

            self.mailer.deliver(&report).await;

            obs::emit_run_finished(
                run_id,
                report.outcome.as_str(),
                report.issues.len(),
                started.elapsed().as_millis() as u64,
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, run_id: i64, coords: &RunCoordinates) -> Result<Report> {
        let workspace = self
            .synchronizer
            .synchronize(&coords.repo_url, &coords.branch)
            .await?;

        let changes = self.detector.detect(&workspace, &coords.commit).await;
        obs::emit_changes_detected(run_id, changes.origin.as_str(), changes.files.len());

        if changes.is_empty() {
            return Ok(Report::no_changes(coords));
        }

        let (outputs, failures) = ToolRunner::run_all(&self.tools, &changes, &workspace).await;
        for failure in &failures {
            obs::emit_tool_failed(run_id, &failure.tool, &failure.reason);
        }

        let mut issues: Vec<Issue> = Vec::new();
        let mut scores = Vec::new();
        for output in &outputs {
            let (mut parsed, score) = parse_tool_output(&output.raw, output.kind, None);
            issues.append(&mut parsed);
            if let Some(score) = score {
                scores.push(score);
            }
        }

        let issues = dedup_issues(issues);
        Ok(Report::analyzed(coords, issues, average_score(&scores)))
    }
}
