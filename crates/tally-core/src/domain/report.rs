//! The terminal report artifact.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::event::RunCoordinates;
use crate::domain::issue::Issue;

/// How a pipeline run concluded; drives the subject line and body framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Analysis ran to completion; the issue list may still be empty.
    Analyzed,

    /// The commit touched no source files of the analyzed type.
    NoChanges,

    /// Clone or update of the working copy failed; no analysis ran.
    SetupFailed,

    /// An unexpected error aborted the run.
    InternalError,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Analyzed => "analyzed",
            RunOutcome::NoChanges => "no_changes",
            RunOutcome::SetupFailed => "setup_failed",
            RunOutcome::InternalError => "internal_error",
        }
    }
}

/// The report built once per run, delivered once, and discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub repo_name: String,
    pub repo_url: String,
    pub branch: String,
    pub commit: String,
    pub outcome: RunOutcome,

    /// Deduplicated findings, first-seen order.
    pub issues: Vec<Issue>,

    /// Mean quality score across score-producing invocations, 0..=10.
    pub score: Option<f64>,

    /// Failure detail shown for setup/internal outcomes.
    pub failure: Option<String>,

    /// Best-effort commit author address, cc'd when present.
    pub author_email: Option<String>,

    pub generated_at: DateTime<Utc>,
}

impl Report {
    fn base(coords: &RunCoordinates, outcome: RunOutcome) -> Self {
        Self {
            repo_name: coords.repo_name(),
            repo_url: coords.repo_url.clone(),
            branch: coords.branch.clone(),
            commit: coords.commit.clone(),
            outcome,
            issues: Vec::new(),
            score: None,
            failure: None,
            author_email: coords.author_email.clone(),
            generated_at: Utc::now(),
        }
    }

    /// A completed analysis run.
    pub fn analyzed(coords: &RunCoordinates, issues: Vec<Issue>, score: Option<f64>) -> Self {
        Self {
            issues,
            score,
            ..Self::base(coords, RunOutcome::Analyzed)
        }
    }

    /// The commit changed no source files of the analyzed type.
    pub fn no_changes(coords: &RunCoordinates) -> Self {
        Self::base(coords, RunOutcome::NoChanges)
    }

    /// Clone or update failed before analysis could start.
    pub fn setup_failed(coords: &RunCoordinates, reason: String) -> Self {
        Self {
            failure: Some(reason),
            ..Self::base(coords, RunOutcome::SetupFailed)
        }
    }

    /// Catch-all conversion of an unexpected error into a single synthetic
    /// issue so the failure is still user-visible.
    pub fn internal_error(coords: &RunCoordinates, reason: String) -> Self {
        let synthetic = Issue {
            file: "system".to_string(),
            line: None,
            column: None,
            code: None,
            message: reason.clone(),
            tool: "System".to_string(),
        };
        Self {
            issues: vec![synthetic],
            failure: Some(reason),
            ..Self::base(coords, RunOutcome::InternalError)
        }
    }

    /// Mail subject line for this report.
    pub fn subject(&self) -> String {
        match self.outcome {
            RunOutcome::Analyzed => {
                let verdict = if self.issues.is_empty() {
                    "All Checks Passed"
                } else {
                    "Issues Found"
                };
                format!("Code Quality Report - {} - {}", self.repo_name, verdict)
            }
            RunOutcome::NoChanges => format!("No Source Changes - {}", self.repo_name),
            RunOutcome::SetupFailed => format!("Repository Setup Failed - {}", self.repo_name),
            RunOutcome::InternalError => {
                format!("Webhook Processing Error - {}", self.repo_name)
            }
        }
    }

    /// Abbreviated commit id for display.
    pub fn short_commit(&self) -> &str {
        if self.commit.len() >= 8 {
            &self.commit[..8]
        } else {
            &self.commit
        }
    }

    /// Number of distinct files carrying at least one issue.
    pub fn files_count(&self) -> usize {
        self.issues
            .iter()
            .map(|i| i.file.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Whether the run counts as clean.
    pub fn passed(&self) -> bool {
        matches!(self.outcome, RunOutcome::Analyzed | RunOutcome::NoChanges)
            && self.issues.is_empty()
    }
}

/// Arithmetic mean of the scores reported this run, when any were.
pub fn average_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}
