//! Structured observability hooks for pipeline run lifecycle events.
//!
//! Every accepted event gets a run id derived from its start time; the
//! span returned by [`run_span`] carries it so all log lines of one run
//! correlate. Lifecycle milestones are emitted through the `emit_*`
//! functions at `info!`/`warn!` level.

use tracing::{info, warn};

/// Span covering one pipeline run. Attach with `Instrument::instrument`.
pub fn run_span(run_id: i64) -> tracing::Span {
    tracing::info_span!("tally.run", run_id = run_id)
}

/// Emit event: run started for the extracted coordinates.
pub fn emit_run_started(run_id: i64, repo: &str, branch: &str, commit: &str) {
    info!(
        event = "run.started",
        run_id = run_id,
        repo = %repo,
        branch = %branch,
        commit = %commit,
    );
}

/// Emit event: change detection finished, with the fallback tier used.
pub fn emit_changes_detected(run_id: i64, origin: &str, files: usize) {
    info!(
        event = "run.changes_detected",
        run_id = run_id,
        origin = %origin,
        files = files,
    );
}

/// Emit event: one analysis tool failed; the run continues without it.
pub fn emit_tool_failed(run_id: i64, tool: &str, reason: &str) {
    warn!(event = "run.tool_failed", run_id = run_id, tool = %tool, reason = %reason);
}

/// Emit event: run finished with its outcome and finding count.
pub fn emit_run_finished(run_id: i64, outcome: &str, issues: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = run_id,
        outcome = %outcome,
        issues = issues,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_functions_do_not_panic_without_subscriber() {
        emit_run_started(1, "widget", "main", "abc");
        emit_changes_detected(1, "parent_diff", 3);
        emit_tool_failed(1, "pylint", "timed out");
        emit_run_finished(1, "analyzed", 3, 1200);
    }

    #[test]
    fn run_span_is_named_after_the_run() {
        let span = run_span(42);
        // Disabled spans (no subscriber) have no metadata to inspect;
        // entering must still be safe.
        let _guard = span.enter();
    }
}
