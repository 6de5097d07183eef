//! Report rendering.
//!
//! Builds the multipart message bodies: one self-contained HTML document
//! and a compact plain-text alternative. Rendering is pure; delivery lives
//! in `tally-ci`.

use crate::domain::issue::Issue;
use crate::domain::report::{Report, RunOutcome};

/// Render the HTML body for a report.
pub fn render_html(report: &Report) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(STYLE);
    out.push_str("</head>\n<body>\n");

    out.push_str("<div class=\"header\">\n<h1>Code Quality Report</h1>\n");
    out.push_str("<p>Tally - Automated Code Review</p>\n</div>\n");
    out.push_str("<div class=\"container\">\n");

    render_summary_card(&mut out, report);

    if let Some(score) = report.score {
        render_score(&mut out, score);
    }

    render_stats(&mut out, report);

    match report.outcome {
        RunOutcome::NoChanges => {
            out.push_str("<div class=\"card\">\n<h3>No Source Changes</h3>\n");
            out.push_str(
                "<p>This commit changed no source files of the analyzed type, so no checks were run.</p>\n</div>\n",
            );
        }
        RunOutcome::SetupFailed => {
            out.push_str("<div class=\"card error\">\n<h3>Repository Setup Failed</h3>\n");
            out.push_str("<p>The working copy could not be prepared; no analysis was performed.</p>\n");
            if let Some(failure) = &report.failure {
                out.push_str(&format!("<p><code>{}</code></p>\n", escape_html(failure)));
            }
            out.push_str("</div>\n");
        }
        RunOutcome::Analyzed | RunOutcome::InternalError => {
            render_issues(&mut out, &report.issues);
        }
    }

    render_details_card(&mut out, report);
    render_next_steps(&mut out, report);

    out.push_str("</div>\n");
    out.push_str(&format!(
        "<div class=\"footer\">\n<p>This is an automated message from the Tally code quality service.</p>\n<p>Generated on {}</p>\n</div>\n",
        report.generated_at.format("%Y-%m-%d at %H:%M:%S UTC")
    ));
    out.push_str("</body>\n</html>\n");

    out
}

/// Render the plain-text alternative part.
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();

    out.push_str(&format!("Code Quality Report - {}\n\n", report.repo_name));
    out.push_str(&format!("Repository: {}\n", report.repo_url));
    out.push_str(&format!("Branch:     {}\n", report.branch));
    out.push_str(&format!("Commit:     {}\n", report.commit));
    out.push_str(&format!(
        "Status:     {}\n",
        if report.passed() {
            "all checks passed"
        } else {
            "issues detected"
        }
    ));

    if let Some(score) = report.score {
        out.push_str(&format!("Score:      {score:.2}/10\n"));
    }

    match report.outcome {
        RunOutcome::NoChanges => {
            out.push_str("\nNo source files of the analyzed type were changed by this commit.\n");
        }
        RunOutcome::SetupFailed => {
            out.push_str("\nRepository setup failed; no analysis was performed.\n");
            if let Some(failure) = &report.failure {
                out.push_str(&format!("Reason: {failure}\n"));
            }
        }
        RunOutcome::Analyzed | RunOutcome::InternalError => {
            if report.issues.is_empty() {
                out.push_str("\nAll code quality checks passed.\n");
            } else {
                out.push_str(&format!("\n{} issue(s) found:\n", report.issues.len()));
                for issue in &report.issues {
                    let line = issue
                        .line
                        .map(|l| format!(":{l}"))
                        .unwrap_or_default();
                    out.push_str(&format!(
                        "  {}{} [{}] {}\n",
                        issue.file, line, issue.tool, issue.message
                    ));
                }
            }
        }
    }

    out.push_str(&format!(
        "\nGenerated on {}\n",
        report.generated_at.format("%Y-%m-%d at %H:%M:%S UTC")
    ));

    out
}

fn render_summary_card(out: &mut String, report: &Report) {
    let (class, status) = if report.passed() {
        ("success", "All checks passed")
    } else {
        ("warning", "Issues detected")
    };

    out.push_str(&format!("<div class=\"card {class}\">\n"));
    out.push_str(&format!(
        "<h2>Repository: {}</h2>\n",
        escape_html(&report.repo_name)
    ));
    out.push_str(&format!(
        "<p><strong>Branch:</strong> {}</p>\n",
        escape_html(&report.branch)
    ));
    out.push_str(&format!(
        "<p><strong>Commit:</strong> <code>{}</code></p>\n",
        escape_html(report.short_commit())
    ));
    out.push_str(&format!("<p><strong>Status:</strong> {status}</p>\n</div>\n"));
}

fn render_score(out: &mut String, score: f64) {
    // The dial is a conic gradient filled to score/10.
    let percent = (score * 10.0).clamp(0.0, 100.0);
    out.push_str("<div class=\"score\">\n<h3>Quality Score</h3>\n");
    out.push_str(&format!(
        "<div class=\"score-circle\" style=\"--score: {percent:.0}%;\"><span>{score:.2}/10</span></div>\n"
    ));
    out.push_str("<p>A higher score means better code quality.</p>\n</div>\n");
}

fn render_stats(out: &mut String, report: &Report) {
    out.push_str("<div class=\"stats\">\n");
    out.push_str(&format!(
        "<div class=\"stat-item\"><h3>Files</h3><p>{}</p></div>\n",
        report.files_count()
    ));
    out.push_str(&format!(
        "<div class=\"stat-item\"><h3>Total Issues</h3><p>{}</p></div>\n",
        report.issues.len()
    ));
    out.push_str("<div class=\"stat-item\"><h3>Tools</h3><p>Pylint + Black</p></div>\n");
    out.push_str("</div>\n");
}

fn render_issues(out: &mut String, issues: &[Issue]) {
    if issues.is_empty() {
        out.push_str("<div class=\"card success\">\n<h3>Excellent Work!</h3>\n");
        out.push_str(
            "<p>All code quality checks have passed. The code meets the quality standards.</p>\n</div>\n",
        );
        return;
    }

    out.push_str("<div class=\"card error\">\n<h3>Code Quality Issues Found</h3>\n");

    for (file, file_issues) in group_by_file(issues) {
        out.push_str(&format!(
            "<div class=\"file-header\"><h4>{}</h4><p>{} issue(s)</p></div>\n",
            escape_html(file),
            file_issues.len()
        ));
        for issue in file_issues {
            let line = issue
                .line
                .map(|l| l.to_string())
                .unwrap_or_else(|| "N/A".to_string());
            let code = issue.code.as_deref().unwrap_or("");
            out.push_str(&format!(
                "<div class=\"issue\"><strong>{}:</strong> {}<br><small>Line {} | {}</small></div>\n",
                escape_html(&issue.tool),
                escape_html(&issue.message),
                line,
                escape_html(code)
            ));
        }
    }

    out.push_str("</div>\n");
}

fn render_details_card(out: &mut String, report: &Report) {
    out.push_str("<div class=\"card\">\n<h3>Repository Details</h3>\n");
    out.push_str(&format!(
        "<p><strong>URL:</strong> <a href=\"{0}\">{0}</a></p>\n",
        escape_html(&report.repo_url)
    ));
    out.push_str(&format!(
        "<p><strong>Commit Hash:</strong> <code>{}</code></p>\n</div>\n",
        escape_html(&report.commit)
    ));
}

fn render_next_steps(out: &mut String, report: &Report) {
    out.push_str("<div class=\"card\">\n<h3>Next Steps</h3>\n");
    let advice = match report.outcome {
        RunOutcome::Analyzed if report.issues.is_empty() => {
            "You can proceed with merging this code."
        }
        RunOutcome::Analyzed | RunOutcome::InternalError => {
            "Please review the issues above and fix them before merging."
        }
        RunOutcome::NoChanges => "No action required.",
        RunOutcome::SetupFailed => {
            "Check repository access and branch name, then push again to retry."
        }
    };
    out.push_str(&format!("<p>{advice}</p>\n</div>\n"));
}

/// Group issues by file, preserving the order files first appear in.
fn group_by_file(issues: &[Issue]) -> Vec<(&str, Vec<&Issue>)> {
    let mut groups: Vec<(&str, Vec<&Issue>)> = Vec::new();
    for issue in issues {
        match groups.iter_mut().find(|(file, _)| *file == issue.file) {
            Some((_, list)) => list.push(issue),
            None => groups.push((issue.file.as_str(), vec![issue])),
        }
    }
    groups
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "<style>\n\
body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }\n\
.header { background: #343a40; color: white; padding: 20px; text-align: center; }\n\
.container { max-width: 800px; margin: 0 auto; padding: 20px; background: #f9f9f9; }\n\
.card { background: white; border-radius: 10px; padding: 20px; margin: 20px 0; }\n\
.success { border-left: 4px solid #28a745; }\n\
.warning { border-left: 4px solid #ffc107; }\n\
.error { border-left: 4px solid #dc3545; }\n\
.issue { background: #fff3cd; padding: 10px; margin: 5px 0; border-radius: 5px; }\n\
.file-header { background: #e9ecef; padding: 10px; border-radius: 5px; margin: 10px 0; }\n\
.stats { display: flex; justify-content: space-around; margin: 20px 0; }\n\
.stat-item { text-align: center; padding: 15px; background: white; border-radius: 8px; }\n\
.score { text-align: center; margin: 20px 0; }\n\
.score-circle { --score: 75%; width: 120px; height: 120px; border-radius: 50%;\n\
  display: flex; align-items: center; justify-content: center; font-weight: bold;\n\
  margin: 0 auto; background: conic-gradient(#4caf50 var(--score), #e0e0e0 var(--score)); }\n\
.footer { text-align: center; margin-top: 30px; padding: 20px; background: #343a40; color: white; }\n\
</style>\n";
