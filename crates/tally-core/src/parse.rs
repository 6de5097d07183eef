//! Best-effort normalization of raw tool output.
//!
//! Analysis tools emit free text, so parsing is line-oriented and lenient:
//! each tool kind has a small table of recognized line patterns and every
//! unrecognized line is skipped silently. This is deliberately not a strict
//! grammar.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::issue::Issue;
use crate::domain::tool::ToolKind;

/// `Your code has been rated at 8.43/10` — the lint tool's summary score.
static SCORE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"rated at ([0-9.]+)/10").expect("score pattern"));

/// `path:line:column: code message` — one lint finding per line.
static LINT_FINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):(\d+):(\d+): (\w+):? (.+)$").expect("finding pattern"));

/// Marker the format checker prints for each file it would rewrite.
const REFORMAT_MARKER: &str = "would reformat";

/// Message attached to every formatting finding.
pub const FORMAT_MESSAGE: &str = "File needs formatting";

/// Label used when a formatting line carries no usable path and the caller
/// supplied no fallback.
const UNATTRIBUTED_FILE: &str = "multiple files";

/// Parse one tool's raw textual output into findings and an optional score.
///
/// `fallback_file` attributes formatting findings whose line does not name
/// a specific file.
pub fn parse_tool_output(
    output: &str,
    kind: ToolKind,
    fallback_file: Option<&str>,
) -> (Vec<Issue>, Option<f64>) {
    let mut issues = Vec::new();
    let mut score = None;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = SCORE_LINE.captures(line) {
            if let Ok(value) = caps[1].parse::<f64>() {
                score = Some(value);
            }
            continue;
        }

        match kind {
            ToolKind::Lint => {
                if let Some(caps) = LINT_FINDING.captures(line) {
                    issues.push(Issue {
                        file: caps[1].to_string(),
                        line: caps[2].parse().ok(),
                        column: caps[3].parse().ok(),
                        code: Some(caps[4].to_string()),
                        message: caps[5].to_string(),
                        tool: kind.display_name().to_string(),
                    });
                }
            }
            ToolKind::Format => {
                if let Some(at) = line.find(REFORMAT_MARKER) {
                    let trailing = line[at + REFORMAT_MARKER.len()..].trim();
                    let file = if !trailing.is_empty() {
                        trailing.to_string()
                    } else {
                        fallback_file.unwrap_or(UNATTRIBUTED_FILE).to_string()
                    };
                    issues.push(Issue {
                        file,
                        line: None,
                        column: None,
                        code: None,
                        message: FORMAT_MESSAGE.to_string(),
                        tool: kind.display_name().to_string(),
                    });
                }
            }
        }
    }

    (issues, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lint_score_line_is_extracted() {
        let output = "\n------------------------------------\nYour code has been rated at 8.43/10\n";
        let (issues, score) = parse_tool_output(output, ToolKind::Lint, None);
        assert!(issues.is_empty());
        assert_eq!(score, Some(8.43));
    }

    #[test]
    fn lint_finding_fields_are_captured_verbatim() {
        let output = "src/app.py:12:4: C0103: Variable name \"x\" doesn't conform to snake_case";
        let (issues, score) = parse_tool_output(output, ToolKind::Lint, None);
        assert_eq!(score, None);
        assert_eq!(issues.len(), 1);

        let issue = &issues[0];
        assert_eq!(issue.file, "src/app.py");
        assert_eq!(issue.line, Some(12));
        assert_eq!(issue.column, Some(4));
        assert_eq!(issue.code.as_deref(), Some("C0103"));
        assert!(issue.message.starts_with("Variable name"));
        assert_eq!(issue.tool, "Pylint");
    }

    #[test]
    fn lint_output_mixes_findings_and_score() {
        let output = "\
************* Module app
app.py:1:0: C0114: Missing module docstring (missing-module-docstring)
app.py:3:0: C0116: Missing function docstring (missing-function-docstring)

Your code has been rated at 7.50/10 (previous run: 7.50/10, +0.00)
";
        let (issues, score) = parse_tool_output(output, ToolKind::Lint, None);
        assert_eq!(issues.len(), 2);
        assert_eq!(score, Some(7.5));
    }

    #[test]
    fn format_line_names_the_file_when_present() {
        let output = "would reformat src/app.py";
        let (issues, score) = parse_tool_output(output, ToolKind::Format, Some("other.py"));
        assert_eq!(score, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "src/app.py");
        assert_eq!(issues[0].message, FORMAT_MESSAGE);
        assert_eq!(issues[0].line, None);
        assert_eq!(issues[0].tool, "Black");
    }

    #[test]
    fn format_line_falls_back_to_caller_label() {
        let output = "1 file would reformat";
        let (issues, _) = parse_tool_output(output, ToolKind::Format, Some("src/app.py"));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, "src/app.py");

        let (issues, _) = parse_tool_output(output, ToolKind::Format, None);
        assert_eq!(issues[0].file, "multiple files");
    }

    #[test]
    fn format_summary_lines_without_marker_are_skipped() {
        let output = "\
would reformat a.py
would reformat b.py
Oh no! 💥 💔 💥
2 files would be reformatted.
";
        let (issues, _) = parse_tool_output(output, ToolKind::Format, None);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].file, "a.py");
        assert_eq!(issues[1].file, "b.py");
    }

    #[test]
    fn unrecognized_lines_are_skipped_silently() {
        let output = "some banner\n*** noise ***\nnot a finding";
        let (issues, score) = parse_tool_output(output, ToolKind::Lint, None);
        assert!(issues.is_empty());
        assert_eq!(score, None);
    }

    #[test]
    fn malformed_score_is_ignored() {
        let output = "Your code has been rated at ././/10";
        let (_, score) = parse_tool_output(output, ToolKind::Lint, None);
        assert_eq!(score, None);
    }
}
