//! Normalized analysis findings and cross-tool deduplication.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One finding reported by an analysis tool. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Path of the owning file, as the tool reported it.
    pub file: String,

    /// 1-based line number, when the tool attributes one.
    pub line: Option<u32>,

    /// Column number, when the tool attributes one.
    pub column: Option<u32>,

    /// Tool-specific diagnostic code (e.g. `C0114`), when the tool has one.
    pub code: Option<String>,

    /// Human-readable finding text.
    pub message: String,

    /// Display name of the reporting tool.
    pub tool: String,
}

/// Collapse duplicate issues, preserving first-seen order.
///
/// Two issues are duplicates iff (file, line-or-empty, message) all match.
/// Tool identity and code are deliberately excluded from the key: the same
/// defect worded differently by two tools is kept twice, while one tool
/// repeating the same line/message is collapsed.
pub fn dedup_issues(issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(issues.len());

    for issue in issues {
        let key = (
            issue.file.clone(),
            issue.line.map(|l| l.to_string()).unwrap_or_default(),
            issue.message.clone(),
        );
        if seen.insert(key) {
            unique.push(issue);
        }
    }

    unique
}
