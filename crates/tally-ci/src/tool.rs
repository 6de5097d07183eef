//! Analysis-tool definitions and configuration.

use serde::{Deserialize, Serialize};
use tally_core::domain::tool::ToolKind;

/// Configuration for one analysis tool.
///
/// The command holds the executable and its static options; the runner
/// appends the changed files as trailing arguments. Option variance
/// (disabled rule classes, line-length limits) lives here, not in the
/// runner contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Name used in logs and failure records.
    pub name: String,

    /// Which parser understands this tool's output.
    pub kind: ToolKind,

    /// Command prefix (first element is the executable).
    pub command: Vec<String>,

    /// Timeout in seconds.
    pub timeout_secs: u64,

    /// Whether this tool runs.
    pub enabled: bool,
}

impl ToolConfig {
    /// The score-producing linter with its static option set.
    pub fn lint(timeout_secs: u64) -> Self {
        Self {
            name: "pylint".to_string(),
            kind: ToolKind::Lint,
            command: vec![
                "pylint".to_string(),
                "--disable=C0301".to_string(),
                "--max-line-length=120".to_string(),
            ],
            timeout_secs,
            enabled: true,
        }
    }

    /// The format checker in check-only mode.
    pub fn format(timeout_secs: u64) -> Self {
        Self {
            name: "black".to_string(),
            kind: ToolKind::Format,
            command: vec!["black".to_string(), "--check".to_string()],
            timeout_secs,
            enabled: true,
        }
    }

    /// Create a custom tool configuration.
    pub fn custom(name: String, kind: ToolKind, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            kind,
            command,
            timeout_secs,
            enabled: true,
        }
    }

    /// Disable this tool.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// The builtin lint + format pair with the given per-tool deadlines.
pub fn default_tools(lint_timeout_secs: u64, format_timeout_secs: u64) -> Vec<ToolConfig> {
    vec![
        ToolConfig::lint(lint_timeout_secs),
        ToolConfig::format(format_timeout_secs),
    ]
}
