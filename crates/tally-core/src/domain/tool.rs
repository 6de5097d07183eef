//! Analysis-tool identities.

use serde::{Deserialize, Serialize};

/// The two classes of analysis tool the pipeline understands.
///
/// The kind selects the output parser and the issue attribution rules; the
/// concrete command line lives in the tool configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Score-producing linter (`path:line:column: code message` plus a
    /// `rated at X/10` summary line).
    Lint,

    /// Format checker (`would reformat <path>` lines, non-zero exit when
    /// files need reformatting).
    Format,
}

impl ToolKind {
    /// Display name attached to issues and shown in the report.
    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Lint => "Pylint",
            ToolKind::Format => "Black",
        }
    }
}
