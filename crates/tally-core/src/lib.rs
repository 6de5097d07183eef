//! Tally Core Library
//!
//! Pure domain logic for the tally code-quality pipeline: webhook event
//! classification, analysis-tool output normalization, issue deduplication,
//! report rendering, and service configuration.
//!
//! Everything in this crate is side-effect free; process execution, git
//! access, and mail delivery live in `tally-ci`.

pub mod config;
pub mod domain;
pub mod obs;
pub mod parse;
pub mod report_html;
pub mod telemetry;

pub use config::{AnalysisConfig, ConfigError, GitConfig, ServerConfig, SmtpConfig, TallyConfig};

pub use domain::{
    dedup_issues, repo_name_from_url, EventError, Issue, Report, Result, RunCoordinates,
    RunOutcome, TallyError, ToolKind, WebhookEvent,
};

pub use parse::parse_tool_output;

pub use report_html::{render_html, render_text};

pub use telemetry::init_tracing;
