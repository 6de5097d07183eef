//! Tally CI - the event-to-report pipeline
//!
//! Turns extracted run coordinates into a delivered quality report:
//! - Synchronizes a shallow working copy of the pushed branch
//! - Detects the source files the commit changed (with shallow fallbacks)
//! - Executes the analysis tools with per-tool timeouts and isolation
//! - Normalizes, deduplicates, and mails the findings

pub mod changes;
pub mod git;
pub mod notify;
pub mod pipeline;
pub mod runner;
pub mod sync;
pub mod tool;

// Re-export key types
pub use changes::{ChangeDetector, ChangeSet, ChangeSetOrigin};
pub use notify::Mailer;
pub use pipeline::Pipeline;
pub use runner::{ToolFailure, ToolRunOutput, ToolRunner};
pub use sync::{Synchronizer, Workspace};
pub use tool::{default_tools, ToolConfig};
