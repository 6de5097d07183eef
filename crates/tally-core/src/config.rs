//! Service configuration.
//!
//! Configuration is loaded once at startup, validated, and then passed down
//! as an immutable value. Secrets come from the environment when set there,
//! otherwise from the config file; the git token is mandatory either way.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "tally.toml";

/// Environment override for `[git] token`.
pub const GIT_TOKEN_ENV: &str = "TALLY_GIT_TOKEN";

/// Environment override for `[smtp] password`.
pub const SMTP_PASSWORD_ENV: &str = "TALLY_SMTP_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("missing required secret: set {0} in the environment or the config file")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub server: ServerConfig,

    pub smtp: SmtpConfig,

    pub git: GitConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the webhook listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Number of background pipeline workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending-event queue depth; a full queue rejects new webhooks.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// Sender address, also the SMTP username.
    pub sender: String,

    /// SMTP password; prefer the TALLY_SMTP_PASSWORD environment variable.
    #[serde(default)]
    pub password: String,

    /// STARTTLS relay host.
    pub relay: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Fixed recipient of every report.
    pub manager: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitConfig {
    /// Access token embedded into https clone URLs. Mandatory; there is no
    /// built-in fallback value.
    #[serde(default)]
    pub token: String,

    /// Directory holding the per-repository working copies.
    #[serde(default = "default_workspaces_root")]
    pub workspaces_root: PathBuf,

    /// Deadline for a single git operation, in seconds.
    #[serde(default = "default_git_timeout")]
    pub op_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Extension of the source files under analysis, without the dot.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Deadline for the score-producing linter, in seconds.
    #[serde(default = "default_lint_timeout")]
    pub lint_timeout_secs: u64,

    /// Deadline for the format checker, in seconds.
    #[serde(default = "default_format_timeout")]
    pub format_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    64
}

fn default_smtp_port() -> u16 {
    587
}

fn default_workspaces_root() -> PathBuf {
    PathBuf::from("workspaces")
}

fn default_git_timeout() -> u64 {
    300
}

fn default_source_extension() -> String {
    "py".to_string()
}

fn default_lint_timeout() -> u64 {
    120
}

fn default_format_timeout() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source_extension: default_source_extension(),
            lint_timeout_secs: default_lint_timeout(),
            format_timeout_secs: default_format_timeout(),
        }
    }
}

impl TallyConfig {
    /// Load, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let mut config: TallyConfig = toml::from_str(&raw)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(GIT_TOKEN_ENV) {
            if !token.is_empty() {
                self.git.token = token;
            }
        }
        if let Ok(password) = std::env::var(SMTP_PASSWORD_ENV) {
            if !password.is_empty() {
                self.smtp.password = password;
            }
        }
    }

    /// Reject configurations missing the secrets the pipeline cannot run
    /// without. The token requirement is deliberate: there is no default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.git.token.trim().is_empty() {
            return Err(ConfigError::MissingSecret(GIT_TOKEN_ENV));
        }
        if self.smtp.password.trim().is_empty() {
            return Err(ConfigError::MissingSecret(SMTP_PASSWORD_ENV));
        }
        Ok(())
    }
}
