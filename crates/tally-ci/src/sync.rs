//! Repository synchronization.
//!
//! Maintains one local working copy per remote repository. Fresh copies
//! are shallow (depth 1) to keep clone time bounded on large histories;
//! change detection downstream tolerates the missing ancestors this
//! implies. Existing copies are stashed, fetched, and fast-forwarded.

use std::path::{Path, PathBuf};
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use tally_core::config::GitConfig;
use tally_core::domain::error::{Result, TallyError};
use tally_core::domain::event::repo_name_from_url;

use crate::git::run_git;

/// A local working copy bound to one (remote URL, branch) pair.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub path: PathBuf,
    pub repo_url: String,
    pub branch: String,
}

/// Clones and updates working copies under one root directory.
pub struct Synchronizer {
    workspaces_root: PathBuf,
    token: String,
    op_timeout_secs: u64,
}

impl Synchronizer {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            workspaces_root: config.workspaces_root.clone(),
            token: config.token.clone(),
            op_timeout_secs: config.op_timeout_secs,
        }
    }

    /// Working-copy location for a remote URL.
    ///
    /// The name carries a digest suffix so same-named repositories from
    /// different owners get distinct directories.
    pub fn workspace_path(&self, repo_url: &str) -> PathBuf {
        let name = repo_name_from_url(repo_url);
        let digest = hex::encode(Sha256::digest(repo_url.as_bytes()));
        self.workspaces_root.join(format!("{name}-{}", &digest[..8]))
    }

    /// Ensure an up-to-date working copy of `branch` exists and return it.
    pub async fn synchronize(&self, repo_url: &str, branch: &str) -> Result<Workspace> {
        tokio::fs::create_dir_all(&self.workspaces_root)
            .await
            .map_err(|e| TallyError::Setup(format!("cannot create workspaces root: {e}")))?;

        let path = self.workspace_path(repo_url);

        if path.join(".git").is_dir() {
            self.update(repo_url, branch, &path).await?;
        } else {
            self.clone_fresh(repo_url, branch, &path).await?;
        }

        Ok(Workspace {
            path,
            repo_url: repo_url.to_string(),
            branch: branch.to_string(),
        })
    }

    /// Shallow-clone the branch into a new working copy. A failed clone
    /// removes whatever it left behind so the next run starts clean.
    async fn clone_fresh(&self, repo_url: &str, branch: &str, path: &Path) -> Result<()> {
        let dir_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TallyError::Setup("workspace path has no directory name".to_string()))?;

        info!(repo = %repo_url, branch = %branch, "cloning repository (depth 1)");
        let started = Instant::now();

        let authenticated = self.authenticated_url(repo_url);
        let result = run_git(
            &self.workspaces_root,
            &[
                "clone",
                "--depth",
                "1",
                "--branch",
                branch,
                "--single-branch",
                authenticated.as_str(),
                dir_name,
            ],
            self.op_timeout_secs,
        )
        .await;

        match result {
            Ok(_) => {
                info!(
                    repo = %repo_url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "repository cloned"
                );
                Ok(())
            }
            Err(e) => {
                if path.exists() {
                    match tokio::fs::remove_dir_all(path).await {
                        Ok(()) => info!(path = %path.display(), "removed partial clone"),
                        Err(cleanup) => {
                            warn!(path = %path.display(), error = %cleanup, "failed to remove partial clone")
                        }
                    }
                }
                Err(TallyError::Setup(self.redact(&e.to_string())))
            }
        }
    }

    /// Bring an existing working copy to the remote tip of `branch`.
    async fn update(&self, repo_url: &str, branch: &str, path: &Path) -> Result<()> {
        info!(repo = %repo_url, branch = %branch, "updating existing working copy");
        let started = Instant::now();
        let timeout = self.op_timeout_secs;

        // Local modifications would block the checkout; stashing is
        // best-effort and an empty stash is not an error worth surfacing.
        if let Err(e) = run_git(path, &["stash"], timeout).await {
            info!(error = %self.redact(&e.to_string()), "nothing stashed");
        }

        // Refresh the stored remote URL so a rotated token takes effect.
        let authenticated = self.authenticated_url(repo_url);
        for args in [
            vec!["remote", "set-url", "origin", authenticated.as_str()],
            vec!["fetch", "origin", branch],
            vec!["checkout", branch],
            vec!["pull", "--ff-only", "origin", branch],
        ] {
            run_git(path, &args, timeout)
                .await
                .map_err(|e| TallyError::Setup(self.redact(&e.to_string())))?;
        }

        info!(
            repo = %repo_url,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "working copy updated"
        );
        Ok(())
    }

    /// Embed the access token into https remote URLs. Other schemes
    /// (ssh, file) pass through untouched.
    fn authenticated_url(&self, repo_url: &str) -> String {
        match repo_url.strip_prefix("https://") {
            Some(rest) => format!("https://{}@{rest}", self.token),
            None => repo_url.to_string(),
        }
    }

    /// Strip the token from text destined for logs or reports.
    fn redact(&self, text: &str) -> String {
        if self.token.is_empty() {
            text.to_string()
        } else {
            text.replace(&self.token, "***")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &Path) -> GitConfig {
        GitConfig {
            token: "sekrit-token".to_string(),
            workspaces_root: root.to_path_buf(),
            op_timeout_secs: 60,
        }
    }

    #[test]
    fn workspace_path_is_stable_and_collision_free() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Synchronizer::new(&config(dir.path()));

        let a = sync.workspace_path("https://example.com/alice/widget.git");
        let b = sync.workspace_path("https://example.com/bob/widget.git");

        assert_ne!(a, b, "same repo name under different owners must differ");
        assert_eq!(a, sync.workspace_path("https://example.com/alice/widget.git"));
        assert!(a
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("widget-"));
    }

    #[test]
    fn authenticated_url_rewrites_https_only() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Synchronizer::new(&config(dir.path()));

        assert_eq!(
            sync.authenticated_url("https://example.com/org/widget.git"),
            "https://sekrit-token@example.com/org/widget.git"
        );
        assert_eq!(
            sync.authenticated_url("git@example.com:org/widget.git"),
            "git@example.com:org/widget.git"
        );
        assert_eq!(
            sync.authenticated_url("file:///tmp/widget"),
            "file:///tmp/widget"
        );
    }

    #[test]
    fn redact_removes_the_token_from_error_text() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Synchronizer::new(&config(dir.path()));

        let redacted =
            sync.redact("fatal: repository 'https://sekrit-token@example.com/x' not found");
        assert!(!redacted.contains("sekrit-token"));
        assert!(redacted.contains("https://***@example.com/x"));
    }

    #[tokio::test]
    async fn clone_failure_leaves_no_partial_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sync = Synchronizer::new(&config(dir.path()));
        let url = "file:///nonexistent/tally/fixture";

        let err = sync.synchronize(url, "main").await.unwrap_err();
        assert!(matches!(err, TallyError::Setup(_)));
        assert!(!sync.workspace_path(url).exists());
    }
}
