//! Change detection with shallow-clone fallbacks.
//!
//! Shallow working copies routinely cannot resolve a commit's parent, or
//! even the commit object itself. Detection therefore degrades through
//! three tiers instead of failing: parent diff, then full commit tree,
//! then a filesystem walk of the checkout. The detector never returns an
//! error.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::git::run_git;
use crate::sync::Workspace;

/// Which fallback tier produced a change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSetOrigin {
    /// Path-level diff against the commit's parent.
    ParentDiff,

    /// No parent available; every source file in the commit's tree.
    CommitTree,

    /// Commit unresolvable; every source file found on disk.
    WorkspaceWalk,
}

impl ChangeSetOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeSetOrigin::ParentDiff => "parent_diff",
            ChangeSetOrigin::CommitTree => "commit_tree",
            ChangeSetOrigin::WorkspaceWalk => "workspace_walk",
        }
    }
}

/// The source files one pipeline run will analyze.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    /// Paths relative to the workspace root, in discovery order.
    pub files: Vec<PathBuf>,

    pub origin: ChangeSetOrigin,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Determines which source files a commit affected.
pub struct ChangeDetector {
    source_extension: String,
    op_timeout_secs: u64,
}

impl ChangeDetector {
    pub fn new(source_extension: impl Into<String>, op_timeout_secs: u64) -> Self {
        Self {
            source_extension: source_extension.into(),
            op_timeout_secs,
        }
    }

    /// Detect the files to analyze for `commit`. Never fails: every error
    /// path degrades to a broader tier.
    pub async fn detect(&self, workspace: &Workspace, commit: &str) -> ChangeSet {
        let timeout = self.op_timeout_secs;
        let path = workspace.path.as_path();
        let parent = format!("{commit}^");

        // Tier 1: the parent is locally available, diff against it.
        if run_git(path, &["rev-parse", "--verify", parent.as_str()], timeout)
            .await
            .is_ok()
        {
            if let Ok(out) = run_git(
                path,
                &["diff", "--name-only", "--diff-filter=d", parent.as_str(), commit],
                timeout,
            )
            .await
            {
                return ChangeSet {
                    files: self.filter_source(out.lines()),
                    origin: ChangeSetOrigin::ParentDiff,
                };
            }
        }

        // Tier 2: first commit, or the parent was pruned by the shallow
        // fetch. Analyze the commit's whole tree.
        if let Ok(out) = run_git(path, &["ls-tree", "-r", "--name-only", commit], timeout).await {
            debug!(commit = %commit, "no parent available, listing commit tree");
            return ChangeSet {
                files: self.filter_source(out.lines()),
                origin: ChangeSetOrigin::CommitTree,
            };
        }

        // Tier 3: the commit object itself is unavailable. Walk the
        // checkout and analyze everything of the source type.
        info!(commit = %commit, "commit unresolvable in shallow copy, walking working copy");
        ChangeSet {
            files: self.walk_workspace(path),
            origin: ChangeSetOrigin::WorkspaceWalk,
        }
    }

    fn filter_source<'a>(&self, lines: impl Iterator<Item = &'a str>) -> Vec<PathBuf> {
        let suffix = format!(".{}", self.source_extension);
        lines
            .map(str::trim)
            .filter(|line| !line.is_empty() && line.ends_with(&suffix))
            .map(PathBuf::from)
            .collect()
    }

    fn walk_workspace(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_entry(|entry| entry.file_name() != std::ffi::OsStr::new(".git"))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext == self.source_extension.as_str())
                    .unwrap_or(false)
            })
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .map(Path::to_path_buf)
                    .ok()
            })
            .collect();
        files.sort();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn run_git_blocking(repo_dir: &Path, args: &[&str]) {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }

    fn head_sha(repo_dir: &Path) -> String {
        let output = StdCommand::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(repo_dir)
            .output()
            .unwrap();
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git_blocking(dir.path(), &["init"]);
        run_git_blocking(dir.path(), &["config", "user.name", "test-user"]);
        run_git_blocking(dir.path(), &["config", "user.email", "test@example.com"]);
        dir
    }

    fn workspace(dir: &tempfile::TempDir) -> Workspace {
        Workspace {
            path: dir.path().to_path_buf(),
            repo_url: "file:///fixture".to_string(),
            branch: "main".to_string(),
        }
    }

    #[tokio::test]
    async fn parent_diff_lists_only_changed_source_files() {
        let dir = make_git_repo();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("util.py"), "y = 2\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
        run_git_blocking(dir.path(), &["add", "."]);
        run_git_blocking(dir.path(), &["commit", "-m", "initial"]);

        std::fs::write(dir.path().join("app.py"), "x = 2\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "changed\n").unwrap();
        run_git_blocking(dir.path(), &["add", "."]);
        run_git_blocking(dir.path(), &["commit", "-m", "tweak"]);

        let detector = ChangeDetector::new("py", 30);
        let changes = detector.detect(&workspace(&dir), &head_sha(dir.path())).await;

        assert_eq!(changes.origin, ChangeSetOrigin::ParentDiff);
        assert_eq!(changes.files, vec![PathBuf::from("app.py")]);
    }

    #[tokio::test]
    async fn root_commit_falls_back_to_commit_tree() {
        let dir = make_git_repo();
        std::fs::write(dir.path().join("app.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
        run_git_blocking(dir.path(), &["add", "."]);
        run_git_blocking(dir.path(), &["commit", "-m", "initial"]);

        let detector = ChangeDetector::new("py", 30);
        let changes = detector.detect(&workspace(&dir), &head_sha(dir.path())).await;

        assert_eq!(changes.origin, ChangeSetOrigin::CommitTree);
        assert_eq!(changes.files, vec![PathBuf::from("app.py")]);
    }

    #[tokio::test]
    async fn unknown_commit_falls_back_to_workspace_walk() {
        let dir = make_git_repo();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        std::fs::write(dir.path().join("pkg/mod.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("top.py"), "y = 2\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();
        run_git_blocking(dir.path(), &["add", "."]);
        run_git_blocking(dir.path(), &["commit", "-m", "initial"]);

        let detector = ChangeDetector::new("py", 30);
        let changes = detector
            .detect(&workspace(&dir), "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef")
            .await;

        assert_eq!(changes.origin, ChangeSetOrigin::WorkspaceWalk);
        assert_eq!(
            changes.files,
            vec![PathBuf::from("pkg/mod.py"), PathBuf::from("top.py")]
        );
    }

    #[tokio::test]
    async fn detector_never_fails_outside_a_repository() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("loose.py"), "x = 1\n").unwrap();

        let detector = ChangeDetector::new("py", 30);
        let changes = detector
            .detect(
                &Workspace {
                    path: dir.path().to_path_buf(),
                    repo_url: "file:///nowhere".to_string(),
                    branch: "main".to_string(),
                },
                "abc",
            )
            .await;

        assert_eq!(changes.origin, ChangeSetOrigin::WorkspaceWalk);
        assert_eq!(changes.files, vec![PathBuf::from("loose.py")]);
    }
}
