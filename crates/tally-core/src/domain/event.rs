//! Inbound webhook payloads and run-coordinate extraction.
//!
//! Two payload shapes are recognized. A push event carries the clone URL,
//! ref, and head commit directly; a check_suite event names the head commit
//! and branch and the clone URL has to be recovered from the originating
//! pull request. Field presence decides the variant: `check_suite` wins,
//! then `repository` + `ref` + `after`.

use serde::Deserialize;

use crate::domain::error::EventError;

/// Deserialized webhook body. All fields are optional so that any JSON
/// object deserializes; classification happens in [`WebhookEvent::coordinates`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub repository: Option<RepositoryInfo>,

    #[serde(default, rename = "ref")]
    pub git_ref: Option<String>,

    #[serde(default)]
    pub after: Option<String>,

    #[serde(default)]
    pub head_commit: Option<CommitInfo>,

    #[serde(default)]
    pub check_suite: Option<CheckSuiteInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryInfo {
    pub clone_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitInfo {
    #[serde(default)]
    pub author: Option<AuthorInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorInfo {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckSuiteInfo {
    #[serde(default)]
    pub head_sha: Option<String>,

    #[serde(default)]
    pub head_branch: Option<String>,

    #[serde(default)]
    pub pull_requests: Vec<PullRequestInfo>,

    // Not present on every forge payload; author resolution is best-effort.
    #[serde(default)]
    pub head_commit: Option<CommitInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestInfo {
    pub head: PullRequestHead,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestHead {
    pub repo: PullRequestRepo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRepo {
    pub clone_url: String,
}

/// The (repo URL, branch, commit) triple one pipeline run operates on,
/// plus the best-effort author address used for the report cc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCoordinates {
    pub repo_url: String,
    pub branch: String,
    pub commit: String,
    pub author_email: Option<String>,
}

impl RunCoordinates {
    /// Repository name derived from the clone URL.
    pub fn repo_name(&self) -> String {
        repo_name_from_url(&self.repo_url)
    }
}

/// Last path segment of a clone URL, with any `.git` suffix stripped.
pub fn repo_name_from_url(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .trim_end_matches(".git")
        .to_string()
}

impl WebhookEvent {
    /// Classify the payload and extract run coordinates.
    ///
    /// A usable event always yields a non-empty (repo URL, branch, commit)
    /// triple; anything else is rejected here, before any other component
    /// is contacted.
    pub fn coordinates(&self) -> Result<RunCoordinates, EventError> {
        if let Some(suite) = &self.check_suite {
            return Self::from_check_suite(suite);
        }

        if let (Some(repository), Some(git_ref), Some(after)) =
            (&self.repository, &self.git_ref, &self.after)
        {
            return self.from_push(repository, git_ref, after);
        }

        Err(EventError::UnrecognizedShape)
    }

    fn from_check_suite(suite: &CheckSuiteInfo) -> Result<RunCoordinates, EventError> {
        let commit = non_empty(suite.head_sha.as_deref()).ok_or(EventError::MissingField {
            kind: "check_suite",
            field: "head_sha",
        })?;
        let branch = non_empty(suite.head_branch.as_deref()).ok_or(EventError::MissingField {
            kind: "check_suite",
            field: "head_branch",
        })?;
        let repo_url = suite
            .pull_requests
            .first()
            .map(|pr| pr.head.repo.clone_url.as_str())
            .and_then(|url| non_empty(Some(url)))
            .ok_or(EventError::MissingField {
                kind: "check_suite",
                field: "pull_requests[0].head.repo.clone_url",
            })?;

        Ok(RunCoordinates {
            repo_url,
            branch,
            commit,
            author_email: author_email_of(suite.head_commit.as_ref()),
        })
    }

    fn from_push(
        &self,
        repository: &RepositoryInfo,
        git_ref: &str,
        after: &str,
    ) -> Result<RunCoordinates, EventError> {
        let repo_url = non_empty(Some(&repository.clone_url)).ok_or(EventError::MissingField {
            kind: "push",
            field: "repository.clone_url",
        })?;
        let commit = non_empty(Some(after)).ok_or(EventError::MissingField {
            kind: "push",
            field: "after",
        })?;

        // "refs/heads/feature/x" keeps only the final segment, matching the
        // working-copy branch name the synchronizer checks out.
        let branch = git_ref
            .rsplit('/')
            .next()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| EventError::BadRef(git_ref.to_string()))?
            .to_string();

        Ok(RunCoordinates {
            repo_url,
            branch,
            commit,
            author_email: author_email_of(self.head_commit.as_ref()),
        })
    }
}

fn author_email_of(commit: Option<&CommitInfo>) -> Option<String> {
    commit
        .and_then(|c| c.author.as_ref())
        .and_then(|a| a.email.as_deref())
        .and_then(|e| non_empty(Some(e)))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> WebhookEvent {
        serde_json::from_str(json).expect("payload should deserialize")
    }

    #[test]
    fn push_event_yields_full_coordinates() {
        let event = parse(
            r#"{
                "repository": {"clone_url": "https://example.com/org/widget.git"},
                "ref": "refs/heads/main",
                "after": "0123456789abcdef",
                "head_commit": {"author": {"email": "dev@example.com"}}
            }"#,
        );

        let coords = event.coordinates().expect("push should classify");
        assert_eq!(coords.repo_url, "https://example.com/org/widget.git");
        assert_eq!(coords.branch, "main");
        assert_eq!(coords.commit, "0123456789abcdef");
        assert_eq!(coords.author_email.as_deref(), Some("dev@example.com"));
        assert_eq!(coords.repo_name(), "widget");
    }

    #[test]
    fn push_event_without_author_is_still_usable() {
        let event = parse(
            r#"{
                "repository": {"clone_url": "https://example.com/org/widget.git"},
                "ref": "refs/heads/release/1.2",
                "after": "abc"
            }"#,
        );

        let coords = event.coordinates().unwrap();
        assert_eq!(coords.branch, "1.2");
        assert!(coords.author_email.is_none());
    }

    #[test]
    fn check_suite_event_recovers_url_from_pull_request() {
        let event = parse(
            r#"{
                "check_suite": {
                    "head_sha": "feedface",
                    "head_branch": "topic",
                    "pull_requests": [
                        {"head": {"repo": {"clone_url": "https://example.com/org/widget.git"}}}
                    ]
                }
            }"#,
        );

        let coords = event.coordinates().expect("check_suite should classify");
        assert_eq!(coords.commit, "feedface");
        assert_eq!(coords.branch, "topic");
        assert_eq!(coords.repo_url, "https://example.com/org/widget.git");
        assert!(coords.author_email.is_none());
    }

    #[test]
    fn check_suite_without_pull_requests_is_rejected() {
        let event = parse(
            r#"{"check_suite": {"head_sha": "feedface", "head_branch": "topic", "pull_requests": []}}"#,
        );

        let err = event.coordinates().unwrap_err();
        assert!(matches!(err, EventError::MissingField { .. }));
    }

    #[test]
    fn unrecognized_payload_is_rejected() {
        let event = parse(r#"{"zen": "Keep it logically awesome."}"#);
        assert!(matches!(
            event.coordinates(),
            Err(EventError::UnrecognizedShape)
        ));
    }

    #[test]
    fn empty_fields_count_as_missing() {
        let event = parse(
            r#"{
                "repository": {"clone_url": "   "},
                "ref": "refs/heads/main",
                "after": "abc"
            }"#,
        );
        assert!(event.coordinates().is_err());
    }

    #[test]
    fn repo_name_strips_git_suffix_and_trailing_slash() {
        assert_eq!(
            repo_name_from_url("https://example.com/org/widget.git"),
            "widget"
        );
        assert_eq!(repo_name_from_url("https://example.com/org/widget/"), "widget");
        assert_eq!(repo_name_from_url("widget"), "widget");
    }
}
