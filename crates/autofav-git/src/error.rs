//! Error types for autofav-git

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::changeset::ChangelogQuery;

/// Errors that can occur while reading a changelog
#[derive(Error, Debug)]
pub enum GitError {
    /// The object behind the revision is not (yet) in the object store
    #[error("missing object for revision {revision}: {detail}")]
    MissingObject { revision: String, detail: String },

    /// The object exists but could not be read back
    #[error("unreadable object for revision {revision}: {detail}")]
    ObjectUnreadable { revision: String, detail: String },

    /// The workspace is not inside a git work tree
    #[error("not a git repository: {0}")]
    NotARepository(PathBuf),

    /// The git executable could not be started
    #[error("git is not installed or not in PATH: {0}")]
    GitUnavailable(String),

    /// The revision cannot be passed to git safely
    #[error("invalid revision: {0:?}")]
    InvalidRevision(String),

    /// Git ran and failed for a reason not classified above
    #[error("git command failed (status {status:?}): {stderr}")]
    CommandFailed { status: Option<i32>, stderr: String },

    /// Changelog text did not match the raw log format
    #[error("malformed changelog: {0}")]
    Malformed(String),

    /// Failure inside the embedded git implementation
    #[error("embedded git error: {0}")]
    Embedded(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitError {
    /// The object store does not have the object yet.
    pub fn is_missing_object(&self) -> bool {
        matches!(self, GitError::MissingObject { .. })
    }

    /// The object store has the object but reading it failed.
    pub fn is_unreadable_object(&self) -> bool {
        matches!(self, GitError::ObjectUnreadable { .. })
    }

    /// Classify the stderr of a failed `git log` run for `query`.
    pub fn from_stderr(query: &ChangelogQuery, status: Option<i32>, stderr: &str) -> Self {
        let detail = stderr.trim().to_string();
        let revision = query.revision.as_str();
        let patterns = patterns();

        if patterns.not_a_repository.is_match(stderr) {
            return GitError::NotARepository(query.workspace.clone());
        }
        if patterns.unreadable.is_match(stderr) {
            return GitError::ObjectUnreadable {
                revision: revision.to_string(),
                detail,
            };
        }
        if patterns.missing.is_match(stderr) {
            return GitError::MissingObject {
                revision: revision.to_string(),
                detail,
            };
        }
        GitError::CommandFailed {
            status,
            stderr: detail,
        }
    }
}

struct StderrPatterns {
    missing: Regex,
    unreadable: Regex,
    not_a_repository: Regex,
}

fn patterns() -> &'static StderrPatterns {
    static PATTERNS: OnceLock<StderrPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| StderrPatterns {
        missing: Regex::new(
            r"(?i)(bad object|missing object|unknown revision|bad revision|not a valid object name)",
        )
        .expect("static pattern"),
        unreadable: Regex::new(
            r"(?i)(unable to read|could not read|is corrupt|unable to unpack|cannot be accessed|inflate:)",
        )
        .expect("static pattern"),
        not_a_repository: Regex::new(r"(?i)not a git repository").expect("static pattern"),
    })
}
