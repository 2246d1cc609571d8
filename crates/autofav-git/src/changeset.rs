//! Changelog query and the changeset it yields.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::GitError;
use crate::Result;

/// One historical commit, reduced to what authorship reconciliation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    /// Full commit id
    pub revision: String,
    /// Author name as recorded in the commit
    pub author: String,
    /// Author email as recorded in the commit, if any
    pub author_email: Option<String>,
    /// First non-empty line of the commit message
    pub summary: String,
}

/// A request for the history entries that produced `revision`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangelogQuery {
    pub workspace: PathBuf,
    pub revision: String,
    pub limit: usize,
}

impl ChangelogQuery {
    /// The single entry that produced `revision`.
    pub fn single(workspace: impl Into<PathBuf>, revision: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            revision: revision.into(),
            limit: 1,
        }
    }

    /// Reject revisions git would read as options or that are empty.
    pub fn validate(&self) -> Result<()> {
        let rev = self.revision.trim();
        if rev.is_empty() || rev.starts_with('-') || rev.chars().any(char::is_whitespace) {
            return Err(GitError::InvalidRevision(self.revision.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_limits_to_one() {
        let query = ChangelogQuery::single("/tmp/ws", "abc123");
        assert_eq!(query.limit, 1);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn option_like_revision_rejected() {
        for rev in ["", "  ", "--all", "-n", "abc 123"] {
            let query = ChangelogQuery::single("/tmp/ws", rev);
            assert!(
                matches!(query.validate(), Err(GitError::InvalidRevision(_))),
                "{rev:?} should be rejected"
            );
        }
    }
}
