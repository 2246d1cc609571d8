//! Scripted changelog backend (testing only)
//!
//! Replies to each `changelog` call with the next scripted response and
//! records every query it saw. Once the script runs out it answers with an
//! empty changelog.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::backend::ChangelogBackend;
use crate::changeset::ChangelogQuery;
use crate::error::GitError;
use crate::Result;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Render one raw-format changelog entry.
pub fn raw_entry(revision: &str, author: &str, email: &str, summary: &str) -> String {
    format!(
        "commit {revision}\n\
         tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
         author {author} <{email}> 1479340800 +1100\n\
         committer {author} <{email}> 1479340800 +1100\n\
         \n    {summary}\n"
    )
}

#[derive(Debug, Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String>>>,
    queries: Mutex<Vec<ChangelogQuery>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful changelog text.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        locked(&self.responses).push_back(Ok(text.into()));
        self
    }

    /// Queue a single changeset rendered in raw format.
    pub fn then_commit(self, revision: &str, author: &str, email: &str) -> Self {
        self.then_text(raw_entry(revision, author, email, "Initial commit"))
    }

    /// Queue a failure.
    pub fn then_error(self, error: GitError) -> Self {
        locked(&self.responses).push_back(Err(error));
        self
    }

    /// Queue a missing-object failure for `revision`.
    pub fn then_missing_object(self, revision: &str) -> Self {
        self.then_error(GitError::MissingObject {
            revision: revision.to_string(),
            detail: format!("fatal: bad object {revision}"),
        })
    }

    pub fn calls(&self) -> usize {
        locked(&self.queries).len()
    }

    pub fn queries(&self) -> Vec<ChangelogQuery> {
        locked(&self.queries).clone()
    }
}

#[async_trait]
impl ChangelogBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn changelog(&self, query: &ChangelogQuery) -> Result<String> {
        locked(&self.queries).push(query.clone());
        locked(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}
