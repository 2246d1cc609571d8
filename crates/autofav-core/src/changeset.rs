//! Changeset resolution: the single commit behind a first build.

use std::path::Path;
use std::sync::Arc;

use autofav_git::{ChangelogBackend, ChangelogParser, ChangelogQuery, Changeset, GitError};
use tracing::{debug, error, warn};

use crate::config::MissingObjectPolicy;
use crate::domain::Interrupted;
use crate::metrics::METRICS;
use crate::obs;
use crate::retry::{retry_with, Backoff, RetryError, RetryPolicy};

/// Reads and parses the changelog entry for one revision.
///
/// Failures are logged and reported as "no changeset"; the only error that
/// escapes is an [`Interrupted`] backoff wait.
pub struct ChangesetResolver {
    backend: Arc<dyn ChangelogBackend>,
    parser: Arc<dyn ChangelogParser>,
    backoff: Arc<dyn Backoff>,
    policy: RetryPolicy,
    missing_object: MissingObjectPolicy,
}

impl ChangesetResolver {
    pub fn new(
        backend: Arc<dyn ChangelogBackend>,
        parser: Arc<dyn ChangelogParser>,
        backoff: Arc<dyn Backoff>,
        policy: RetryPolicy,
        missing_object: MissingObjectPolicy,
    ) -> Self {
        Self {
            backend,
            parser,
            backoff,
            policy,
            missing_object,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub(crate) fn set_parser(&mut self, parser: Arc<dyn ChangelogParser>) {
        self.parser = parser;
    }

    pub(crate) fn set_backoff(&mut self, backoff: Arc<dyn Backoff>) {
        self.backoff = backoff;
    }

    pub async fn resolve(
        &self,
        workspace: &Path,
        revision: &str,
    ) -> Result<Option<Changeset>, Interrupted> {
        let query = ChangelogQuery::single(workspace, revision);
        let backend = self.backend.as_ref();
        let query_ref = &query;
        let delay_ms = self.policy.backoff.as_millis() as u64;

        let outcome = retry_with(
            self.policy,
            self.backoff.as_ref(),
            |e: &GitError| self.missing_object.is_retryable(e),
            move |attempt| async move {
                if attempt > 1 {
                    METRICS.inc_changeset_retries();
                    obs::emit_changeset_retry(&query_ref.revision, attempt, delay_ms);
                }
                backend.changelog(query_ref).await
            },
        )
        .await;

        let text = match outcome {
            Ok(text) => text,
            Err(RetryError::Interrupted) => return Err(Interrupted),
            Err(RetryError::Exhausted { attempts, last }) => {
                METRICS.inc_failures();
                warn!(
                    revision = %revision,
                    attempts,
                    error = %last,
                    "revision still not readable after retry; skipping"
                );
                return Ok(None);
            }
            Err(RetryError::Fatal(e)) => {
                METRICS.inc_failures();
                error!(
                    revision = %revision,
                    backend = self.backend.name(),
                    error = %e,
                    "failed to read changelog"
                );
                return Ok(None);
            }
        };

        let mut changesets = match self.parser.parse(&text) {
            Ok(changesets) => changesets,
            Err(e) => {
                METRICS.inc_failures();
                error!(revision = %revision, error = %e, "failed to parse changelog");
                return Ok(None);
            }
        };

        match changesets.len() {
            0 => {
                debug!(revision = %revision, "changelog is empty");
                Ok(None)
            }
            1 => Ok(changesets.pop()),
            n => {
                METRICS.inc_failures();
                error!(
                    revision = %revision,
                    entries = n,
                    "expected a single changelog entry"
                );
                Ok(None)
            }
        }
    }
}
