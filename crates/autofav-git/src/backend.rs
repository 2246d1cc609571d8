//! Changelog backend contract and backend selection.

use std::process::Command;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::changeset::ChangelogQuery;
use crate::cli::CliGitBackend;
use crate::embedded::EmbeddedGitBackend;
use crate::Result;

/// Source of changelog text for a workspace.
///
/// Implementations return raw log text (see [`crate::RawChangelogParser`])
/// and report object-store inconsistency as `GitError::MissingObject` so
/// callers can retry it.
#[async_trait]
pub trait ChangelogBackend: Send + Sync {
    /// Short label for logs ("cli", "embedded", ...)
    fn name(&self) -> &'static str;

    async fn changelog(&self, query: &ChangelogQuery) -> Result<String>;
}

static FALLBACK_ADVISORY: Once = Once::new();

/// Check whether `git_binary` can be executed.
pub fn is_git_available(git_binary: &str) -> bool {
    Command::new(git_binary)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Pick the changelog backend for this process.
///
/// With `prefer_native` the `git` executable is used when it runs; otherwise,
/// or when it is missing, the embedded backend is returned. Falling back from
/// a preferred native client logs a warning once per process.
pub fn select_backend(prefer_native: bool, git_binary: &str) -> Arc<dyn ChangelogBackend> {
    if prefer_native {
        if is_git_available(git_binary) {
            info!(git_binary = %git_binary, "using native git changelog backend");
            return Arc::new(CliGitBackend::new(git_binary));
        }
        FALLBACK_ADVISORY.call_once(|| {
            warn!(
                git_binary = %git_binary,
                "native git is unavailable; falling back to the slower embedded implementation"
            );
        });
    }
    Arc::new(EmbeddedGitBackend::new())
}
