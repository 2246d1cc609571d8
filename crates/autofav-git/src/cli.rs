//! Native backend: shells out to the `git` executable.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::backend::ChangelogBackend;
use crate::changeset::ChangelogQuery;
use crate::error::GitError;
use crate::Result;

/// Runs `git log --format=raw` in the workspace.
#[derive(Debug, Clone)]
pub struct CliGitBackend {
    git_binary: String,
}

impl CliGitBackend {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    pub fn git_binary(&self) -> &str {
        &self.git_binary
    }
}

impl Default for CliGitBackend {
    fn default() -> Self {
        Self::new("git")
    }
}

#[async_trait]
impl ChangelogBackend for CliGitBackend {
    fn name(&self) -> &'static str {
        "cli"
    }

    async fn changelog(&self, query: &ChangelogQuery) -> Result<String> {
        query.validate()?;
        // spawning in a vanished directory fails with NotFound, same as a missing binary
        if !query.workspace.is_dir() {
            return Err(GitError::NotARepository(query.workspace.clone()));
        }
        let limit = query.limit.to_string();

        debug!(
            workspace = %query.workspace.display(),
            revision = %query.revision,
            limit = query.limit,
            "running git log"
        );

        let output = Command::new(&self.git_binary)
            .args([
                "log",
                "--no-abbrev",
                "--no-color",
                "--format=raw",
                "-n",
                limit.as_str(),
                query.revision.as_str(),
                "--",
            ])
            .current_dir(&query.workspace)
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GitError::GitUnavailable(format!(
                    "failed to run {}: {e}",
                    self.git_binary
                )),
                _ => GitError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::from_stderr(query, output.status.code(), &stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
