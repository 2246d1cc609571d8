//! Embedded backend: reads the object store in-process through libgit2.
//!
//! Slower to set up than the native client for large repositories but needs
//! no executable on `PATH`. Output is rendered in the same raw log format the
//! native backend produces, so the same parser reads both.

use std::fmt::Write as _;

use async_trait::async_trait;
use git2::{Commit, ErrorClass, ErrorCode, Repository, Signature, Sort};
use tracing::debug;

use crate::backend::ChangelogBackend;
use crate::changeset::ChangelogQuery;
use crate::error::GitError;
use crate::Result;

/// libgit2-backed changelog reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedGitBackend;

impl EmbeddedGitBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChangelogBackend for EmbeddedGitBackend {
    fn name(&self) -> &'static str {
        "embedded"
    }

    async fn changelog(&self, query: &ChangelogQuery) -> Result<String> {
        query.validate()?;
        let query = query.clone();
        tokio::task::spawn_blocking(move || read_changelog(&query))
            .await
            .map_err(|e| GitError::Embedded(format!("changelog task failed: {e}")))?
    }
}

fn read_changelog(query: &ChangelogQuery) -> Result<String> {
    debug!(
        workspace = %query.workspace.display(),
        revision = %query.revision,
        limit = query.limit,
        "reading changelog in-process"
    );

    if !query.workspace.is_dir() {
        return Err(GitError::NotARepository(query.workspace.clone()));
    }
    let repo = Repository::discover(&query.workspace).map_err(|e| {
        if e.code() == ErrorCode::NotFound {
            GitError::NotARepository(query.workspace.clone())
        } else {
            GitError::Embedded(e.message().to_string())
        }
    })?;

    let to_git_error = |e: git2::Error| classify(query, e);

    let commit = repo
        .revparse_single(&query.revision)
        .and_then(|object| object.peel_to_commit())
        .map_err(to_git_error)?;

    let mut walk = repo.revwalk().map_err(to_git_error)?;
    walk.set_sorting(Sort::TIME).map_err(to_git_error)?;
    walk.push(commit.id()).map_err(to_git_error)?;

    let mut text = String::new();
    for (index, oid) in walk.take(query.limit).enumerate() {
        let oid = oid.map_err(to_git_error)?;
        let commit = repo.find_commit(oid).map_err(to_git_error)?;
        if index > 0 {
            text.push('\n');
        }
        render_raw(&mut text, &commit);
    }
    Ok(text)
}

fn classify(query: &ChangelogQuery, e: git2::Error) -> GitError {
    let detail = e.message().to_string();
    match (e.code(), e.class()) {
        (ErrorCode::NotFound, _) => GitError::MissingObject {
            revision: query.revision.clone(),
            detail,
        },
        (_, ErrorClass::Odb | ErrorClass::Zlib | ErrorClass::Object) => GitError::ObjectUnreadable {
            revision: query.revision.clone(),
            detail,
        },
        _ => GitError::Embedded(detail),
    }
}

fn render_signature(text: &mut String, label: &str, sig: &Signature<'_>) {
    let when = sig.when();
    let offset = when.offset_minutes();
    let sign = if offset < 0 { '-' } else { '+' };
    let offset = offset.abs();
    let _ = writeln!(
        text,
        "{label} {} <{}> {} {sign}{:02}{:02}",
        String::from_utf8_lossy(sig.name_bytes()),
        String::from_utf8_lossy(sig.email_bytes()),
        when.seconds(),
        offset / 60,
        offset % 60,
    );
}

fn render_raw(text: &mut String, commit: &Commit<'_>) {
    let _ = writeln!(text, "commit {}", commit.id());
    let _ = writeln!(text, "tree {}", commit.tree_id());
    for parent in commit.parent_ids() {
        let _ = writeln!(text, "parent {parent}");
    }
    render_signature(text, "author", &commit.author());
    render_signature(text, "committer", &commit.committer());
    text.push('\n');

    let message = String::from_utf8_lossy(commit.message_bytes());
    for line in message.trim_end().lines() {
        let _ = writeln!(text, "    {line}");
    }
}
