//! autofav-git: single-changeset changelog reads for autofav
//!
//! Fetches the one commit that produced a revision, from either the native
//! `git` executable or an embedded libgit2 reader, and parses it into a
//! [`Changeset`].
//!
//! ## Layer 1 - Version control
//!
//! Focus: identical structured output from both backends, and a precise
//! error taxonomy so callers can tell a not-yet-visible object apart from a
//! real failure.

pub mod backend;
pub mod changeset;
pub mod cli;
pub mod embedded;
pub mod error;
pub mod fakes;
pub mod parser;

pub use backend::{is_git_available, select_backend, ChangelogBackend};
pub use changeset::{ChangelogQuery, Changeset};
pub use cli::CliGitBackend;
pub use embedded::EmbeddedGitBackend;
pub use error::GitError;
pub use parser::{ChangelogParser, RawChangelogParser};

/// Result type for autofav-git operations
pub type Result<T> = std::result::Result<T, GitError>;

