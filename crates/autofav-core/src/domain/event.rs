//! Checkout notifications and the job they belong to.

use std::fmt;
use std::path::PathBuf;

use autofav_state::JobRef;
use serde::{Deserialize, Serialize};

/// Where a job sits in the host's job tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobParent {
    /// Branch child of a multi-branch project
    MultiBranch { name: String },
    /// Plain folder
    Folder { name: String },
    /// Top level
    Root,
}

/// What kind of run produced the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Pipeline,
    Freestyle,
}

/// Version control system that performed the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScmKind {
    Git,
    Other(String),
}

impl fmt::Display for ScmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScmKind::Git => f.write_str("git"),
            ScmKind::Other(name) => f.write_str(name),
        }
    }
}

/// Identifies the job a checkout ran for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub full_name: String,
    pub parent: JobParent,
    pub run_kind: RunKind,
}

impl JobHandle {
    /// Pipeline job for `branch` inside the multi-branch project `project`.
    pub fn branch(project: &str, branch: &str) -> Self {
        Self {
            full_name: format!("{project}/{branch}"),
            parent: JobParent::MultiBranch {
                name: project.to_string(),
            },
            run_kind: RunKind::Pipeline,
        }
    }

    pub fn new(full_name: impl Into<String>, parent: JobParent, run_kind: RunKind) -> Self {
        Self {
            full_name: full_name.into(),
            parent,
            run_kind,
        }
    }

    pub fn is_branch_job(&self) -> bool {
        matches!(self.parent, JobParent::MultiBranch { .. })
    }

    pub fn job_ref(&self) -> JobRef {
        JobRef::new(self.full_name.clone())
    }
}

/// A completed checkout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutEvent {
    pub job: JobHandle,
    /// 1 for the first build of the job
    pub build_number: u64,
    pub scm: ScmKind,
    pub workspace: PathBuf,
    /// Revision recorded as built by this checkout, if the SCM recorded one
    pub last_built_revision: Option<String>,
}

impl CheckoutEvent {
    pub fn new(job: JobHandle, build_number: u64, scm: ScmKind, workspace: impl Into<PathBuf>) -> Self {
        Self {
            job,
            build_number,
            scm,
            workspace: workspace.into(),
            last_built_revision: None,
        }
    }

    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.last_built_revision = Some(revision.into());
        self
    }
}
