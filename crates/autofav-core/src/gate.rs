//! Trigger gate: decides whether a checkout is a first build worth reconciling.
//!
//! Checks run cheapest first. The kill switch and the recorded revision need
//! no I/O; the workspace check touches the filesystem and runs last.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::SettingsProvider;
use crate::domain::{CheckoutEvent, RunKind, ScmKind};

/// Why a checkout was not reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Autofavorite is switched off process-wide
    Disabled,
    /// The SCM recorded no built revision
    NoRevision,
    NotBranchJob,
    NotPipelineRun,
    NotFirstBuild { build_number: u64 },
    UnsupportedScm(ScmKind),
    WorkspaceNotDirectory(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("autofavorite disabled"),
            SkipReason::NoRevision => f.write_str("no last built revision"),
            SkipReason::NotBranchJob => f.write_str("job is not a multi-branch child"),
            SkipReason::NotPipelineRun => f.write_str("run is not a pipeline run"),
            SkipReason::NotFirstBuild { build_number } => {
                write!(f, "build #{build_number} is not the first build")
            }
            SkipReason::UnsupportedScm(scm) => write!(f, "unsupported scm {scm}"),
            SkipReason::WorkspaceNotDirectory(path) => {
                write!(f, "workspace {} is not a directory", path.display())
            }
        }
    }
}

/// Outcome of [`TriggerGate::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Reconcile the commit behind `revision`
    Proceed { revision: String },
    Skip(SkipReason),
}

impl GateDecision {
    pub fn is_proceed(&self) -> bool {
        matches!(self, GateDecision::Proceed { .. })
    }
}

pub struct TriggerGate {
    settings: Arc<dyn SettingsProvider>,
}

impl TriggerGate {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self { settings }
    }

    pub fn evaluate(&self, event: &CheckoutEvent) -> GateDecision {
        if !self.settings.autofavorite_enabled() {
            return GateDecision::Skip(SkipReason::Disabled);
        }
        let Some(revision) = event.last_built_revision.as_deref().filter(|r| !r.is_empty()) else {
            return GateDecision::Skip(SkipReason::NoRevision);
        };

        if !event.job.is_branch_job() {
            return GateDecision::Skip(SkipReason::NotBranchJob);
        }
        if event.job.run_kind != RunKind::Pipeline {
            return GateDecision::Skip(SkipReason::NotPipelineRun);
        }
        if event.build_number != 1 {
            return GateDecision::Skip(SkipReason::NotFirstBuild {
                build_number: event.build_number,
            });
        }
        if event.scm != ScmKind::Git {
            return GateDecision::Skip(SkipReason::UnsupportedScm(event.scm.clone()));
        }
        if !event.workspace.is_dir() {
            return GateDecision::Skip(SkipReason::WorkspaceNotDirectory(event.workspace.clone()));
        }

        GateDecision::Proceed {
            revision: revision.to_string(),
        }
    }

    pub fn should_reconcile(&self, event: &CheckoutEvent) -> bool {
        self.evaluate(event).is_proceed()
    }
}
