//! Structured events for the reconciliation lifecycle.
//!
//! Every event carries an `event` field naming it, so JSON log pipelines can
//! filter on it without parsing messages.

use std::fmt::Display;

use tracing::{error, info, trace, Span};
use uuid::Uuid;

/// Span that tags everything logged for one checkout event.
///
/// Sync code can [`enter`](Self::enter) it; async code instruments its
/// future with [`span`](Self::span).
pub struct ReconcileSpan {
    event_id: Uuid,
    span: Span,
}

impl ReconcileSpan {
    /// New span with a fresh correlation id.
    pub fn new(job: &str, build: u64) -> Self {
        let event_id = Uuid::new_v4();
        let span = tracing::info_span!("autofav.reconcile", event_id = %event_id, job = %job, build);
        Self { event_id, span }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn span(&self) -> Span {
        self.span.clone()
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

pub fn emit_reconcile_started(job: &str, build: u64, revision: &str) {
    info!(event = "reconcile.started", job = %job, build, revision = %revision);
}

/// Gate rejections are routine, so they stay at trace level.
pub fn emit_reconcile_skipped(job: &str, build: u64, reason: &dyn Display) {
    trace!(event = "reconcile.skipped", job = %job, build, reason = %reason);
}

pub fn emit_changeset_retry(revision: &str, attempt: u32, delay_ms: u64) {
    info!(event = "changeset.retry", revision = %revision, attempt, delay_ms);
}

pub fn emit_favorite_added(job: &str, account: &str) {
    info!(
        event = "favorite.added",
        job = %job,
        account = %account,
        "automatically favorited {job} for {account}"
    );
}

pub fn emit_favorite_failed(job: &str, account: &str, error: &dyn Display) {
    error!(event = "favorite.failed", job = %job, account = %account, error = %error);
}
