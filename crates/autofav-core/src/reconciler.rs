//! Checkout-to-favorite orchestration.

use std::sync::Arc;

use autofav_git::{select_backend, ChangelogBackend, ChangelogParser, RawChangelogParser};
use autofav_state::{AccountDirectory, AccountId, FavoriteStore};
use tracing::{debug, Instrument};

use crate::changeset::ChangesetResolver;
use crate::config::{AutofavConfig, SettingsProvider};
use crate::domain::{CheckoutEvent, Interrupted};
use crate::favorites::{FavoriteOutcome, FavoriteStateMachine};
use crate::gate::{GateDecision, SkipReason, TriggerGate};
use crate::identity::{policy_for, IdentityPolicy};
use crate::metrics::METRICS;
use crate::obs::{self, ReconcileSpan};
use crate::retry::{Backoff, RetryPolicy, TokioBackoff};

/// How a checkout event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The trigger gate turned the event away
    Skipped(SkipReason),
    /// No single changeset could be read for the revision
    NoChangeset,
    /// The commit author matched no account
    UnknownAuthor { author: String },
    Favorite {
        account: AccountId,
        outcome: FavoriteOutcome,
    },
}

/// Entry point for checkout notifications.
pub struct Reconciler {
    gate: TriggerGate,
    changesets: ChangesetResolver,
    identity: Arc<dyn IdentityPolicy>,
    directory: Arc<dyn AccountDirectory>,
    favorites: FavoriteStateMachine,
}

impl Reconciler {
    /// Wire a reconciler around an explicit changelog backend.
    pub fn new(
        config: &AutofavConfig,
        settings: Arc<dyn SettingsProvider>,
        backend: Arc<dyn ChangelogBackend>,
        directory: Arc<dyn AccountDirectory>,
        store: Arc<dyn FavoriteStore>,
    ) -> Self {
        let changesets = ChangesetResolver::new(
            backend,
            Arc::new(RawChangelogParser),
            Arc::new(TokioBackoff::new()),
            RetryPolicy::once(config.retry_backoff()),
            config.missing_object_policy,
        );
        Self {
            gate: TriggerGate::new(settings.clone()),
            changesets,
            identity: policy_for(config.identity_policy),
            directory,
            favorites: FavoriteStateMachine::new(store, settings),
        }
    }

    /// Default wiring: the changelog backend is picked from `config`.
    pub fn from_config(
        config: &AutofavConfig,
        settings: Arc<dyn SettingsProvider>,
        directory: Arc<dyn AccountDirectory>,
        store: Arc<dyn FavoriteStore>,
    ) -> Self {
        let backend = select_backend(config.prefer_native_git, &config.git_binary);
        Self::new(config, settings, backend, directory, store)
    }

    /// Replace the backoff, e.g. with a cancellable [`TokioBackoff`].
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.changesets.set_backoff(backoff);
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ChangelogParser>) -> Self {
        self.changesets.set_parser(parser);
        self
    }

    pub fn with_identity_policy(mut self, policy: Arc<dyn IdentityPolicy>) -> Self {
        self.identity = policy;
        self
    }

    /// Label of the changelog backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.changesets.backend_name()
    }

    /// Handle one completed checkout.
    ///
    /// Everything short of an interrupted retry wait is logged and folded
    /// into the returned outcome.
    pub async fn on_checkout(&self, event: &CheckoutEvent) -> Result<ReconcileOutcome, Interrupted> {
        METRICS.inc_events_seen();
        let span = ReconcileSpan::new(&event.job.full_name, event.build_number);
        self.reconcile(event).instrument(span.span()).await
    }

    async fn reconcile(&self, event: &CheckoutEvent) -> Result<ReconcileOutcome, Interrupted> {
        let job_name = event.job.full_name.as_str();
        let revision = match self.gate.evaluate(event) {
            GateDecision::Proceed { revision } => revision,
            GateDecision::Skip(reason) => {
                obs::emit_reconcile_skipped(job_name, event.build_number, &reason);
                return Ok(ReconcileOutcome::Skipped(reason));
            }
        };

        METRICS.inc_reconciliations();
        obs::emit_reconcile_started(job_name, event.build_number, &revision);

        let Some(changeset) = self.changesets.resolve(&event.workspace, &revision).await? else {
            return Ok(ReconcileOutcome::NoChangeset);
        };

        let identity = self
            .identity
            .resolve(self.directory.as_ref(), &changeset)
            .await;
        let Some(account) = identity.account().map(|a| a.id.clone()) else {
            debug!(
                author = %changeset.author,
                policy = self.identity.name(),
                "commit author has no account; nothing to favorite"
            );
            return Ok(ReconcileOutcome::UnknownAuthor {
                author: changeset.author,
            });
        };

        let outcome = self
            .favorites
            .reconcile(&identity, &event.job.job_ref())
            .await;
        Ok(ReconcileOutcome::Favorite { account, outcome })
    }
}
