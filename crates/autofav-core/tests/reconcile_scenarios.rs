//! Reconciliation scenarios driven through `Reconciler::on_checkout`.
//!
//! The changelog backend is scripted and the directory and favorite store
//! are the in-memory fakes, so every side effect can be counted.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autofav_core::{
    Account, AccountId, AutofavConfig, Backoff, CheckoutEvent, FavoriteOutcome, FavoriteState,
    GitError, IdentityPolicyKind, Interrupted, JobHandle, JobRef, ReconcileOutcome, Reconciler,
    ScmKind, SkipReason, StaticSettings, TokioBackoff,
};
use autofav_git::fakes::ScriptedBackend;
use autofav_state::fakes::{MemoryAccountDirectory, MemoryFavoriteStore};
use autofav_state::{FavoriteStore, LookupMode};

const REVISION: &str = "abc123";

struct Harness {
    backend: Arc<ScriptedBackend>,
    directory: Arc<MemoryAccountDirectory>,
    store: Arc<MemoryFavoriteStore>,
    settings: Arc<StaticSettings>,
    workspace: tempfile::TempDir,
    reconciler: Reconciler,
}

impl Harness {
    fn new(backend: ScriptedBackend) -> Self {
        Self::with_config(backend, AutofavConfig::default())
    }

    fn with_config(backend: ScriptedBackend, config: AutofavConfig) -> Self {
        let backend = Arc::new(backend);
        let directory = Arc::new(MemoryAccountDirectory::with_accounts([
            Account::new("jdumay").with_email("jdumay@example.com"),
            Account::new("vivek").with_mail_aliases(["vivek@work.example.com"]),
        ]));
        let store = Arc::new(MemoryFavoriteStore::new());
        let settings = Arc::new(StaticSettings::new(true));
        let reconciler = Reconciler::new(
            &config,
            settings.clone(),
            backend.clone(),
            directory.clone(),
            store.clone(),
        );
        Self {
            backend,
            directory,
            store,
            settings,
            workspace: tempfile::tempdir().unwrap(),
            reconciler,
        }
    }

    fn first_build(&self) -> CheckoutEvent {
        CheckoutEvent::new(
            JobHandle::branch("autofav", "feature-x"),
            1,
            ScmKind::Git,
            self.workspace.path(),
        )
        .with_revision(REVISION)
    }

    fn state(&self, account: &str) -> FavoriteState {
        self.store.state(&AccountId::new(account), &job())
    }
}

fn job() -> JobRef {
    JobRef::new("autofav/feature-x")
}

fn favorited(account: &str, outcome: FavoriteOutcome) -> ReconcileOutcome {
    ReconcileOutcome::Favorite {
        account: AccountId::new(account),
        outcome,
    }
}

/// Counts waits and returns immediately.
#[derive(Default)]
struct CountingBackoff {
    waits: AtomicU32,
}

#[async_trait]
impl Backoff for CountingBackoff {
    async fn wait(&self, _delay: Duration) -> Result<(), Interrupted> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[tokio::test]
async fn first_build_favorites_the_author() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, favorited("jdumay", FavoriteOutcome::Added));
    assert_eq!(h.state("jdumay"), FavoriteState::FavoritedAndCurrent);
    let queries = h.backend.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].revision, REVISION);
    assert_eq!(queries[0].limit, 1);
    assert_eq!(queries[0].workspace, h.workspace.path());
}

#[tokio::test]
async fn prior_removal_is_respected() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    let account = AccountId::new("jdumay");
    h.store.add_favorite(&account, &job()).await.unwrap();
    h.store.remove_favorite(&account, &job()).await.unwrap();

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, favorited("jdumay", FavoriteOutcome::RespectedRemoval));
    assert_eq!(h.state("jdumay"), FavoriteState::FavoritedThenRemoved);
    assert_eq!(h.store.add_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_object_is_retried_once_after_backoff() {
    let h = Harness::new(
        ScriptedBackend::new()
            .then_missing_object(REVISION)
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );

    let start = tokio::time::Instant::now();
    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, favorited("jdumay", FavoriteOutcome::Added));
    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(h.backend.calls(), 2);
}

#[tokio::test]
async fn missing_revision_exits_before_any_backend_call() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    let mut event = h.first_build();
    event.last_built_revision = None;

    let outcome = h.reconciler.on_checkout(&event).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::NoRevision));
    assert_eq!(h.backend.calls(), 0);
    assert!(h.directory.lookups().is_empty());
}

// ===========================================================================
// Properties
// ===========================================================================

#[tokio::test]
async fn later_builds_never_reconcile() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    for build_number in [0, 2, 17] {
        let mut event = h.first_build();
        event.build_number = build_number;
        let outcome = h.reconciler.on_checkout(&event).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Skipped(SkipReason::NotFirstBuild { build_number })
        );
    }
    assert_eq!(h.backend.calls(), 0);
    assert_eq!(h.state("jdumay"), FavoriteState::NeverFavorited);
}

#[tokio::test]
async fn global_switch_off_mutates_nothing() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    h.settings.set_enabled(false);

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Disabled));
    assert_eq!(h.backend.calls(), 0);
    assert_eq!(h.store.add_calls(), 0);
}

#[tokio::test]
async fn account_opt_out_mutates_nothing() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    h.directory
        .insert(Account::new("jdumay").with_autofavorite(false));

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, favorited("jdumay", FavoriteOutcome::OptedOut));
    assert_eq!(h.store.add_calls(), 0);
}

#[tokio::test]
async fn current_favorite_is_not_written_again() {
    let h = Harness::new(
        ScriptedBackend::new()
            .then_commit(REVISION, "jdumay", "jdumay@example.com")
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );

    let first = h.reconciler.on_checkout(&h.first_build()).await.unwrap();
    let second = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(first, favorited("jdumay", FavoriteOutcome::Added));
    assert_eq!(second, favorited("jdumay", FavoriteOutcome::AlreadyFavorite));
    assert_eq!(h.store.add_calls(), 1);
}

#[tokio::test]
async fn duplicate_events_converge() {
    let h = Harness::new(
        ScriptedBackend::new()
            .then_commit(REVISION, "jdumay", "jdumay@example.com")
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );
    let event = h.first_build();

    let outcomes = futures::future::join_all([
        h.reconciler.on_checkout(&event),
        h.reconciler.on_checkout(&event),
    ])
    .await;

    let added = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(ReconcileOutcome::Favorite { outcome: FavoriteOutcome::Added, .. })))
        .count();
    assert!(added >= 1);
    assert_eq!(h.store.add_calls(), added);
    assert_eq!(h.state("jdumay"), FavoriteState::FavoritedAndCurrent);
}

#[tokio::test]
async fn two_missing_objects_give_up_after_one_wait() {
    let backoff = Arc::new(CountingBackoff::default());
    let h = Harness::new(
        ScriptedBackend::new()
            .then_missing_object(REVISION)
            .then_missing_object(REVISION)
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );
    let reconciler = Reconciler::new(
        &AutofavConfig::default(),
        h.settings.clone(),
        h.backend.clone(),
        h.directory.clone(),
        h.store.clone(),
    )
    .with_backoff(backoff.clone());

    let outcome = reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NoChangeset);
    assert_eq!(backoff.waits.load(Ordering::SeqCst), 1);
    assert_eq!(h.backend.calls(), 2);
    assert_eq!(h.store.add_calls(), 0);
}

#[tokio::test]
async fn other_git_failures_are_not_retried() {
    let h = Harness::new(
        ScriptedBackend::new()
            .then_error(GitError::CommandFailed {
                status: Some(128),
                stderr: "fatal: unable to access repository".into(),
            })
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::NoChangeset);
    assert_eq!(h.backend.calls(), 1);
}

#[tokio::test]
async fn unknown_author_never_creates_an_account() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "stranger", "stranger@example.com"));

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(
        outcome,
        ReconcileOutcome::UnknownAuthor {
            author: "stranger".into()
        }
    );
    assert_eq!(h.directory.created_count(), 0);
    assert!(h
        .directory
        .lookups()
        .iter()
        .all(|(_, mode)| *mode == LookupMode::Existing));
    assert_eq!(h.store.add_calls(), 0);
}

#[tokio::test]
async fn alias_policy_matches_secondary_email() {
    let config = AutofavConfig {
        identity_policy: IdentityPolicyKind::EmailAlias,
        ..AutofavConfig::default()
    };
    let h = Harness::with_config(
        ScriptedBackend::new().then_commit(REVISION, "Vivek Pandey", "VIVEK@work.example.com"),
        config,
    );

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert_eq!(outcome, favorited("vivek", FavoriteOutcome::Added));
    assert_eq!(h.state("vivek"), FavoriteState::FavoritedAndCurrent);
}

#[tokio::test]
async fn baseline_policy_ignores_aliases() {
    let h = Harness::new(
        ScriptedBackend::new().then_commit(REVISION, "Vivek Pandey", "vivek@work.example.com"),
    );

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert!(matches!(outcome, ReconcileOutcome::UnknownAuthor { .. }));
    assert_eq!(h.state("vivek"), FavoriteState::NeverFavorited);
}

#[tokio::test]
async fn store_failure_is_swallowed() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    h.store.set_fail_writes(true);

    let outcome = h.reconciler.on_checkout(&h.first_build()).await.unwrap();

    assert!(matches!(
        outcome,
        ReconcileOutcome::Favorite {
            outcome: FavoriteOutcome::Failed(_),
            ..
        }
    ));
    assert_eq!(h.state("jdumay"), FavoriteState::NeverFavorited);
}

#[tokio::test]
async fn cancelled_backoff_propagates_interruption() {
    let (backoff, signal) = TokioBackoff::cancellable();
    let h = Harness::new(
        ScriptedBackend::new()
            .then_missing_object(REVISION)
            .then_commit(REVISION, "jdumay", "jdumay@example.com"),
    );
    let reconciler = Reconciler::new(
        &AutofavConfig::default(),
        h.settings.clone(),
        h.backend.clone(),
        h.directory.clone(),
        h.store.clone(),
    )
    .with_backoff(Arc::new(backoff));
    signal.cancel();

    let result = reconciler.on_checkout(&h.first_build()).await;

    assert_eq!(result, Err(Interrupted));
    assert_eq!(h.backend.calls(), 1);
    assert_eq!(h.store.add_calls(), 0);
}

#[tokio::test]
async fn non_branch_job_is_skipped() {
    let h = Harness::new(ScriptedBackend::new().then_commit(REVISION, "jdumay", "jdumay@example.com"));
    let mut event = h.first_build();
    event.job = JobHandle::new(
        "standalone",
        autofav_core::JobParent::Root,
        autofav_core::RunKind::Pipeline,
    );

    let outcome = h.reconciler.on_checkout(&event).await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::NotBranchJob));
    assert_eq!(h.backend.calls(), 0);
}
