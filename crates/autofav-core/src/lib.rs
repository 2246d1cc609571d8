//! autofav-core: first-build authorship reconciliation
//!
//! When a multi-branch project runs the first build of a newly discovered
//! branch, the author of the commit that build checked out gets the branch
//! job added to their favorites, once. A favorite the user later removes is
//! never added back.
//!
//! ## Layer 2 - Reconciliation
//!
//! Control flow for one checkout event:
//!
//! 1. [`TriggerGate`] decides whether the event is a qualifying first build
//! 2. [`ChangesetResolver`] reads the single commit behind the built revision,
//!    retrying once when the object is not yet visible
//! 3. an [`IdentityPolicy`] maps the commit author to an existing account
//! 4. [`FavoriteStateMachine`] adds the favorite if the pair was never favorited
//!
//! [`Reconciler`] wires the four together.
//!
//! ```ignore
//! let reconciler = Reconciler::from_config(
//!     &AutofavConfig::from_env()?,
//!     Arc::new(EnvSettings::new()),
//!     directory,
//!     Arc::new(SurrealFavoriteStore::from_env().await?),
//! );
//! reconciler.on_checkout(&event).await?;
//! ```

pub mod changeset;
pub mod config;
pub mod domain;
pub mod favorites;
pub mod gate;
pub mod identity;
pub mod metrics;
pub mod obs;
pub mod reconciler;
pub mod retry;
pub mod telemetry;

pub use changeset::ChangesetResolver;
pub use config::{
    AutofavConfig, EnvSettings, IdentityPolicyKind, MissingObjectPolicy, SettingsProvider,
    StaticSettings, KILL_SWITCH_ENV,
};
pub use domain::{
    CheckoutEvent, Interrupted, JobHandle, JobParent, ReconcileError, Result, RunKind, ScmKind,
};
pub use favorites::{FavoriteOutcome, FavoriteStateMachine};
pub use gate::{GateDecision, SkipReason, TriggerGate};
pub use identity::{policy_for, EmailAliasPolicy, ExactIdPolicy, Identity, IdentityPolicy};
pub use metrics::{MetricsSnapshot, METRICS};
pub use obs::{
    emit_changeset_retry, emit_favorite_added, emit_favorite_failed, emit_reconcile_skipped,
    emit_reconcile_started, ReconcileSpan,
};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use retry::{retry_with, Backoff, CancelSignal, RetryError, RetryPolicy, TokioBackoff};
pub use telemetry::init_tracing;

pub use autofav_git::{ChangelogBackend, ChangelogParser, Changeset, GitError};
pub use autofav_state::{
    Account, AccountDirectory, AccountId, FavoriteState, FavoriteStore, JobRef, StorageError,
};
