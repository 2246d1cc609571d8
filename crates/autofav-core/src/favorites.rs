//! Favorite state machine for an (account, job) pair.
//!
//! ```text
//! NeverFavorited ──add──▶ FavoritedAndCurrent ──user removes──▶ FavoritedThenRemoved
//! ```
//!
//! Reconciliation only ever takes the first edge. A pair the user has
//! unfavorited is left alone for good.

use std::sync::Arc;

use autofav_state::{AccountId, FavoriteState, FavoriteStore, JobRef, StorageResult};
use tracing::debug;

use crate::config::SettingsProvider;
use crate::identity::Identity;
use crate::metrics::METRICS;
use crate::obs;

/// What [`FavoriteStateMachine::reconcile`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteOutcome {
    /// Favorite was added
    Added,
    AlreadyFavorite,
    /// The user removed this favorite earlier; nothing was written
    RespectedRemoval,
    UnknownIdentity,
    GloballyDisabled,
    /// The account opted out of automatic favorites
    OptedOut,
    /// The store failed; details were logged
    Failed(String),
}

impl FavoriteOutcome {
    /// Whether the store was written to.
    pub fn mutated(&self) -> bool {
        matches!(self, FavoriteOutcome::Added)
    }
}

pub struct FavoriteStateMachine {
    store: Arc<dyn FavoriteStore>,
    settings: Arc<dyn SettingsProvider>,
}

impl FavoriteStateMachine {
    pub fn new(store: Arc<dyn FavoriteStore>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self { store, settings }
    }

    /// Read the pair's state from the store.
    pub async fn current_state(
        &self,
        account: &AccountId,
        job: &JobRef,
    ) -> StorageResult<FavoriteState> {
        let ever = self.store.has_favorite(account, job).await?;
        let current = self.store.is_favorite(account, job).await?;
        Ok(FavoriteState::from_flags(ever, current))
    }

    /// Favorite `job` for `identity` if it has never been favorited before.
    ///
    /// The state is read fresh on every call. Never returns an error; store
    /// failures are logged and reported as [`FavoriteOutcome::Failed`].
    pub async fn reconcile(&self, identity: &Identity, job: &JobRef) -> FavoriteOutcome {
        let Identity::Known(account) = identity else {
            return FavoriteOutcome::UnknownIdentity;
        };
        if !self.settings.autofavorite_enabled() {
            return FavoriteOutcome::GloballyDisabled;
        }
        if !account.autofavorite_enabled() {
            debug!(account = %account.id, job = %job, "account opted out of autofavorite");
            return FavoriteOutcome::OptedOut;
        }

        let state = match self.current_state(&account.id, job).await {
            Ok(state) => state,
            Err(e) => {
                METRICS.inc_failures();
                obs::emit_favorite_failed(job.full_name(), account.id.as_str(), &e);
                return FavoriteOutcome::Failed(e.to_string());
            }
        };

        match state {
            FavoriteState::FavoritedAndCurrent => FavoriteOutcome::AlreadyFavorite,
            FavoriteState::FavoritedThenRemoved => {
                debug!(account = %account.id, job = %job, "favorite was removed by the user; leaving it");
                FavoriteOutcome::RespectedRemoval
            }
            FavoriteState::NeverFavorited => match self.store.add_favorite(&account.id, job).await {
                Ok(()) => {
                    METRICS.inc_favorites_added();
                    obs::emit_favorite_added(job.full_name(), account.id.as_str());
                    FavoriteOutcome::Added
                }
                Err(e) => {
                    METRICS.inc_failures();
                    obs::emit_favorite_failed(job.full_name(), account.id.as_str(), &e);
                    FavoriteOutcome::Failed(e.to_string())
                }
            },
        }
    }
}
