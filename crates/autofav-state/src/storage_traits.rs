//! Storage trait definitions for autofav
//!
//! These traits describe the host-owned collaborators the reconciliation
//! engine reads from and writes to:
//! - `AccountDirectory`: account lookup by id, enumeration, mail aliases
//! - `FavoriteStore`: per (account, job) favorite flags
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Id of the sentinel account hosts hand out for unattributable changes.
pub const UNKNOWN_ACCOUNT_ID: &str = "unknown";

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Stable identifier of an account in the host's directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        AccountId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId::new(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Full name of a job, e.g. `feedle/master` for the `master` branch of the
/// `feedle` multi-branch project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobRef(String);

impl JobRef {
    pub fn new(full_name: impl Into<String>) -> Self {
        JobRef(full_name.into())
    }

    pub fn full_name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobRef {
    fn from(full_name: &str) -> Self {
        JobRef::new(full_name)
    }
}

impl std::fmt::Display for JobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// AccountDirectory
// ---------------------------------------------------------------------------

/// An account known to the host, with the properties reconciliation reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub display_name: Option<String>,
    /// Primary address from the account's mailer settings
    pub email: Option<String>,
    /// Secondary addresses; `None` when the account never configured the property
    pub mail_aliases: Option<BTreeSet<String>>,
    /// Per-account autofavorite preference; `None` means never set
    pub autofavorite: Option<bool>,
}

impl Account {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: AccountId::new(id),
            display_name: None,
            email: None,
            mail_aliases: None,
            autofavorite: None,
        }
    }

    /// The sentinel account used for authors the host cannot attribute.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_ACCOUNT_ID)
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_mail_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mail_aliases = Some(aliases.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_autofavorite(mut self, enabled: bool) -> Self {
        self.autofavorite = Some(enabled);
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.id.as_str() == UNKNOWN_ACCOUNT_ID
    }

    /// Whether this account accepts automatic favorites (enabled unless opted out).
    pub fn autofavorite_enabled(&self) -> bool {
        self.autofavorite.unwrap_or(true)
    }
}

/// How a directory lookup treats an id with no account behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Return `None` for unknown ids
    Existing,
    /// Provision a fresh account for unknown ids
    CreateIfMissing,
}

/// Read access to the host's account directory.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Look up an account by exact id.
    async fn lookup(&self, id: &str, mode: LookupMode) -> StorageResult<Option<Account>>;

    /// Every account the directory knows, in directory order.
    async fn list_all(&self) -> StorageResult<Vec<Account>>;

    /// The account's secondary email addresses, if the property is configured.
    async fn mail_aliases(&self, account: &Account) -> StorageResult<Option<BTreeSet<String>>> {
        Ok(account.mail_aliases.clone())
    }
}

// ---------------------------------------------------------------------------
// FavoriteStore
// ---------------------------------------------------------------------------

/// Persisted favorite flags for one (account, job) pair.
///
/// `currently_favorite` implies `ever_favorited`; stores maintain this by
/// only ever setting `ever_favorited` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub account: AccountId,
    pub job: JobRef,
    pub ever_favorited: bool,
    pub currently_favorite: bool,
    pub updated_at: DateTime<Utc>,
}

impl FavoriteRecord {
    pub fn state(&self) -> FavoriteState {
        FavoriteState::from_flags(self.ever_favorited, self.currently_favorite)
    }
}

/// The three observable favorite states of an (account, job) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteState {
    NeverFavorited,
    FavoritedAndCurrent,
    FavoritedThenRemoved,
}

impl FavoriteState {
    /// Derive the state from the two persisted flags.
    ///
    /// A record that claims to be current without ever having been favorited
    /// violates the store invariant; it is read as current so nothing is
    /// written on top of it.
    pub fn from_flags(ever_favorited: bool, currently_favorite: bool) -> Self {
        match (ever_favorited, currently_favorite) {
            (_, true) => FavoriteState::FavoritedAndCurrent,
            (true, false) => FavoriteState::FavoritedThenRemoved,
            (false, false) => FavoriteState::NeverFavorited,
        }
    }
}

impl std::fmt::Display for FavoriteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FavoriteState::NeverFavorited => "never_favorited",
            FavoriteState::FavoritedAndCurrent => "favorited_and_current",
            FavoriteState::FavoritedThenRemoved => "favorited_then_removed",
        };
        f.write_str(label)
    }
}

/// Favorite persistence.
///
/// Guarantees:
/// - `add_favorite` sets both flags; repeating it is harmless.
/// - `remove_favorite` clears `currently_favorite` only; `ever_favorited`
///   is never reset, so a removal stays observable.
/// - Each call is atomic for its own (account, job) record.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Whether a favorite was ever applied for this pair.
    async fn has_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool>;

    /// Whether the pair is a favorite right now.
    async fn is_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool>;

    /// Mark the job as a favorite. Fails with `StorageError::FavoriteWrite`.
    async fn add_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()>;

    /// Remove the favorite on the user's behalf. No-op if absent.
    async fn remove_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()>;

    /// The full record for the pair, if one was ever created.
    async fn record(&self, account: &AccountId, job: &JobRef)
        -> StorageResult<Option<FavoriteRecord>>;
}
