//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryAccountDirectory` and `MemoryFavoriteStore` that satisfy
//! the trait contracts without any external dependencies, and record enough
//! about their use for tests to assert on side effects.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// MemoryAccountDirectory
// ---------------------------------------------------------------------------

/// In-memory directory keyed by account id, listed in id order.
#[derive(Debug, Default)]
pub struct MemoryAccountDirectory {
    accounts: Mutex<BTreeMap<String, Account>>,
    lookups: Mutex<Vec<(String, LookupMode)>>,
    created: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let directory = Self::new();
        for account in accounts {
            directory.insert(account);
        }
        directory
    }

    pub fn insert(&self, account: Account) {
        locked(&self.accounts).insert(account.id.as_str().to_string(), account);
    }

    /// Make every subsequent call fail with `StorageError::Backend`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every `lookup` call seen so far, in order.
    pub fn lookups(&self) -> Vec<(String, LookupMode)> {
        locked(&self.lookups).clone()
    }

    /// Number of accounts provisioned through `LookupMode::CreateIfMissing`.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        locked(&self.accounts).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("directory unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn lookup(&self, id: &str, mode: LookupMode) -> StorageResult<Option<Account>> {
        locked(&self.lookups).push((id.to_string(), mode));
        self.check_available()?;

        let mut accounts = locked(&self.accounts);
        if let Some(account) = accounts.get(id) {
            return Ok(Some(account.clone()));
        }
        match mode {
            LookupMode::Existing => Ok(None),
            LookupMode::CreateIfMissing => {
                let account = Account::new(id);
                accounts.insert(id.to_string(), account.clone());
                self.created.fetch_add(1, Ordering::SeqCst);
                Ok(Some(account))
            }
        }
    }

    async fn list_all(&self) -> StorageResult<Vec<Account>> {
        self.check_available()?;
        Ok(locked(&self.accounts).values().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryFavoriteStore
// ---------------------------------------------------------------------------

/// In-memory favorite store backed by a `HashMap<(account, job), record>`.
#[derive(Debug, Default)]
pub struct MemoryFavoriteStore {
    records: Mutex<HashMap<(AccountId, JobRef), FavoriteRecord>>,
    add_calls: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryFavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `add_favorite` fail with `StorageError::FavoriteWrite`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `add_favorite` calls that reached the store, failed or not.
    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn state(&self, account: &AccountId, job: &JobRef) -> FavoriteState {
        locked(&self.records)
            .get(&(account.clone(), job.clone()))
            .map(FavoriteRecord::state)
            .unwrap_or(FavoriteState::NeverFavorited)
    }
}

#[async_trait]
impl FavoriteStore for MemoryFavoriteStore {
    async fn has_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool> {
        Ok(locked(&self.records)
            .get(&(account.clone(), job.clone()))
            .is_some_and(|r| r.ever_favorited))
    }

    async fn is_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool> {
        Ok(locked(&self.records)
            .get(&(account.clone(), job.clone()))
            .is_some_and(|r| r.currently_favorite))
    }

    async fn add_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::FavoriteWrite {
                account: account.to_string(),
                job: job.to_string(),
                reason: "write rejected".to_string(),
            });
        }

        let mut records = locked(&self.records);
        let record = records
            .entry((account.clone(), job.clone()))
            .or_insert_with(|| FavoriteRecord {
                account: account.clone(),
                job: job.clone(),
                ever_favorited: false,
                currently_favorite: false,
                updated_at: Utc::now(),
            });
        record.ever_favorited = true;
        record.currently_favorite = true;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()> {
        if let Some(record) = locked(&self.records).get_mut(&(account.clone(), job.clone())) {
            record.currently_favorite = false;
            record.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn record(
        &self,
        account: &AccountId,
        job: &JobRef,
    ) -> StorageResult<Option<FavoriteRecord>> {
        Ok(locked(&self.records)
            .get(&(account.clone(), job.clone()))
            .cloned())
    }
}
