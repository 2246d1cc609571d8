//! SurrealDB-backed FavoriteStore implementation
//!
//! Uses `schema::FavoriteRow` for persistence, converting to/from
//! `storage_traits` types at the boundary. Each (account, job) pair is one
//! record with a deterministic id, so every mutation is a single-record upsert.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::debug;

use crate::connection::StoreConfig;
use crate::error::StorageError;
use crate::schema::{favorite_key, FavoriteRow};
use crate::storage_traits::{AccountId, FavoriteRecord, FavoriteStore, JobRef, StorageResult};

/// SurrealDB-backed implementation of [`FavoriteStore`].
#[derive(Clone)]
pub struct SurrealFavoriteStore {
    db: Surreal<Any>,
}

impl SurrealFavoriteStore {
    /// Create an in-memory instance for testing.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect(&StoreConfig::in_memory()).await
    }

    /// Create from environment variables (see [`StoreConfig::from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        Self::connect(&StoreConfig::from_env()).await
    }

    pub async fn connect(config: &StoreConfig) -> crate::Result<Self> {
        let db = config.connect().await?;
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_row(&self, account: &AccountId, job: &JobRef) -> StorageResult<Option<FavoriteRow>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::thing('favorites', $key)")
            .bind(("key", favorite_key(account, job)))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<FavoriteRow> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_row(&self, key: String, row: FavoriteRow) -> Result<(), surrealdb::Error> {
        self.db
            .query("UPSERT type::thing('favorites', $key) CONTENT $row")
            .bind(("key", key))
            .bind(("row", row))
            .await?
            .check()?;
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for SurrealFavoriteStore {
    async fn has_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool> {
        Ok(self
            .fetch_row(account, job)
            .await?
            .is_some_and(|row| row.ever_favorited))
    }

    async fn is_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<bool> {
        Ok(self
            .fetch_row(account, job)
            .await?
            .is_some_and(|row| row.currently_favorite))
    }

    async fn add_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()> {
        debug!(account = %account, job = %job, "upserting favorite");

        self.upsert_row(favorite_key(account, job), FavoriteRow::favorited(account, job))
            .await
            .map_err(|e| StorageError::FavoriteWrite {
                account: account.to_string(),
                job: job.to_string(),
                reason: e.to_string(),
            })
    }

    async fn remove_favorite(&self, account: &AccountId, job: &JobRef) -> StorageResult<()> {
        let Some(row) = self.fetch_row(account, job).await? else {
            return Ok(());
        };

        debug!(account = %account, job = %job, "clearing favorite");
        self.upsert_row(favorite_key(account, job), row.removed())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    async fn record(
        &self,
        account: &AccountId,
        job: &JobRef,
    ) -> StorageResult<Option<FavoriteRecord>> {
        Ok(self
            .fetch_row(account, job)
            .await?
            .map(FavoriteRow::into_record))
    }
}
