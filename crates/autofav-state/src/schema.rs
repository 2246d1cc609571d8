//! SurrealDB row types for persisted favorites

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::storage_traits::{AccountId, FavoriteRecord, JobRef};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde::Serialize::serialize(&SurrealDatetime::from(*date), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Deterministic record key for an (account, job) pair.
///
/// Both ids are free-form text, so the key is the SHA-256 of the pair to
/// keep it a plain record id. One pair always maps to one record, which is
/// what makes upserts single-record atomic.
pub fn favorite_key(account: &AccountId, job: &JobRef) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(job.full_name().as_bytes());
    hex::encode(hasher.finalize())
}

/// Row stored in the `favorites` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRow {
    pub account_id: String,
    pub job: String,
    pub ever_favorited: bool,
    pub currently_favorite: bool,
    #[serde(with = "surreal_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl FavoriteRow {
    /// A freshly applied favorite
    pub fn favorited(account: &AccountId, job: &JobRef) -> Self {
        FavoriteRow {
            account_id: account.as_str().to_string(),
            job: job.full_name().to_string(),
            ever_favorited: true,
            currently_favorite: true,
            updated_at: Utc::now(),
        }
    }

    /// The same row after the user removed the favorite
    pub fn removed(mut self) -> Self {
        self.currently_favorite = false;
        self.updated_at = Utc::now();
        self
    }

    pub fn into_record(self) -> FavoriteRecord {
        FavoriteRecord {
            account: AccountId::new(self.account_id),
            job: JobRef::new(self.job),
            ever_favorited: self.ever_favorited,
            currently_favorite: self.currently_favorite,
            updated_at: self.updated_at,
        }
    }
}
