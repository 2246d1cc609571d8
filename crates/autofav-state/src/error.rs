//! Error types for autofav-state

use thiserror::Error;

/// Errors raised while opening or preparing a persistent store
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by [`crate::AccountDirectory`] and [`crate::FavoriteStore`]
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backing store rejected or failed a read
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Persisting a favorite failed; the record is left as it was
    #[error("failed to favorite {job} for {account}: {reason}")]
    FavoriteWrite {
        account: String,
        job: String,
        reason: String,
    },
}
