//! autofav-state: account and favorite persistence for autofav
//!
//! This crate defines the collaborators the reconciliation engine talks to
//! and ships a SurrealDB-backed favorite store.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: single-record consistency of favorite flags.
//!
//! ## Key Components
//!
//! - `AccountDirectory`: account lookup, enumeration, mail aliases
//! - `FavoriteStore`: per (account, job) favorite flags
//! - `SurrealFavoriteStore`: persistent `FavoriteStore`
//! - `fakes`: in-memory implementations for tests

mod connection;
mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_favorites;

pub use connection::{Credentials, StoreConfig};
pub use error::{StateError, StorageError};
pub use schema::favorite_key;
pub use storage_traits::{
    Account, AccountDirectory, AccountId, FavoriteRecord, FavoriteState, FavoriteStore, JobRef,
    LookupMode, StorageResult, UNKNOWN_ACCOUNT_ID,
};
pub use surreal_favorites::SurrealFavoriteStore;

/// Result type for store setup operations
pub type Result<T> = std::result::Result<T, StateError>;
