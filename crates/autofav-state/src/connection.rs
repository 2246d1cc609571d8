//! Where the persistent favorite store lives and how to reach it.
//!
//! Resolution order for [`StoreConfig::from_env`]:
//! 1. `SURREALDB_ENDPOINT` + `SURREALDB_USERNAME` + `SURREALDB_PASSWORD`
//!    (remote, authenticated; `SURREALDB_NAMESPACE`, `SURREALDB_DATABASE`,
//!    `SURREALDB_ROOT` optional)
//! 2. `SURREALDB_URL` (any engine URL, unauthenticated)
//! 3. local persistence under `.autofav/db`

use std::path::PathBuf;

use surrealdb::engine::any::Any;
use surrealdb::opt::auth::{Database, Root};
use surrealdb::Surreal;
use tracing::{info, instrument};

use crate::error::StateError;
use crate::migrations;
use crate::Result;

const DEFAULT_NAMESPACE: &str = "autofav";
const DEFAULT_DATABASE: &str = "main";
const DEFAULT_LOCAL_PATH: &str = ".autofav/db";

/// Credentials for an authenticated remote endpoint
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Root user (true) or database user (false)
    pub is_root: bool,
}

/// Store location plus namespace/database selection
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SurrealDB engine URL (`mem://`, `surrealkv://...`, `wss://...`)
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<Credentials>,
    /// Directory to create before connecting, for local engines
    pub local_dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Volatile in-process store.
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            credentials: None,
            local_dir: None,
        }
    }

    /// Persistent store in a local directory.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            url: format!("surrealkv://{}", path.display()),
            local_dir: Some(path),
            ..Self::in_memory()
        }
    }

    pub fn with_namespace(mut self, ns: impl Into<String>) -> Self {
        self.namespace = ns.into();
        self
    }

    pub fn with_database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    pub fn from_env() -> Self {
        let namespace =
            std::env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| DEFAULT_NAMESPACE.to_string());
        let database =
            std::env::var("SURREALDB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());

        let remote = (
            std::env::var("SURREALDB_ENDPOINT"),
            std::env::var("SURREALDB_USERNAME"),
            std::env::var("SURREALDB_PASSWORD"),
        );
        if let (Ok(endpoint), Ok(username), Ok(password)) = remote {
            let is_root = std::env::var("SURREALDB_ROOT")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            return Self {
                url: endpoint,
                namespace,
                database,
                credentials: Some(Credentials {
                    username,
                    password,
                    is_root,
                }),
                local_dir: None,
            };
        }

        if let Ok(url) = std::env::var("SURREALDB_URL") {
            return Self {
                url,
                namespace,
                database,
                credentials: None,
                local_dir: None,
            };
        }

        Self::local(DEFAULT_LOCAL_PATH)
            .with_namespace(namespace)
            .with_database(database)
    }

    /// Connect, authenticate, select namespace/database and run migrations.
    #[instrument(skip(self), fields(url = %self.url, namespace = %self.namespace, database = %self.database))]
    pub async fn connect(&self) -> Result<Surreal<Any>> {
        if let Some(dir) = &self.local_dir {
            std::fs::create_dir_all(dir).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(self.url.as_str())
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", self.url, e)))?;

        if let Some(creds) = &self.credentials {
            if creds.is_root {
                db.signin(Root {
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("Root auth failed: {e}")))?;
            } else {
                db.signin(Database {
                    namespace: &self.namespace,
                    database: &self.database,
                    username: &creds.username,
                    password: &creds.password,
                })
                .await
                .map_err(|e| StateError::Connection(format!("DB auth failed: {e}")))?;
            }
        }

        db.use_ns(self.namespace.as_str())
            .use_db(self.database.as_str())
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;
        info!("favorite store connected");
        Ok(db)
    }
}
