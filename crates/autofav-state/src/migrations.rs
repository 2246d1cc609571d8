//! SurrealDB schema migrations and initialization

use crate::Result;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info};

/// Initialize all autofav tables in SurrealDB.
///
/// Safe to call multiple times (idempotent).
pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    info!("Initializing autofav SurrealDB schema");
    init_favorites_table(db).await?;
    Ok(())
}

/// Initialize `favorites` table with constraints and indexes
///
/// Schema:
/// ```text
/// TABLE favorites {
///   id:                  favorites:<sha256(account_id, job)>
///   account_id:          STRING (indexed)
///   job:                 STRING
///   ever_favorited:      BOOL
///   currently_favorite:  BOOL
///   updated_at:          DATETIME
/// }
/// ```
///
/// Constraints:
/// - `(account_id, job)` is unique
/// - rows are never deleted; removal only clears `currently_favorite`
async fn init_favorites_table(db: &Surreal<Any>) -> Result<()> {
    debug!("Initializing favorites table");

    let sql = r#"
        DEFINE TABLE IF NOT EXISTS favorites
            SCHEMALESS
            PERMISSIONS
                FOR select, create, update FULL
                FOR delete NONE;

        DEFINE INDEX IF NOT EXISTS idx_favorite_pair ON TABLE favorites COLUMNS account_id, job UNIQUE;

        DEFINE INDEX IF NOT EXISTS idx_favorite_account ON TABLE favorites COLUMNS account_id;
    "#;

    db.query(sql).await?.check()?;
    info!("favorites table initialized");
    Ok(())
}
