//! Connection check for the configured favorite store.
//! Run with: cargo run --package autofav-state --example store_check

use autofav_state::{AccountId, FavoriteStore, JobRef, StoreConfig, SurrealFavoriteStore};

#[tokio::main]
async fn main() {
    let config = StoreConfig::from_env();
    println!("Checking favorite store...");
    println!("  URL: {}", config.url);
    println!("  Namespace: {}", config.namespace);
    println!("  Database: {}", config.database);
    println!("  Authenticated: {}", config.credentials.is_some());

    let store = match SurrealFavoriteStore::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("\n✗ Connection failed: {e}");
            std::process::exit(1);
        }
    };
    println!("\n✓ Connected, schema initialized");

    let account = AccountId::new("store-check");
    let job = JobRef::new("store-check/sentinel");
    match store.record(&account, &job).await {
        Ok(Some(record)) => println!("✓ Sentinel record readable: {}", record.state()),
        Ok(None) => println!("✓ Favorites table readable (no sentinel record)"),
        Err(e) => {
            eprintln!("✗ Read failed: {e}");
            std::process::exit(1);
        }
    }
}
