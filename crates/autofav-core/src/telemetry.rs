//! Tracing initialisation for hosts embedding autofav.
//!
//! [`init_tracing`] installs a global subscriber once per process. Hosts
//! that already own a subscriber should skip it; autofav only emits through
//! the `tracing` macros.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AUTOFAV_LOG";

/// Build the filter: `AUTOFAV_LOG`, then `RUST_LOG`, then `level`.
pub fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber.
///
/// With `json`, log lines are newline-delimited JSON. Returns `false` when a
/// global subscriber was already set; the call is then a no-op.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let installed = if json {
        registry
            .with(fmt::layer().with_target(false).json())
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    installed.is_ok()
}
