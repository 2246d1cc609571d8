//! Runtime configuration and the autofavorite kill switch.
//!
//! [`AutofavConfig`] is read once when the [`crate::Reconciler`] is built.
//! The kill switch is different: it is consulted through a
//! [`SettingsProvider`] on every event, so flipping it takes effect without
//! rebuilding anything.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use autofav_git::GitError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ReconcileError, Result};

/// Process-wide kill switch variable read by [`EnvSettings`].
pub const KILL_SWITCH_ENV: &str = "AUTOFAVORITE_ENABLED";

pub const ENV_IDENTITY_POLICY: &str = "AUTOFAV_IDENTITY_POLICY";
pub const ENV_RETRY_UNREADABLE: &str = "AUTOFAV_RETRY_UNREADABLE_OBJECTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "AUTOFAV_RETRY_BACKOFF_MS";
pub const ENV_PREFER_NATIVE_GIT: &str = "AUTOFAV_PREFER_NATIVE_GIT";
pub const ENV_GIT_BINARY: &str = "AUTOFAV_GIT_BINARY";

/// Wait before the single changelog retry. Also the smallest accepted value:
/// a shorter wait gives a lagging object store less time to catch up.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2_000;

/// How a commit author is matched to an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityPolicyKind {
    /// Author string must equal an existing account id
    #[default]
    Exact,
    /// Fall back to matching the author email against account mail aliases
    EmailAlias,
}

impl FromStr for IdentityPolicyKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" | "exact-id" => Ok(Self::Exact),
            "email-alias" | "alias" => Ok(Self::EmailAlias),
            other => Err(ReconcileError::Config(format!(
                "{ENV_IDENTITY_POLICY}: unknown identity policy {other:?}"
            ))),
        }
    }
}

/// Which changelog failures count as "object not visible yet".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingObjectPolicy {
    /// Only a missing object is retried
    #[default]
    Strict,
    /// Unreadable or corrupt objects are retried too
    IncludeUnreadable,
}

impl MissingObjectPolicy {
    pub fn is_retryable(self, error: &GitError) -> bool {
        match self {
            MissingObjectPolicy::Strict => error.is_missing_object(),
            MissingObjectPolicy::IncludeUnreadable => {
                error.is_missing_object() || error.is_unreadable_object()
            }
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutofavConfig {
    pub identity_policy: IdentityPolicyKind,
    pub missing_object_policy: MissingObjectPolicy,
    /// May be raised, never lowered below [`DEFAULT_RETRY_BACKOFF_MS`]
    pub retry_backoff_ms: u64,
    pub prefer_native_git: bool,
    pub git_binary: String,
}

impl Default for AutofavConfig {
    fn default() -> Self {
        Self {
            identity_policy: IdentityPolicyKind::Exact,
            missing_object_policy: MissingObjectPolicy::Strict,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            prefer_native_git: true,
            git_binary: "git".to_string(),
        }
    }
}

impl AutofavConfig {
    /// Load from `AUTOFAV_*` environment variables, defaulting unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_IDENTITY_POLICY) {
            config.identity_policy = value.parse()?;
        }
        if let Some(value) = lookup(ENV_RETRY_UNREADABLE) {
            config.missing_object_policy = if require_flag(ENV_RETRY_UNREADABLE, &value)? {
                MissingObjectPolicy::IncludeUnreadable
            } else {
                MissingObjectPolicy::Strict
            };
        }
        if let Some(value) = lookup(ENV_RETRY_BACKOFF_MS) {
            config.retry_backoff_ms = value.trim().parse().map_err(|e| {
                ReconcileError::Config(format!("{ENV_RETRY_BACKOFF_MS}: {e}"))
            })?;
        }
        if let Some(value) = lookup(ENV_PREFER_NATIVE_GIT) {
            config.prefer_native_git = require_flag(ENV_PREFER_NATIVE_GIT, &value)?;
        }
        if let Some(value) = lookup(ENV_GIT_BINARY) {
            let value = value.trim();
            if value.is_empty() {
                return Err(ReconcileError::Config(format!("{ENV_GIT_BINARY}: empty")));
            }
            config.git_binary = value.to_string();
        }

        config.validate()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ReconcileError::Config(e.to_string()))?;
        config.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.retry_backoff_ms < DEFAULT_RETRY_BACKOFF_MS {
            return Err(ReconcileError::Config(format!(
                "{ENV_RETRY_BACKOFF_MS}: {}ms is below the {DEFAULT_RETRY_BACKOFF_MS}ms minimum",
                self.retry_backoff_ms
            )));
        }
        Ok(self)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Parse a boolean switch value. `None` for anything unrecognised.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn require_flag(key: &str, value: &str) -> Result<bool> {
    parse_flag(value)
        .ok_or_else(|| ReconcileError::Config(format!("{key}: expected a boolean, got {value:?}")))
}

// ---------------------------------------------------------------------------
// Kill switch
// ---------------------------------------------------------------------------

/// Source of the process-wide autofavorite switch.
pub trait SettingsProvider: Send + Sync {
    fn autofavorite_enabled(&self) -> bool;
}

/// Reads the switch from an environment variable on every call.
///
/// Unset means enabled. Only an explicit false value (`false`, `0`, `no`,
/// `off`) disables; anything else is logged and treated as enabled.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    var: String,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::with_var(KILL_SWITCH_ENV)
    }
}

impl EnvSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the switch from `var` instead of `AUTOFAVORITE_ENABLED`.
    pub fn with_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SettingsProvider for EnvSettings {
    fn autofavorite_enabled(&self) -> bool {
        let Ok(value) = std::env::var(&self.var) else {
            return true;
        };
        match parse_flag(&value) {
            Some(enabled) => enabled,
            None => {
                warn!(var = %self.var, value = %value, "unrecognised switch value; autofavorite stays enabled");
                true
            }
        }
    }
}

/// In-process switch, settable at runtime.
#[derive(Debug)]
pub struct StaticSettings {
    enabled: AtomicBool,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl StaticSettings {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl SettingsProvider for StaticSettings {
    fn autofavorite_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}
