//! Error taxonomy for the reconciliation engine.
//!
//! Reconciliation swallows and logs almost every failure; only an
//! interrupted backoff wait is surfaced to the caller.

/// The host cancelled the changelog retry wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reconciliation interrupted while waiting to retry the changelog read")]
pub struct Interrupted;

/// Errors raised while configuring or running reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for autofav-core operations.
pub type Result<T> = std::result::Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupted_converts() {
        let err: ReconcileError = Interrupted.into();
        assert!(matches!(err, ReconcileError::Interrupted(_)));
        assert!(err.to_string().contains("interrupted"));
    }

    #[test]
    fn config_error_display() {
        let err = ReconcileError::Config("AUTOFAV_RETRY_BACKOFF_MS: not a number".into());
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
