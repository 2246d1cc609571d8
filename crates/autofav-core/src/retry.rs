//! Bounded retry with a cancellable backoff wait.
//!
//! [`retry_with`] runs an operation, asks a classifier whether a failure is
//! worth another attempt, and waits on a [`Backoff`] between attempts. The
//! wait is the only place a retry can be interrupted.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::config::DEFAULT_RETRY_BACKOFF_MS;
use crate::domain::Interrupted;

/// How many extra attempts to make and how long to wait before each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once(Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS))
    }
}

impl RetryPolicy {
    /// One retry after `backoff`.
    pub fn once(backoff: Duration) -> Self {
        Self {
            max_retries: 1,
            backoff,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }
}

/// Why [`retry_with`] gave up.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The classifier rejected the failure
    Fatal(E),
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: E },
    /// The backoff wait was cancelled
    Interrupted,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Fatal(e) => write!(f, "{e}"),
            RetryError::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
            RetryError::Interrupted => f.write_str("retry interrupted"),
        }
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration) -> Result<(), Interrupted>;
}

/// Fires a [`TokioBackoff`]'s cancellation.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelSignal {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Sleeps on the tokio timer, optionally racing a [`CancelSignal`].
#[derive(Debug, Clone, Default)]
pub struct TokioBackoff {
    cancel: Option<watch::Receiver<bool>>,
}

impl TokioBackoff {
    /// Backoff that can only be cancelled by dropping the future.
    pub fn new() -> Self {
        Self::default()
    }

    /// Backoff paired with the signal that interrupts it.
    pub fn cancellable() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (
            Self { cancel: Some(rx) },
            CancelSignal { tx: Arc::new(tx) },
        )
    }
}

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) -> Result<(), Interrupted> {
        let Some(rx) = &self.cancel else {
            tokio::time::sleep(delay).await;
            return Ok(());
        };
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancelled(rx.clone()) => Err(Interrupted),
        }
    }
}

/// Resolves once the signal fires. Never resolves if the signal is dropped.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or `policy.max_retries` extra attempts are used up.
///
/// `op` receives the 1-based attempt number.
pub async fn retry_with<T, E, C, F, Fut>(
    policy: RetryPolicy,
    backoff: &dyn Backoff,
    is_retryable: C,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    C: Fn(&E) -> bool,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !is_retryable(&err) {
            return Err(RetryError::Fatal(err));
        }
        if attempt > policy.max_retries {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        debug!(
            attempt,
            delay_ms = policy.backoff.as_millis() as u64,
            error = %err,
            "retryable failure; backing off"
        );
        backoff
            .wait(policy.backoff)
            .await
            .map_err(|Interrupted| RetryError::Interrupted)?;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Counts waits without sleeping.
    #[derive(Default)]
    struct CountingBackoff {
        waits: AtomicU32,
    }

    #[async_trait]
    impl Backoff for CountingBackoff {
        async fn wait(&self, _delay: Duration) -> Result<(), Interrupted> {
            self.waits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RefusingBackoff;

    #[async_trait]
    impl Backoff for RefusingBackoff {
        async fn wait(&self, _delay: Duration) -> Result<(), Interrupted> {
            Err(Interrupted)
        }
    }

    fn transient(e: &&str) -> bool {
        *e == "transient"
    }

    #[tokio::test]
    async fn success_first_time_never_waits() {
        let backoff = CountingBackoff::default();
        let result: Result<u32, RetryError<&str>> =
            retry_with(RetryPolicy::default(), &backoff, transient, |attempt| async move {
                Ok(attempt)
            })
            .await;
        assert_eq!(result, Ok(1));
        assert_eq!(backoff.waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retryable_then_success() {
        let backoff = CountingBackoff::default();
        let result = retry_with(RetryPolicy::default(), &backoff, transient, |attempt| async move {
            if attempt == 1 {
                Err("transient")
            } else {
                Ok(attempt)
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(backoff.waits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn two_retryable_failures_exhaust_after_one_wait() {
        let backoff = CountingBackoff::default();
        let result: Result<(), _> =
            retry_with(RetryPolicy::default(), &backoff, transient, |_| async {
                Err("transient")
            })
            .await;
        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 2,
                last: "transient"
            })
        );
        assert_eq!(backoff.waits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_failure_is_not_retried() {
        let backoff = CountingBackoff::default();
        let result: Result<(), _> =
            retry_with(RetryPolicy::default(), &backoff, transient, |_| async { Err("broken") })
                .await;
        assert_eq!(result, Err(RetryError::Fatal("broken")));
        assert_eq!(backoff.waits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn no_retry_policy_exhausts_immediately() {
        let backoff = CountingBackoff::default();
        let result: Result<(), _> =
            retry_with(RetryPolicy::none(), &backoff, transient, |_| async {
                Err("transient")
            })
            .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn interrupted_wait_stops_the_loop() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> =
            retry_with(RetryPolicy::default(), &RefusingBackoff, transient, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("transient") }
            })
            .await;
        assert_eq!(result, Err(RetryError::Interrupted));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_backoff_sleeps_the_full_delay() {
        let start = tokio::time::Instant::now();
        TokioBackoff::new()
            .wait(Duration::from_secs(2))
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_the_wait() {
        let (backoff, signal) = TokioBackoff::cancellable();
        let waiter = tokio::spawn(async move { backoff.wait(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Interrupted));
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn already_cancelled_fails_fast() {
        let (backoff, signal) = TokioBackoff::cancellable();
        signal.cancel();
        assert_eq!(backoff.wait(Duration::from_secs(60)).await, Err(Interrupted));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_signal_still_sleeps() {
        let (backoff, signal) = TokioBackoff::cancellable();
        drop(signal);
        let start = tokio::time::Instant::now();
        assert_eq!(backoff.wait(Duration::from_secs(2)).await, Ok(()));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
