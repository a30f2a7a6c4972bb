//! Per-parent sequence numbering.
//!
//! Every parent (an application for chats, a chat for messages) carries a
//! monotonic counter holding the highest child number it has handed out.
//! Allocation bumps that counter in the same transaction that inserts the
//! child, so two writers on the same parent either serialize or conflict;
//! conflicts are re-run through [`SequenceAllocator::run`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{PersistError, Result};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(10);

/// Parent scope a number is allocated in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SequenceScope {
    /// Chat numbers within an application
    Application { token: String },
    /// Message numbers within a chat
    Chat {
        application_token: String,
        chat_number: i64,
    },
}

impl SequenceScope {
    pub fn application(token: impl Into<String>) -> Self {
        SequenceScope::Application { token: token.into() }
    }

    pub fn chat(application_token: impl Into<String>, chat_number: i64) -> Self {
        SequenceScope::Chat {
            application_token: application_token.into(),
            chat_number,
        }
    }
}

impl fmt::Display for SequenceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceScope::Application { token } => write!(f, "application:{}", token),
            SequenceScope::Chat {
                application_token,
                chat_number,
            } => write!(f, "application:{}:chat:{}", application_token, chat_number),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SequenceAllocator {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl SequenceAllocator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Base delay between attempts; attempt `n` waits `n * backoff`
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Number following the highest one handed out so far under a parent
    pub fn next_after(last: i64) -> Result<i64> {
        if last < 0 {
            return Err(PersistError::Internal(format!(
                "sequence counter is negative: {}",
                last
            )));
        }
        last.checked_add(1)
            .ok_or_else(|| PersistError::ConstraintViolation("sequence exhausted".to_string()))
    }

    /// Run one allocation unit of work, re-running it on write conflicts.
    ///
    /// `op` must start a fresh transaction on every call. Non-retryable
    /// errors are returned as-is; conflicts that outlast `max_attempts`
    /// become [`PersistError::ConstraintViolation`].
    pub async fn run<T, F, Fut>(&self, scope: &SequenceScope, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.retry(format!("number allocation for {}", scope), op)
            .await
    }

    /// Re-run `op` on write conflicts under the same attempt budget as
    /// [`SequenceAllocator::run`]; `label` names the work in logs and errors.
    pub async fn retry<T, L, F, Fut>(&self, label: L, mut op: F) -> Result<T>
    where
        L: fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            work = %label,
                            attempts = attempt,
                            error = %err,
                            "Retries exhausted"
                        );
                        return Err(PersistError::ConstraintViolation(format!(
                            "{} kept conflicting after {} attempts",
                            label, attempt
                        )));
                    }

                    tracing::debug!(
                        work = %label,
                        attempt,
                        error = %err,
                        "Write conflicted, retrying"
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn allocator(max_attempts: u32) -> SequenceAllocator {
        SequenceAllocator::new(max_attempts).with_backoff(Duration::ZERO)
    }

    #[test]
    fn test_next_after() {
        assert_eq!(SequenceAllocator::next_after(0).unwrap(), 1);
        assert_eq!(SequenceAllocator::next_after(41).unwrap(), 42);
    }

    #[test]
    fn test_next_after_exhausted() {
        let err = SequenceAllocator::next_after(i64::MAX).unwrap_err();
        assert!(matches!(err, PersistError::ConstraintViolation(_)));
    }

    #[test]
    fn test_next_after_negative_counter() {
        assert!(matches!(
            SequenceAllocator::next_after(-1),
            Err(PersistError::Internal(_))
        ));
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(SequenceScope::application("abc").to_string(), "application:abc");
        assert_eq!(SequenceScope::chat("abc", 3).to_string(), "application:abc:chat:3");
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(SequenceAllocator::new(0).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_retries_conflict_then_succeeds() {
        let calls = AtomicU32::new(0);
        let scope = SequenceScope::application("abc");

        let result = allocator(5)
            .run(&scope, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(PersistError::WriteConflict("raced".into()))
                } else {
                    Ok(n as i64)
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_constraint_violation() {
        let calls = AtomicU32::new(0);
        let scope = SequenceScope::chat("abc", 1);

        let err = allocator(4)
            .run(&scope, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i64, _>(PersistError::WriteConflict("raced".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PersistError::ConstraintViolation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_retry_names_the_work_in_its_error() {
        let calls = AtomicU32::new(0);

        let err = allocator(2)
            .retry("application token", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(PersistError::WriteConflict("duplicate key".into()))
            })
            .await
            .unwrap_err();

        match err {
            PersistError::ConstraintViolation(msg) => {
                assert!(msg.starts_with("application token kept conflicting"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let scope = SequenceScope::application("missing");

        let err = allocator(5)
            .run(&scope, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<i64, _>(PersistError::ApplicationNotFound("missing".into()))
            })
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
