//! Opt-in retry for page fetches.
//!
//! With `max_retries = 0` (the default) the operation runs exactly once.
//! Otherwise transient outcomes (see [`FetchOutcome::is_retriable`]) are
//! retried with exponential backoff and jitter. Cancellation cuts a pending
//! backoff short and returns the last outcome.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::fetch::FetchOutcome;

const MAX_DELAY_MS: u64 = 30_000;

/// Runs `operation` until it yields a non-retriable outcome, retries are
/// exhausted, or `cancel` fires.
///
/// | Retry | Sleep before it               |
/// |-------|-------------------------------|
/// | 1     | base × 2⁰ ± 25 % jitter       |
/// | 2     | base × 2¹ ± 25 % jitter       |
/// | 3     | base × 2² ± 25 % jitter       |
///
/// Delay is capped at 30 s.
pub(crate) async fn retry_fetch<F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    cancel: &CancellationToken,
    mut operation: F,
) -> FetchOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchOutcome>,
{
    let mut attempt = 0u32;
    loop {
        let outcome = operation().await;
        if !outcome.is_retriable() || attempt >= max_retries || cancel.is_cancelled() {
            return outcome;
        }

        attempt += 1;
        let delay_ms = backoff_delay_ms(backoff_base_ms, attempt);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms,
            outcome = %outcome,
            "transient fetch failure; retrying after backoff"
        );

        tokio::select! {
            () = cancel.cancelled() => return outcome,
            () = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
        }
    }
}

fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    let computed = backoff_base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped = computed.min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    jittered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn network_error() -> FetchOutcome {
        FetchOutcome::NetworkError {
            cause: "connect: refused".to_owned(),
        }
    }

    fn ok() -> FetchOutcome {
        FetchOutcome::Success {
            body: "<html></html>".to_owned(),
            status_code: 200,
        }
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let outcome = retry_fetch(0, 0, &CancellationToken::new(), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                network_error()
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, network_error());
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let outcome = retry_fetch(3, 0, &CancellationToken::new(), || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    FetchOutcome::HttpError { status_code: 503 }
                } else {
                    ok()
                }
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome, ok());
    }

    #[tokio::test]
    async fn returns_last_outcome_after_exhausting_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let outcome = retry_fetch(2, 0, &CancellationToken::new(), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::HttpError { status_code: 429 }
            }
        })
        .await;
        // max_retries=2 → 3 total attempts
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome, FetchOutcome::HttpError { status_code: 429 });
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let outcome = retry_fetch(3, 0, &CancellationToken::new(), || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                FetchOutcome::HttpError { status_code: 404 }
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, FetchOutcome::HttpError { status_code: 404 });
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let outcome = retry_fetch(5, 60_000, &cancel, || {
            let c = Arc::clone(&c);
            let trigger = trigger.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                network_error()
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, network_error());
    }

    #[test]
    fn backoff_is_capped() {
        for _ in 0..20 {
            assert!(backoff_delay_ms(u64::MAX, 40) <= MAX_DELAY_MS * 5 / 4);
        }
    }

    #[test]
    fn backoff_grows_exponentially_within_jitter() {
        let third = backoff_delay_ms(1_000, 3);
        assert!((3_000..=5_000).contains(&third), "got {third}");
    }
}
