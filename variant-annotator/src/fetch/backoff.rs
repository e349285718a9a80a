use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::{Batch, RawResponse, Session, Upstream};
use crate::error::FetchError;
use crate::metrics_consts::UPSTREAM_RETRIES;

/// How long [`Retrying`] waits before each retry. The `n`th retry (counting from zero) waits
/// `initial_delay * multiplier^n`, never more than `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl BackoffPolicy {
    pub const fn new(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_delay,
        }
    }

    /// NCBI asks for no more than a few requests per second, so start around one second.
    pub const fn default_upstream() -> Self {
        Self::new(Duration::from_secs(1), 2.0, Duration::from_secs(60))
    }

    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        if !millis.is_finite() || millis >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(millis as u64)
    }
}

/// Retry layer for an [`Upstream`]. Transient failures (transport errors, 429, 5xx) are retried
/// with backoff up to `max_attempts` total attempts; anything else is returned at once.
/// Nothing in the crate wraps an upstream in this implicitly.
pub struct Retrying<U> {
    inner: U,
    policy: BackoffPolicy,
    max_attempts: u32,
}

impl<U: Upstream> Retrying<U> {
    pub fn new(inner: U, policy: BackoffPolicy, max_attempts: u32) -> Self {
        Self {
            inner,
            policy,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn into_inner(self) -> U {
        self.inner
    }

    async fn retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, FetchError>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt + 1 < self.max_attempts => {
                    let delay = self.policy.delay_before_retry(attempt);
                    warn!(
                        upstream = self.inner.name(),
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{} failed, retrying: {}",
                        what,
                        error
                    );
                    metrics::counter!(UPSTREAM_RETRIES, "upstream" => self.inner.name().to_string())
                        .increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[async_trait]
impl<U: Upstream> Upstream for Retrying<U> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn prepare(&self, query_ids: &[String]) -> Result<Session, FetchError> {
        self.retry("prepare", || self.inner.prepare(query_ids)).await
    }

    async fn fetch(&self, session: &Session, batch: &Batch) -> Result<RawResponse, FetchError> {
        self.retry("fetch", || self.inner.fetch(session, batch)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::RecordingUpstream;
    use crate::fetch::BatchFetcher;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_upstream_policy_doubles_up_to_a_minute() {
        let policy = BackoffPolicy::default_upstream();
        let waits: Vec<u64> = (0..8)
            .map(|retry| policy.delay_before_retry(retry).as_secs())
            .collect();
        assert_eq!(waits, vec![1, 2, 4, 8, 16, 32, 60, 60]);
        assert_eq!(policy.delay_before_retry(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn test_shrinking_multiplier_keeps_delay_flat() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), 0.5, Duration::from_secs(5));
        assert_eq!(policy.delay_before_retry(0), Duration::from_millis(250));
        assert_eq!(policy.delay_before_retry(3), Duration::from_millis(250));
    }

    fn flaky(failures: usize, status: u16) -> (RecordingUpstream, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let upstream = RecordingUpstream::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < failures {
                Err(FetchError::Status {
                    status,
                    body: String::new(),
                })
            } else {
                Ok(RawResponse::Text("ok".to_string()))
            }
        });
        (upstream, calls)
    }

    fn one_batch() -> Batch {
        BatchFetcher::plan(&["1".to_string()], 1, str::to_string).remove(0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_with_backoff() {
        let (upstream, calls) = flaky(2, 429);
        let retrying = Retrying::new(upstream, BackoffPolicy::default_upstream(), 3);

        let start = tokio::time::Instant::now();
        let raw = retrying.fetch(&Session::Stateless, &one_batch()).await.unwrap();
        assert_eq!(raw, RawResponse::Text("ok".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let (upstream, calls) = flaky(10, 503);
        let retrying = Retrying::new(upstream, BackoffPolicy::default_upstream(), 2);

        let err = retrying.fetch(&Session::Stateless, &one_batch()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (upstream, calls) = flaky(10, 400);
        let retrying = Retrying::new(upstream, BackoffPolicy::default_upstream(), 5);

        assert!(retrying.fetch(&Session::Stateless, &one_batch()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct FlakyPost {
        posts: AtomicUsize,
    }

    #[async_trait]
    impl Upstream for FlakyPost {
        fn name(&self) -> &str {
            "flaky_post"
        }

        async fn prepare(&self, _query_ids: &[String]) -> Result<Session, FetchError> {
            if self.posts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(FetchError::Status {
                    status: 502,
                    body: String::new(),
                });
            }
            Ok(Session::Job {
                web_env: "ENV".to_string(),
                query_key: "1".to_string(),
            })
        }

        async fn fetch(&self, _session: &Session, _batch: &Batch) -> Result<RawResponse, FetchError> {
            Ok(RawResponse::Text("ok".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_post_is_retried_with_configured_policy() {
        let policy = BackoffPolicy::new(Duration::from_millis(500), 3.0, Duration::from_secs(10));
        let retrying = Retrying::new(FlakyPost { posts: AtomicUsize::new(0) }, policy, 2);

        let start = tokio::time::Instant::now();
        let session = retrying.prepare(&["1".to_string()]).await.unwrap();
        assert!(matches!(session, Session::Job { .. }));
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(retrying.into_inner().posts.load(Ordering::SeqCst), 2);
    }
}
