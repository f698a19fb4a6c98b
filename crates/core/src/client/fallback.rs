//! Retry loop that walks the mirror list on failure.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::mirror::{MirrorManager, MirrorRecord};

use super::{RateLimiter, RequestError};

/// Runs a unit of work against the active mirror, falling back to the next
/// mirror on failure.
///
/// Each call tries every mirror at most once. A successful attempt leaves the
/// mirror that answered as the active one, so later calls start there. When
/// every mirror fails, the manager is reset to the primary mirror and the
/// last error is returned.
#[derive(Debug, Clone)]
pub struct FallbackExecutor {
    mirrors: Arc<MirrorManager>,
    rate_limiter: Arc<RateLimiter>,
    cancel: Option<CancellationToken>,
}

impl FallbackExecutor {
    pub fn new(mirrors: Arc<MirrorManager>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            mirrors,
            rate_limiter,
            cancel: None,
        }
    }

    /// Abort the in-flight attempt and skip the remaining ones once `token`
    /// is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn mirrors(&self) -> &Arc<MirrorManager> {
        &self.mirrors
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Run `work` with the active mirror until it succeeds or every mirror
    /// has been tried.
    ///
    /// Returns the payload together with the mirror that produced it.
    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        mut work: F,
    ) -> Result<(T, MirrorRecord), RequestError>
    where
        F: FnMut(MirrorRecord) -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let _timer = metrics::API_REQUEST_DURATION
            .with_label_values(&[operation])
            .start_timer();

        let start = self.mirrors.current();
        let mut tried: HashSet<String> = HashSet::new();
        let mut last_error: Option<RequestError> = None;

        loop {
            let mirror = self.mirrors.current();
            if !tried.insert(mirror.base_url().to_string()) {
                break;
            }

            if self.is_cancelled() {
                debug!(operation = operation, "Request cancelled");
                return Err(RequestError::Cancelled);
            }

            self.rate_limiter.acquire().await;

            let attempt = work(mirror.clone());
            let outcome = match &self.cancel {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => {
                        debug!(operation = operation, mirror = %mirror.base_url(), "Request cancelled in flight");
                        return Err(RequestError::Cancelled);
                    }
                    result = attempt => result,
                },
                None => attempt.await,
            };

            match outcome {
                Ok(payload) => {
                    metrics::MIRROR_ATTEMPTS.with_label_values(&["success"]).inc();
                    if mirror != start {
                        info!(mirror = %mirror.base_url(), "Successfully using mirror");
                    }
                    return Ok((payload, mirror));
                }
                Err(e) => {
                    metrics::MIRROR_ATTEMPTS.with_label_values(&["failed"]).inc();
                    warn!(
                        mirror = %mirror.base_url(),
                        operation = operation,
                        error = %e,
                        "Mirror failed, trying next mirror"
                    );
                    last_error = Some(e);

                    if self.mirrors.advance().is_none() {
                        break;
                    }
                }
            }
        }

        self.mirrors.reset_to_primary();
        metrics::FALLBACK_EXHAUSTED.inc();

        Err(last_error.unwrap_or_else(|| RequestError::AllMirrorsFailed(operation.to_string())))
    }
}
