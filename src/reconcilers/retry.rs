// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Exponential backoff for Kubernetes API reads.
//!
//! Reconcilers list providers, fetch records and look up owned objects on
//! every pass. A throttled or briefly unavailable API server (429, 5xx or a
//! dropped connection) should not fail the whole pass, so those reads go
//! through [`retry_api_call`]. Anything else, such as a 404 or a validation
//! error, is returned on the first attempt.

use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Tunables of an [`ExponentialBackoff`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub initial_interval: Duration,
    /// Upper bound of a single delay
    pub max_interval: Duration,
    /// Give up once this much time has passed since the first attempt
    pub max_elapsed_time: Option<Duration>,
    /// Growth factor applied after each delay
    pub multiplier: f64,
    /// Relative jitter, e.g. `0.1` for ±10%
    pub randomization_factor: f64,
}

/// Policy used for Kubernetes API reads.
///
/// Roughly 100ms, 200ms, 400ms ... capped at 30s, for at most 5 minutes.
pub const KUBE_API_BACKOFF: BackoffPolicy = BackoffPolicy {
    initial_interval: Duration::from_millis(100),
    max_interval: Duration::from_secs(30),
    max_elapsed_time: Some(Duration::from_secs(300)),
    multiplier: 2.0,
    randomization_factor: 0.1,
};

/// Stateful backoff iterator built from a [`BackoffPolicy`].
#[derive(Debug)]
pub struct ExponentialBackoff {
    policy: BackoffPolicy,
    current_interval: Duration,
    started: Instant,
}

impl ExponentialBackoff {
    #[must_use]
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current_interval: policy.initial_interval,
            started: Instant::now(),
        }
    }

    /// Policy this backoff was built from.
    #[must_use]
    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Whether the elapsed-time budget is spent.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.policy
            .max_elapsed_time
            .is_some_and(|max| self.started.elapsed() >= max)
    }

    /// Next delay, or `None` once the elapsed-time budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        let interval = self.current_interval;
        let grown = interval.as_secs_f64() * self.policy.multiplier;
        self.current_interval = Duration::from_secs_f64(grown).min(self.policy.max_interval);

        Some(self.jitter(interval))
    }

    fn jitter(&self, interval: Duration) -> Duration {
        let factor = self.policy.randomization_factor;
        if factor <= 0.0 {
            return interval;
        }
        let secs = interval.as_secs_f64();
        let delta = secs * factor;
        let jittered = secs - delta + rand::random::<f64>() * 2.0 * delta;
        Duration::from_secs_f64(jittered.max(0.0))
    }
}

/// Backoff for Kubernetes API reads.
#[must_use]
pub fn default_backoff() -> ExponentialBackoff {
    ExponentialBackoff::new(KUBE_API_BACKOFF)
}

/// Run a Kubernetes API call, retrying transient failures with backoff.
///
/// # Errors
///
/// Returns the first non-retryable error, or a summary error once the
/// backoff budget is spent.
///
/// # Example
///
/// ```no_run
/// use dns_manager::crd::DNSProvider;
/// use dns_manager::reconcilers::retry::retry_api_call;
/// use kube::{api::ListParams, Api, Client};
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<DNSProvider> = Api::all(client);
/// let providers = retry_api_call(
///     || async { api.list(&ListParams::default()).await },
///     "list DNSProviders",
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_api_call<T, F, Fut>(mut operation: F, operation_name: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = default_backoff();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let e = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "Kubernetes API call recovered");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !is_retryable_error(&e) {
            return Err(e.into());
        }

        let Some(delay) = backoff.next_backoff() else {
            error!(
                operation = operation_name,
                attempt,
                error = %e,
                "Giving up on Kubernetes API call"
            );
            return Err(anyhow::anyhow!(
                "{operation_name} failed after {attempt} attempts: {e}"
            ));
        };

        warn!(
            operation = operation_name,
            attempt,
            retry_after = ?delay,
            error = %e,
            "Transient Kubernetes API error, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Whether a Kubernetes error is worth retrying (429, 5xx, transport).
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(api_err) => api_err.code == 429 || (500..600).contains(&api_err.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
