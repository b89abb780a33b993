// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        default_backoff, is_retryable_error, retry_api_call, BackoffPolicy, ExponentialBackoff,
        KUBE_API_BACKOFF,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(&format!("status {code}"), "Test")
                .with_code(code)
                .boxed(),
        )
    }

    fn no_jitter(initial_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy {
            initial_interval: Duration::from_millis(initial_ms),
            max_interval: Duration::from_millis(max_ms),
            max_elapsed_time: None,
            multiplier: 2.0,
            randomization_factor: 0.0,
        }
    }

    #[test]
    fn test_kube_api_policy() {
        let backoff = default_backoff();
        assert_eq!(*backoff.policy(), KUBE_API_BACKOFF);
        assert_eq!(KUBE_API_BACKOFF.initial_interval, Duration::from_millis(100));
        assert_eq!(KUBE_API_BACKOFF.max_interval, Duration::from_secs(30));
        assert_eq!(KUBE_API_BACKOFF.max_elapsed_time, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_backoff_doubles_until_capped() {
        let mut backoff = ExponentialBackoff::new(no_jitter(100, 500));
        let delays: Vec<_> = (0..5).map(|_| backoff.next_backoff().unwrap()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(500),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        for _ in 0..50 {
            let mut backoff = default_backoff();
            let delay = backoff.next_backoff().unwrap();
            assert!(delay >= Duration::from_millis(90), "{delay:?} below range");
            assert!(delay <= Duration::from_millis(110), "{delay:?} above range");
        }
    }

    #[test]
    fn test_exhausted_backoff_yields_none() {
        let mut backoff = ExponentialBackoff::new(BackoffPolicy {
            max_elapsed_time: Some(Duration::ZERO),
            ..no_jitter(10, 10)
        });
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_backoff(), None);
    }

    #[test]
    fn test_throttling_and_server_errors_are_retryable() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(500)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(is_retryable_error(&api_error(599)));
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!is_retryable_error(&api_error(400)));
        assert!(!is_retryable_error(&api_error(404)));
        assert!(!is_retryable_error(&api_error(409)));
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        let source: Box<dyn std::error::Error + Send + Sync> = Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(is_retryable_error(&kube::Error::Service(source)));
    }

    #[tokio::test]
    async fn test_retry_api_call_recovers_after_transient_error() {
        let calls = AtomicU32::new(0);
        let result = retry_api_call(
            || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(api_error(503))
                } else {
                    Ok("listed")
                }
            },
            "list DNSProviders",
        )
        .await
        .unwrap();

        assert_eq!(result, "listed");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_api_call_fails_fast_on_not_found() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = retry_api_call(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(api_error(404))
            },
            "get DNSRecord",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
