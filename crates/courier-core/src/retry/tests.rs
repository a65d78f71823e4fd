//! Integration tests for the retry module
//!
//! These tests drive the executor with the standard policy end to end:
//! strategies, retry budgets, retry-after hints, endpoint failover and
//! observers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::request::Request;
use crate::response::Response;
use crate::retry::error::RetryError;
use crate::retry::executor::RetryExecutorBuilder;
use crate::retry::fault::{Fault, TransportError};
use crate::retry::observer::StatsObserver;
use crate::retry::standard::StandardRetryPolicy;
use crate::trace::TraceScope;
use crate::types::{RetryPolicyConfig, RetryStrategy};

/// Create a test policy with short, deterministic delays
fn quick_policy(max_attempts: u32, strategy: RetryStrategy) -> RetryPolicyConfig {
    RetryPolicyConfig {
        max_attempts,
        strategy,
        backoff_multiplier: 2.0,
        initial_delay_ms: 10,
        max_delay_ms: 1000,
        jitter: false,
        ..RetryPolicyConfig::default()
    }
}

// ============================================================================
// Retry budget
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_response_returned_after_budget_exhausted() {
    let policy = StandardRetryPolicy::new(quick_policy(3, RetryStrategy::FixedDelay));
    let observer = Arc::new(StatsObserver::new());
    let sends = Arc::new(AtomicU32::new(0));
    let mut request = Request::new("read", "GET", "/dbs/app");

    let result = RetryExecutorBuilder::new()
        .with_observer(observer.clone())
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("read"),
            &CancellationToken::new(),
            |_req, _scope| {
                let sends = sends.clone();
                async move {
                    let n = sends.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(Response::new(503, format!("busy {}", n)))
                }
            },
        )
        .await;

    let response = result.unwrap();
    assert_eq!(response.status(), 503);
    assert_eq!(response.payload(), b"busy 3");
    assert_eq!(sends.load(Ordering::SeqCst), 3);
    assert_eq!(observer.attempt_starts(), 3);
    assert_eq!(observer.retries(), 2);
    assert_eq!(observer.gave_up(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_transport_fault_raised_after_budget_exhausted() {
    let policy = StandardRetryPolicy::new(quick_policy(2, RetryStrategy::None));
    let observer = Arc::new(StatsObserver::new());
    let mut request = Request::new("read", "GET", "/dbs/app");

    let result = RetryExecutorBuilder::new()
        .with_observer(observer.clone())
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("read"),
            &CancellationToken::new(),
            |_req, _scope| async {
                Err::<Response, _>(Fault::from(TransportError::connect(
                    "https://east.example",
                    "refused",
                )))
            },
        )
        .await;

    match result {
        Err(RetryError::Fault(Fault::Transport(TransportError::Connect { endpoint, message }))) => {
            assert_eq!(endpoint, "https://east.example");
            assert_eq!(message, "refused");
        }
        other => panic!("expected connect fault, got {:?}", other),
    }
    assert_eq!(observer.attempt_starts(), 2);
    assert_eq!(observer.faults(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_status_single_attempt() {
    let policy = StandardRetryPolicy::new(quick_policy(5, RetryStrategy::FixedDelay));
    let sends = AtomicU32::new(0);
    let mut request = Request::new("read", "GET", "/dbs/app");

    let result = RetryExecutorBuilder::new()
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("read"),
            &CancellationToken::new(),
            |_req, _scope| {
                sends.fetch_add(1, Ordering::SeqCst);
                async { Ok(Response::new(400, "bad request")) }
            },
        )
        .await;

    assert_eq!(result.unwrap().status(), 400);
    assert_eq!(sends.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Backoff timing
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_between_attempts() {
    let policy = StandardRetryPolicy::new(quick_policy(4, RetryStrategy::ExponentialBackoff));
    let sent_at = Arc::new(Mutex::new(Vec::new()));
    let start = Instant::now();
    let mut request = Request::new("read", "GET", "/dbs/app");

    let result = RetryExecutorBuilder::new()
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("read"),
            &CancellationToken::new(),
            |_req, _scope| {
                let sent_at = sent_at.clone();
                async move {
                    let mut sent_at = sent_at.lock().unwrap();
                    sent_at.push(start.elapsed());
                    if sent_at.len() < 3 {
                        Ok(Response::status_only(500))
                    } else {
                        Ok(Response::status_only(201))
                    }
                }
            },
        )
        .await;

    assert_eq!(result.unwrap().status(), 201);
    let sent_at = sent_at.lock().unwrap();
    assert_eq!(sent_at.len(), 3);
    // 10ms after the first failure, 20ms after the second
    let first_gap = sent_at[1] - sent_at[0];
    let second_gap = sent_at[2] - sent_at[1];
    assert!(first_gap >= Duration::from_millis(10) && first_gap < Duration::from_millis(15));
    assert!(second_gap >= Duration::from_millis(20) && second_gap < Duration::from_millis(25));
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_hint_drives_backoff() {
    let policy = StandardRetryPolicy::new(quick_policy(3, RetryStrategy::FixedDelay));
    let sends = Arc::new(AtomicU32::new(0));
    let start = Instant::now();
    let mut request = Request::new("query", "POST", "/dbs/app/docs");

    let result = RetryExecutorBuilder::new()
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("query"),
            &CancellationToken::new(),
            |_req, _scope| {
                let sends = sends.clone();
                async move {
                    if sends.fetch_add(1, Ordering::SeqCst) == 0 {
                        Ok(Response::status_only(429).with_retry_after(Duration::from_millis(300)))
                    } else {
                        Ok(Response::status_only(200))
                    }
                }
            },
        )
        .await;

    assert!(result.unwrap().is_success());
    assert!(start.elapsed() >= Duration::from_millis(300));
    assert!(start.elapsed() < Duration::from_millis(310));
}

// ============================================================================
// Endpoint failover
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failover_rotates_endpoint_per_transport_fault() {
    let policy = StandardRetryPolicy::new(RetryPolicyConfig {
        endpoints: vec![
            "https://east.example".to_string(),
            "https://west.example".to_string(),
        ],
        ..quick_policy(3, RetryStrategy::None)
    });
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut request = Request::new("read", "GET", "/dbs/app");

    let result = RetryExecutorBuilder::new()
        .build()
        .execute(
            &mut request,
            &policy,
            &TraceScope::root("read"),
            &CancellationToken::new(),
            |req, _scope| {
                let seen = seen.clone();
                async move {
                    let endpoint = req.endpoint().unwrap_or_default().to_string();
                    seen.lock().unwrap().push(endpoint.clone());
                    if endpoint == "https://east.example" {
                        Err(Fault::from(TransportError::connect(endpoint, "refused")))
                    } else {
                        Ok(Response::new(200, "from west"))
                    }
                }
            },
        )
        .await;

    assert_eq!(result.unwrap().payload(), b"from west");
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["https://east.example", "https://west.example"]
    );
    // The hook's routing decision stays visible on the caller's request
    assert_eq!(request.endpoint(), Some("https://west.example"));
}
