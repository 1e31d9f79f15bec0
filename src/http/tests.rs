//! Tests for the HTTP module

use super::*;
use crate::auth::{ClientCredentials, TokenManager};
use crate::error::Error;
use crate::types::BackoffType;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<RequestSummary>>,
}

impl RequestObserver for RecordingObserver {
    fn on_request(&self, summary: &RequestSummary) {
        self.seen.lock().unwrap().push(summary.clone());
    }
}

impl RecordingObserver {
    fn statuses(&self) -> Vec<(reqwest::Method, Option<u16>)> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| (s.method.clone(), s.status))
            .collect()
    }
}

fn fast_backoff() -> BackoffPolicy {
    BackoffPolicy::new(
        BackoffType::Exponential,
        Duration::from_millis(10),
        Duration::from_millis(200),
    )
}

fn status_error(status: u16) -> Error {
    Error::http_status(status, "https://api.example.com/items", "")
}

// ============================================================================
// Backoff Tests
// ============================================================================

#[test]
fn test_exponential_backoff_doubles() {
    let policy = BackoffPolicy::new(
        BackoffType::Exponential,
        Duration::from_millis(100),
        Duration::from_secs(60),
    );
    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    assert_eq!(policy.delay_for(3), Duration::from_millis(800));
}

#[test]
fn test_backoff_capped_at_max() {
    let policy = BackoffPolicy::new(
        BackoffType::Exponential,
        Duration::from_secs(1),
        Duration::from_secs(5),
    );
    assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    assert_eq!(policy.delay_for(3), Duration::from_secs(5));
    assert_eq!(policy.delay_for(200), Duration::from_secs(5));
}

#[test]
fn test_constant_and_linear_backoff() {
    let constant = BackoffPolicy::new(
        BackoffType::Constant,
        Duration::from_millis(50),
        Duration::from_secs(1),
    );
    assert_eq!(constant.delay_for(0), Duration::from_millis(50));
    assert_eq!(constant.delay_for(7), Duration::from_millis(50));

    let linear = BackoffPolicy::new(
        BackoffType::Linear,
        Duration::from_millis(50),
        Duration::from_secs(1),
    );
    assert_eq!(linear.delay_for(0), Duration::from_millis(50));
    assert_eq!(linear.delay_for(2), Duration::from_millis(150));
}

#[test_case(BackoffType::Constant ; "constant")]
#[test_case(BackoffType::Linear ; "linear")]
#[test_case(BackoffType::Exponential ; "exponential")]
fn test_backoff_is_non_decreasing(backoff_type: BackoffType) {
    let policy = BackoffPolicy::new(backoff_type, Duration::from_millis(3), Duration::from_secs(3600));
    let delays: Vec<Duration> = (0..64).map(|k| policy.delay_for(k)).collect();
    assert!(delays.windows(2).all(|w| w[0] <= w[1]), "{delays:?}");
}

#[test]
fn test_backoff_defaults() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.backoff_type, BackoffType::Exponential);
    assert_eq!(policy.initial, DEFAULT_INITIAL_BACKOFF);
    assert_eq!(policy.max, DEFAULT_MAX_BACKOFF);
}

// ============================================================================
// Retry Budget Tests
// ============================================================================

#[test]
fn test_retry_budget_defaults() {
    let budget = RetryBudget::default();
    assert_eq!(budget.timeout, Duration::from_secs(7200));
    assert_eq!(
        budget.retry_on.iter().copied().collect::<Vec<_>>(),
        vec![408, 429, 502, 503, 504, 520]
    );
}

#[test_case(408, true ; "request timeout")]
#[test_case(429, true ; "too many requests")]
#[test_case(502, true ; "bad gateway")]
#[test_case(503, true ; "service unavailable")]
#[test_case(504, true ; "gateway timeout")]
#[test_case(520, true ; "unknown upstream error")]
#[test_case(400, false ; "bad request")]
#[test_case(401, false ; "unauthorized")]
#[test_case(404, false ; "not found")]
#[test_case(500, false ; "internal server error")]
fn test_default_retryable_statuses(status: u16, retryable: bool) {
    assert_eq!(RetryBudget::default().is_retryable_status(status), retryable);
}

#[test]
fn test_retry_budget_builders() {
    let budget = RetryBudget::default()
        .with_timeout(Duration::from_secs(5))
        .with_retry_on([500]);
    assert_eq!(budget.timeout, Duration::from_secs(5));
    assert!(budget.is_retryable_status(500));
    assert!(!budget.is_retryable_status(503));
}

// ============================================================================
// Retry Executor Tests
// ============================================================================

#[tokio::test]
async fn test_execute_success_first_attempt() {
    let executor = RetryExecutor::new(fast_backoff());
    let mut calls = 0;

    let result = executor
        .execute(&RetryBudget::default(), |n| {
            calls += 1;
            async move { Ok::<_, Error>(n) }
        })
        .await
        .unwrap();

    assert_eq!(result, 1);
    assert_eq!(calls, 1);
}

#[tokio::test]
async fn test_execute_retries_429_until_success() {
    let executor = RetryExecutor::new(fast_backoff());
    let mut calls = 0;

    let result = executor
        .execute(&RetryBudget::default(), |n| {
            calls += 1;
            async move {
                if n <= 2 {
                    Err(status_error(429))
                } else {
                    Ok(200)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(result, 200);
    assert_eq!(calls, 3);
}

#[test_case(404 ; "not found")]
#[test_case(500 ; "internal server error")]
#[test_case(401 ; "unauthorized")]
#[tokio::test]
async fn test_execute_fatal_status_single_attempt(status: u16) {
    let executor = RetryExecutor::new(fast_backoff());
    let mut calls = 0;

    let err = executor
        .execute(&RetryBudget::default(), |_| {
            calls += 1;
            async move { Err::<(), _>(status_error(status)) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 1);
    assert!(matches!(err, Error::HttpStatus { status: s, .. } if s == status));
}

#[tokio::test]
async fn test_execute_auth_error_not_retried() {
    let executor = RetryExecutor::new(fast_backoff());
    let mut calls = 0;

    let err = executor
        .execute(&RetryBudget::default(), |_| {
            calls += 1;
            async move { Err::<(), _>(Error::token_response("missing access_token")) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 1);
    assert!(err.is_auth());
}

#[tokio::test]
async fn test_execute_retries_transport_errors() {
    let executor = RetryExecutor::new(fast_backoff());

    let result = executor
        .execute(&RetryBudget::default(), |n| async move {
            if n == 1 {
                // Nothing listens on port 1
                let e = reqwest::get("http://127.0.0.1:1/").await.unwrap_err();
                Err(Error::Http(e))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

    assert_eq!(result, 2);
}

#[tokio::test]
async fn test_execute_budget_exceeded_carries_last_response() {
    let executor = RetryExecutor::new(fast_backoff());
    let budget = RetryBudget::default().with_timeout(Duration::from_millis(100));
    let mut calls = 0u32;

    let err = executor
        .execute(&budget, |_| {
            calls += 1;
            async move { Err::<(), _>(Error::http_status(503, "https://x/", "try later")) }
        })
        .await
        .unwrap_err();

    assert!(calls >= 2);
    match &err {
        Error::BudgetExceeded {
            attempts,
            elapsed_ms,
            last,
        } => {
            assert_eq!(*attempts, calls);
            assert!(*elapsed_ms >= 100);
            assert!(matches!(**last, Error::HttpStatus { status: 503, ref body, .. } if body == "try later"));
        }
        other => panic!("Expected BudgetExceeded, got {other:?}"),
    }
    assert_eq!(err.last_status(), Some(503));
}

#[tokio::test]
async fn test_execute_zero_budget_gives_up_after_one_attempt() {
    let executor = RetryExecutor::new(fast_backoff());
    let budget = RetryBudget::default().with_timeout(Duration::ZERO);
    let mut calls = 0;

    let err = executor
        .execute(&budget, |_| {
            calls += 1;
            async move { Err::<(), _>(status_error(502)) }
        })
        .await
        .unwrap_err();

    assert_eq!(calls, 1);
    assert_eq!(err.last_status(), Some(502));
}

#[tokio::test]
async fn test_execute_delay_never_overshoots_window() {
    let executor = RetryExecutor::new(BackoffPolicy::new(
        BackoffType::Exponential,
        Duration::from_secs(30),
        Duration::from_secs(60),
    ));
    let budget = RetryBudget::default().with_timeout(Duration::from_millis(50));
    let started = Instant::now();

    let err = executor
        .execute(&budget, |_| async { Err::<(), _>(status_error(504)) })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::BudgetExceeded { attempts: 2, .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_execute_waits_at_least_the_backoff_between_attempts() {
    let policy = fast_backoff();
    let executor = RetryExecutor::new(policy);
    let mut starts = Vec::new();

    executor
        .execute(&RetryBudget::default(), |n| {
            starts.push(Instant::now());
            async move {
                if n < 4 {
                    Err(status_error(503))
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(starts.len(), 4);
    for (k, pair) in starts.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= policy.delay_for(k as u32),
            "gap {k} was {gap:?}, expected at least {:?}",
            policy.delay_for(k as u32)
        );
    }
}

// ============================================================================
// Authenticated Fetcher Tests
// ============================================================================

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "abc",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

fn fetcher_for(server: &MockServer, observer: Arc<RecordingObserver>) -> AuthenticatedFetcher {
    let client = reqwest::Client::new();
    let tokens = TokenManager::with_client(
        ClientCredentials::new(
            format!("{}/oauth2/access_token", server.uri()),
            "id",
            "secret",
        ),
        client.clone(),
        observer.clone(),
    );
    AuthenticatedFetcher::new(client, tokens, RetryExecutor::new(fast_backoff()), observer)
}

#[tokio::test]
async fn test_fetch_attaches_authorization_header() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/courses"))
        .and(header("Authorization", "jwt abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, Arc::new(RecordingObserver::default()));
    let response = fetcher
        .fetch(
            &format!("{}/api/courses", server.uri()),
            None,
            &RetryBudget::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_fetch_sends_query_params() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("q", "rust"))
        .and(query_param("page_size", "50"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, Arc::new(RecordingObserver::default()));
    let params = vec![
        ("q".to_string(), "rust".to_string()),
        ("page_size".to_string(), "50".to_string()),
    ];
    fetcher
        .fetch(
            &format!("{}/api/search", server.uri()),
            Some(&params),
            &RetryBudget::default(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetch_retries_and_observes_every_attempt() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let observer = Arc::new(RecordingObserver::default());
    let fetcher = fetcher_for(&server, observer.clone());
    let response = fetcher
        .fetch(
            &format!("{}/api/flaky", server.uri()),
            None,
            &RetryBudget::default(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(
        observer.statuses(),
        vec![
            (reqwest::Method::POST, Some(200)),
            (reqwest::Method::GET, Some(503)),
            (reqwest::Method::GET, Some(503)),
            (reqwest::Method::GET, Some(200)),
        ]
    );
}

#[tokio::test]
async fn test_fetch_fatal_status_surfaces_body() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such course"))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, Arc::new(RecordingObserver::default()));
    let err = fetcher
        .fetch(
            &format!("{}/api/missing", server.uri()),
            None,
            &RetryBudget::default(),
        )
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body, url } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such course");
            assert!(url.ends_with("/api/missing"));
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_token_failure_skips_resource_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "nope"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = fetcher_for(&server, Arc::new(RecordingObserver::default()));
    let err = fetcher
        .fetch(
            &format!("{}/api/courses", server.uri()),
            None,
            &RetryBudget::default(),
        )
        .await
        .unwrap_err();

    assert!(err.is_auth(), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_fatal_status_reports_unreadable_body() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let server = MockServer::start().await;
    mount_token(&server).await;

    // Promises 100 bytes of body, sends 5, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 100\r\n\r\nshort")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let fetcher = fetcher_for(&server, Arc::new(RecordingObserver::default()));
    let err = fetcher
        .fetch(
            &format!("http://{addr}/api/truncated"),
            None,
            &RetryBudget::default(),
        )
        .await
        .unwrap_err();

    match err {
        Error::HttpStatus { status, body, .. } => {
            assert_eq!(status, 404);
            assert!(body.starts_with("<body unavailable: "), "body was {body:?}");
        }
        other => panic!("Expected HttpStatus, got {other:?}"),
    }
}
