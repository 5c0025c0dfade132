mod common;

use std::time::{Duration, Instant};

use httpmock::{Method::GET, MockServer};
use portfolio_api::{ApiError, Backoff, RetryConfig};

use common::{Raw, Step, client_for, client_for_base, fast_retry, raw_upstream, scripted};

#[tokio::test]
async fn retries_on_persistent_5xx_until_budget_is_spent() {
    let server = MockServer::start();
    let fail_mock = server.mock(|when, then| {
        when.method(GET).path("/flaky");
        then.status(503).body("Service Unavailable");
    });

    let client = client_for(&server);
    let req = reqwest::Client::new().get(server.url("/flaky"));
    let result = client.send_with_retry(req, None).await;

    // fast_retry() allows 3 attempts in total
    fail_mock.assert_calls(3);
    match result {
        Err(ApiError::Status { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected a Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_errors_fail_fast() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/denied");
        then.status(403).body("Forbidden");
    });

    let client = client_for(&server);
    let req = reqwest::Client::new().get(server.url("/denied"));
    let result = client.send_with_retry(req, None).await;

    mock.assert_calls(1);
    assert!(matches!(result, Err(ApiError::Status { status: 403, .. })));
}

#[tokio::test]
async fn recovers_after_a_transient_5xx() {
    let upstream = scripted(vec![Step::new(502, "bad gateway"), Step::new(200, "ok")]).await;
    let client = client_for_base(&upstream.base_url);

    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await
        .unwrap();

    assert_eq!(body, "ok");
    assert_eq!(upstream.hits(), 2);
}

#[tokio::test]
async fn honors_retry_after_on_429() {
    let upstream = scripted(vec![
        Step::new(429, "slow down").header("retry-after", "2"),
        Step::new(200, "ok"),
    ])
    .await;
    let client = client_for_base(&upstream.base_url);

    let started = Instant::now();
    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await
        .unwrap();
    let waited = started.elapsed();

    assert_eq!(body, "ok");
    assert_eq!(upstream.hits(), 2);
    assert!(waited >= Duration::from_millis(1900), "waited only {waited:?}");
    assert!(waited < Duration::from_secs(5), "waited {waited:?}");
}

#[tokio::test]
async fn rate_limit_without_header_uses_default_wait() {
    let upstream = scripted(vec![Step::new(429, "slow down"), Step::new(200, "ok")]).await;
    let cfg = RetryConfig {
        default_retry_after: Duration::from_millis(300),
        ..fast_retry()
    };
    let client = client_for_base(&upstream.base_url);

    let started = Instant::now();
    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), Some(&cfg))
        .await
        .unwrap();

    assert_eq!(body, "ok");
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn rate_limit_does_not_grow_the_backoff() {
    // Two 429s then a 503 then success: the 503 must wait `base`, not `base * 4`.
    let upstream = scripted(vec![
        Step::new(429, "").header("retry-after", "0"),
        Step::new(429, "").header("retry-after", "0"),
        Step::new(503, ""),
        Step::new(200, "ok"),
    ])
    .await;
    let cfg = RetryConfig {
        max_attempts: 4,
        backoff: Backoff::Exponential {
            base: Duration::from_millis(200),
            factor: 4.0,
            max: Duration::from_secs(10),
        },
        ..fast_retry()
    };
    let client = client_for_base(&upstream.base_url);

    let started = Instant::now();
    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), Some(&cfg))
        .await
        .unwrap();
    let waited = started.elapsed();

    assert_eq!(body, "ok");
    assert_eq!(upstream.hits(), 4);
    assert!(waited >= Duration::from_millis(200), "waited only {waited:?}");
    assert!(waited < Duration::from_millis(800), "backoff grew: {waited:?}");
}

#[tokio::test]
async fn endless_rate_limiting_still_terminates() {
    let upstream = scripted(vec![Step::new(429, "").header("retry-after", "0")]).await;
    let client = client_for_base(&upstream.base_url);

    let result = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await;

    assert!(matches!(result, Err(ApiError::Status { status: 429, .. })));
    assert_eq!(upstream.hits(), 3);
}

#[tokio::test]
async fn slow_attempts_time_out_and_are_retried() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/slow");
        then.status(200).delay(Duration::from_millis(800)).body("late");
    });

    let cfg = RetryConfig {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(100),
        ..fast_retry()
    };
    let client = client_for(&server);
    let started = Instant::now();
    let result = client
        .send_with_retry(reqwest::Client::new().get(server.url("/slow")), Some(&cfg))
        .await;
    let waited = started.elapsed();

    assert!(matches!(result, Err(ApiError::Timeout { .. })), "got {result:?}");
    // two attempts, each cut off well before the upstream answers
    assert!(waited >= Duration::from_millis(200), "waited only {waited:?}");
    assert!(waited < Duration::from_millis(1500), "attempts were not cut off: {waited:?}");
}

#[tokio::test]
async fn disabled_retry_makes_one_attempt() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/down");
        then.status(500);
    });

    let cfg = RetryConfig {
        enabled: false,
        ..fast_retry()
    };
    let client = client_for(&server);
    let result = client
        .send_with_retry(reqwest::Client::new().get(server.url("/down")), Some(&cfg))
        .await;

    mock.assert_calls(1);
    assert!(result.is_err());
}

#[tokio::test]
async fn errors_do_not_leak_api_keys() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/2.0/");
        then.status(401);
    });

    let client = client_for(&server);
    let req = reqwest::Client::new().get(server.url("/2.0/?method=user.getinfo&api_key=very-secret"));
    let err = client.send_with_retry(req, None).await.unwrap_err();

    let shown = err.to_string();
    assert!(shown.contains("401"));
    assert!(!shown.contains("very-secret"), "{shown}");
}

const OK_REPLY: &str =
    "HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok";

#[tokio::test]
async fn dropped_connection_is_retried() {
    let upstream = raw_upstream(vec![Raw::Hangup, Raw::Send(OK_REPLY)]).await;
    let client = client_for_base(&upstream.base_url);

    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await
        .unwrap();

    assert_eq!(body, "ok");
    assert_eq!(upstream.connections(), 2);
}

#[tokio::test]
async fn persistent_transport_failure_is_an_http_error() {
    let upstream = raw_upstream(vec![Raw::Hangup]).await;
    let client = client_for_base(&upstream.base_url);

    let result = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await;

    assert!(matches!(result, Err(ApiError::Http(_))), "got {result:?}");
    assert_eq!(upstream.connections(), 3);
}

#[tokio::test]
async fn truncated_body_is_retried() {
    let upstream = raw_upstream(vec![
        Raw::Send("HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"partial\":"),
        Raw::Send(OK_REPLY),
    ])
    .await;
    let client = client_for_base(&upstream.base_url);

    let body = client
        .send_with_retry(reqwest::Client::new().get(upstream.url("/x")), None)
        .await
        .unwrap();

    assert_eq!(body, "ok");
    assert_eq!(upstream.connections(), 2);
}

#[tokio::test]
async fn stalled_body_times_out_within_budget() {
    let upstream = raw_upstream(vec![Raw::Stall(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 100\r\n\r\n{\"data\":",
    )])
    .await;
    let cfg = RetryConfig {
        max_attempts: 2,
        attempt_timeout: Duration::from_millis(200),
        ..fast_retry()
    };
    let client = client_for_base(&upstream.base_url);

    let started = Instant::now();
    let result = tokio::time::timeout(
        Duration::from_secs(3),
        client.send_with_retry(reqwest::Client::new().get(upstream.url("/x")), Some(&cfg)),
    )
    .await
    .expect("a stalled body must not hang the call");
    let waited = started.elapsed();

    assert!(matches!(result, Err(ApiError::Timeout { .. })), "got {result:?}");
    assert!(waited >= Duration::from_millis(400), "waited only {waited:?}");
    assert_eq!(upstream.connections(), 2);
}
