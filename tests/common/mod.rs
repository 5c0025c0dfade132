#![allow(dead_code)]

use std::{
    fs,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use httpmock::{Method::GET, Method::POST, Mock, MockServer};
use portfolio_api::{ApiClient, Backoff, RetryConfig, StaticSecrets};
use serde_json::json;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use url::Url;

pub const API_KEY: &str = "test-api-key";
pub const LASTFM_USER: &str = "listener";
pub const GH_TOKEN: &str = "gh-test-token";
pub const GH_USER: &str = "octocat";

pub fn fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{name}.json"));
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", path.display(), e))
}

/// Wednesday, so the trailing week runs Thu 2025-05-29 .. Wed 2025-06-04.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap()
}

/// Unix start of each day in the trailing week of `fixed_now()`, oldest first.
pub fn week_starts() -> Vec<i64> {
    (29..=31)
        .map(|d| NaiveDate::from_ymd_opt(2025, 5, d).unwrap())
        .chain((1..=4).map(|d| NaiveDate::from_ymd_opt(2025, 6, d).unwrap()))
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp())
        .collect()
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        backoff: Backoff::Fixed(Duration::from_millis(1)),
        attempt_timeout: Duration::from_secs(5),
        default_retry_after: Duration::from_millis(50),
        ..RetryConfig::default()
    }
}

pub fn client_for_base(base: &str) -> ApiClient {
    client_with(base, fast_retry())
}

pub fn client_with(base: &str, retry: RetryConfig) -> ApiClient {
    ApiClient::builder()
        .base_lastfm(Url::parse(&format!("{base}/2.0/")).unwrap())
        .base_github(Url::parse(&format!("{base}/graphql")).unwrap())
        .retry_config(retry)
        .build()
        .unwrap()
}

pub fn client_for(server: &MockServer) -> ApiClient {
    client_for_base(&server.base_url())
}

pub fn all_secrets() -> StaticSecrets {
    StaticSecrets::new()
        .with("LASTFM_API_KEY", API_KEY)
        .with("LASTFM_USERNAME", LASTFM_USER)
        .with("GH_TOKEN", GH_TOKEN)
        .with("GH_USERNAME", GH_USER)
}

/* ---------- Last.fm mocks ---------- */

pub fn recent_tracks_body(n: usize) -> String {
    let tracks: Vec<_> = (0..n)
        .map(|i| json!({ "name": format!("Track {i}"), "artist": { "#text": "Someone" } }))
        .collect();
    json!({ "recenttracks": { "track": tracks, "@attr": { "total": n.to_string() } } }).to_string()
}

pub fn mock_user_info(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/2.0/")
            .query_param("method", "user.getinfo")
            .query_param("api_key", API_KEY)
            .query_param("user", LASTFM_USER);
        then.status(200)
            .header("content-type", "application/json")
            .body(fixture("lastfm_user_getinfo"));
    })
}

pub fn mock_top_artists(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/2.0/")
            .query_param("method", "user.gettopartists")
            .query_param("period", "7day");
        then.status(200)
            .header("content-type", "application/json")
            .body(fixture("lastfm_top_artists"));
    })
}

pub fn mock_day(server: &MockServer, from: i64, scrobbles: usize) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/2.0/")
            .query_param("method", "user.getrecenttracks")
            .query_param("from", from.to_string())
            .query_param("to", (from + 86_399).to_string());
        then.status(200)
            .header("content-type", "application/json")
            .body(recent_tracks_body(scrobbles));
    })
}

pub fn mock_day_status(server: &MockServer, from: i64, status: u16) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/2.0/")
            .query_param("method", "user.getrecenttracks")
            .query_param("from", from.to_string());
        then.status(status).body("upstream unavailable");
    })
}

/// The full happy-path week: `[1, 0, 3, 2, 0, 5, 4]` scrobbles, oldest first.
pub fn mock_week(server: &MockServer) -> Vec<Mock<'_>> {
    let counts = [1, 0, 3, 2, 0, 5, 4];
    let mut mocks = vec![mock_user_info(server), mock_top_artists(server)];
    mocks.extend(
        week_starts()
            .into_iter()
            .zip(counts)
            .map(|(from, n)| mock_day(server, from, n)),
    );
    mocks
}

/* ---------- GitHub mocks ---------- */

pub fn mock_github(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/graphql")
            .header("authorization", format!("Bearer {GH_TOKEN}"));
        then.status(200)
            .header("content-type", "application/json")
            .body(fixture("github_contributions"));
    })
}

/* ---------- scripted upstream ---------- */

/// One canned response of a [`Scripted`] upstream.
#[derive(Clone)]
pub struct Step {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

impl Step {
    pub fn new(status: u16, body: &'static str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// Upstream that answers with `steps` in order, repeating the last one.
pub struct Scripted {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
}

impl Scripted {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.base_url)).unwrap()
    }
}

pub async fn scripted(steps: Vec<Step>) -> Scripted {
    assert!(!steps.is_empty());
    let steps = Arc::new(steps);
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let app = Router::new().fallback(move || {
        let steps = Arc::clone(&steps);
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let step = &steps[n.min(steps.len() - 1)];
            let mut resp = (StatusCode::from_u16(step.status).unwrap(), step.body).into_response();
            for (name, value) in &step.headers {
                resp.headers_mut().insert(
                    HeaderName::from_static(*name),
                    HeaderValue::from_static(*value),
                );
            }
            resp
        }
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Scripted {
        base_url: format!("http://{addr}"),
        hits,
    }
}

/* ---------- raw TCP upstream ---------- */

/// What a [`RawUpstream`] does with one connection.
#[derive(Clone, Copy, Debug)]
pub enum Raw {
    /// Read the request, then close without answering.
    Hangup,
    /// Write these bytes, then keep the connection open and silent.
    Stall(&'static str),
    /// Write these bytes, then close.
    Send(&'static str),
}

/// Upstream below HTTP: handles connections per `script`, repeating the last entry.
pub struct RawUpstream {
    pub base_url: String,
    connections: Arc<AtomicUsize>,
}

impl RawUpstream {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.base_url)).unwrap()
    }
}

async fn read_request(sock: &mut TcpStream) {
    let mut buf = [0u8; 4096];
    let _ = sock.read(&mut buf).await;
}

pub async fn raw_upstream(script: Vec<Raw>) -> RawUpstream {
    assert!(!script.is_empty());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let action = script[n.min(script.len() - 1)];
            tokio::spawn(async move {
                read_request(&mut sock).await;
                match action {
                    Raw::Hangup => {}
                    Raw::Stall(bytes) => {
                        let _ = sock.write_all(bytes.as_bytes()).await;
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Raw::Send(bytes) => {
                        let _ = sock.write_all(bytes.as_bytes()).await;
                        let _ = sock.shutdown().await;
                    }
                }
            });
        }
    });

    RawUpstream {
        base_url: format!("http://{addr}"),
        connections,
    }
}
