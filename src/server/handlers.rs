use axum::{
    Json,
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::TryFutureExt;
use serde::Serialize;

use super::AppState;
use crate::{
    core::{ApiError, CacheStatus, Cached},
    github::{ContributionsBuilder, GitHubCredentials},
    lastfm::{LastFmCredentials, MusicStatsBuilder},
};

const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

const MUSIC_CACHE_CONTROL: &str = "public, max-age=300";
const GITHUB_CACHE_CONTROL: &str = "public, max-age=60, s-maxage=60, stale-while-revalidate=30";
/// Fallback bodies must not be pinned by downstream caches.
const FALLBACK_CACHE_CONTROL: &str = "no-store";

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    cache_status: Option<CacheStatus>,
    cache_control: Option<&'static str>,
) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"Failed to serialize response"}"#,
            )
                .into_response();
        }
    };

    let mut resp = (status, bytes).into_response();
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(s) = cache_status {
        headers.insert(X_CACHE_STATUS, HeaderValue::from_static(s.as_str()));
    }
    if let Some(cc) = cache_control {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cc));
    }
    resp
}

fn error_response(message: &str, details: Option<String>, cache_status: Option<CacheStatus>) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorBody {
            error: message,
            details,
        },
        cache_status,
        cache_status.map(|_| FALLBACK_CACHE_CONTROL),
    )
}

fn log_outcome<T>(endpoint: &str, cached: &Cached<T>) {
    match &cached.error {
        Some(error) => tracing::warn!(endpoint, status = %cached.status, %error, "served degraded response"),
        None => tracing::debug!(endpoint, status = %cached.status, "served response"),
    }
}

/// GET /api/music-stats
pub(super) async fn music_stats(State(state): State<AppState>) -> Response {
    let Some(creds) = LastFmCredentials::from_secrets(state.secrets.as_ref()) else {
        let err = ApiError::Config(format!(
            "{} and {} must be set",
            LastFmCredentials::API_KEY_VAR,
            LastFmCredentials::USERNAME_VAR
        ));
        tracing::error!(error = %err, "Last.fm credentials not configured");
        return error_response("Last.fm credentials not configured", Some(err.to_string()), None);
    };

    let client = state.client.clone();
    let now = (state.clock)();
    let cached = state
        .music
        .get_with(move |previous| {
            MusicStatsBuilder::new(&client, creds)
                .previous(previous)
                .now(now)
                .fetch()
                .map_ok(|assembled| assembled.payload)
        })
        .await;
    log_outcome("music-stats", &cached);

    match cached.status {
        CacheStatus::Fallback => error_response(
            "Failed to fetch music stats",
            cached.error.as_ref().map(|e| e.to_string()),
            Some(CacheStatus::Fallback),
        ),
        status => json_response(
            StatusCode::OK,
            &*cached.data,
            Some(status),
            Some(MUSIC_CACHE_CONTROL),
        ),
    }
}

/// GET /api/github-contributions
pub(super) async fn github_contributions(State(state): State<AppState>) -> Response {
    let Some(creds) = GitHubCredentials::from_secrets(state.secrets.as_ref()) else {
        let err = ApiError::Config(format!(
            "{} and {} must be set",
            GitHubCredentials::TOKEN_VAR,
            GitHubCredentials::USERNAME_VAR
        ));
        tracing::error!(error = %err, "GitHub credentials not configured");
        return error_response("GitHub credentials not configured", Some(err.to_string()), None);
    };

    let client = state.client.clone();
    let now = (state.clock)();
    let cached = state
        .github
        .get_with(move |_previous| ContributionsBuilder::new(&client, creds).now(now).fetch())
        .await;
    log_outcome("github-contributions", &cached);

    // a zero-filled calendar keeps the page rendering; no 500 here
    let cache_control = match cached.status {
        CacheStatus::Fallback => FALLBACK_CACHE_CONTROL,
        _ => GITHUB_CACHE_CONTROL,
    };
    json_response(
        StatusCode::OK,
        &*cached.data,
        Some(cached.status),
        Some(cache_control),
    )
}

/// GET /health
pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
