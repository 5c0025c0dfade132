//! HTTP surface: the two proxy endpoints and a health check.

mod handlers;

use std::sync::Arc;

use axum::{Router, routing::get};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

use crate::{
    config::{CacheSettings, SecretSource},
    core::{ApiClient, ResponseCache},
    github::ContributionsResponse,
    lastfm::MusicStats,
};

/// Source of "now" for the orchestrators.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Application state shared across HTTP handlers.
///
/// Built once at start-up; owns the per-integration caches.
#[derive(Clone)]
pub struct AppState {
    pub client: ApiClient,
    pub music: ResponseCache<MusicStats>,
    pub github: ResponseCache<ContributionsResponse>,
    pub secrets: Arc<dyn SecretSource>,
    pub clock: Clock,
}

impl AppState {
    pub fn new(client: ApiClient, secrets: Arc<dyn SecretSource>, cache: CacheSettings) -> Self {
        Self {
            client,
            music: ResponseCache::new("music_stats", cache.music_ttl),
            github: ResponseCache::new("github_contributions", cache.github_ttl),
            secrets,
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock (tests pin the trailing week with this).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Build application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/music-stats", get(handlers::music_stats))
        .route("/api/github-contributions", get(handlers::github_contributions))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
