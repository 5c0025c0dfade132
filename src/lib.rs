//! portfolio-api: caching, retrying proxy for a portfolio site's live widgets.
//!
//! Two endpoints, `GET /api/music-stats` (Last.fm) and
//! `GET /api/github-contributions` (GitHub GraphQL), share one resilience stack:
//! a retrying HTTP executor, per-integration fetch orchestration with
//! per-call fallbacks, and a single-flight response cache that serves stale
//! data when a refresh fails.

pub mod config;
pub mod core;
pub mod github;
pub mod lastfm;
pub mod server;

pub use config::{CacheSettings, EnvSecrets, SecretSource, StaticSecrets};
pub use crate::core::{ApiClient, ApiError, Backoff, CacheStatus, Cached, ResponseCache, RetryConfig};
pub use github::{ContributionsBuilder, ContributionsResponse, GitHubCredentials};
pub use lastfm::{Assembled, LastFmCredentials, MusicStats, MusicStatsBuilder};
pub use server::{AppState, router};
