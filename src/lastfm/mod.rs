//! Weekly listening statistics from the Last.fm REST API.

mod api;
mod model;
mod wire;

use chrono::{DateTime, Utc};

pub use model::{ArtistInfo, Assembled, DayScrobbles, MusicStats};

use crate::{
    config::SecretSource,
    core::{ApiClient, ApiError, client::RetryConfig},
};

/// API key and account name for Last.fm.
#[derive(Clone)]
pub struct LastFmCredentials {
    pub api_key: String,
    pub username: String,
}

impl std::fmt::Debug for LastFmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LastFmCredentials")
            .field("api_key", &"***")
            .field("username", &self.username)
            .finish()
    }
}

impl LastFmCredentials {
    pub const API_KEY_VAR: &'static str = "LASTFM_API_KEY";
    pub const USERNAME_VAR: &'static str = "LASTFM_USERNAME";

    pub fn new(api_key: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            username: username.into(),
        }
    }

    /// Look both values up; `None` if either is missing or empty.
    pub fn from_secrets(secrets: &dyn SecretSource) -> Option<Self> {
        Some(Self::new(
            secrets.get(Self::API_KEY_VAR)?,
            secrets.get(Self::USERNAME_VAR)?,
        ))
    }
}

/// A builder for one orchestrated music-stats fetch.
pub struct MusicStatsBuilder {
    client: ApiClient,
    credentials: LastFmCredentials,
    previous: Option<std::sync::Arc<MusicStats>>,
    now: Option<DateTime<Utc>>,
    retry_override: Option<RetryConfig>,
}

impl MusicStatsBuilder {
    pub fn new(client: &ApiClient, credentials: LastFmCredentials) -> Self {
        Self {
            client: client.clone(),
            credentials,
            previous: None,
            now: None,
            retry_override: None,
        }
    }

    /// Last good payload; failed calls fall back to its values.
    #[must_use]
    pub fn previous(mut self, previous: Option<std::sync::Arc<MusicStats>>) -> Self {
        self.previous = previous;
        self
    }

    /// Pin the clock used to compute the trailing week. Defaults to `Utc::now()`.
    #[must_use]
    pub const fn now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Overrides the client's retry policy for this fetch.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.retry_override = cfg;
        self
    }

    /// Run all upstream calls and assemble the payload.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` only if every upstream call failed.
    pub async fn fetch(self) -> Result<Assembled<MusicStats>, ApiError> {
        api::fetch_music_stats(
            &self.client,
            &self.credentials,
            self.previous.as_deref(),
            self.now.unwrap_or_else(Utc::now),
            self.retry_override.as_ref(),
        )
        .await
    }
}
