//! Contribution calendar from the GitHub GraphQL API.

mod api;
mod model;
mod wire;

use chrono::{DateTime, Utc};

pub use model::{
    ContributionCalendar, ContributionDay, ContributionWeek, ContributionsCollection,
    ContributionsData, ContributionsResponse, ContributionsUser,
};

use crate::{
    config::SecretSource,
    core::{ApiClient, ApiError, client::RetryConfig},
};

/// Personal access token and login for GitHub.
#[derive(Clone)]
pub struct GitHubCredentials {
    pub token: String,
    pub username: String,
}

impl std::fmt::Debug for GitHubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubCredentials")
            .field("token", &"***")
            .field("username", &self.username)
            .finish()
    }
}

impl GitHubCredentials {
    pub const TOKEN_VAR: &'static str = "GH_TOKEN";
    pub const USERNAME_VAR: &'static str = "GH_USERNAME";

    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }

    /// Look both values up; `None` if either is missing or empty.
    pub fn from_secrets(secrets: &dyn SecretSource) -> Option<Self> {
        Some(Self::new(
            secrets.get(Self::TOKEN_VAR)?,
            secrets.get(Self::USERNAME_VAR)?,
        ))
    }
}

/// A builder for the contribution-calendar query.
pub struct ContributionsBuilder {
    client: ApiClient,
    credentials: GitHubCredentials,
    now: Option<DateTime<Utc>>,
    retry_override: Option<RetryConfig>,
}

impl ContributionsBuilder {
    pub fn new(client: &ApiClient, credentials: GitHubCredentials) -> Self {
        Self {
            client: client.clone(),
            credentials,
            now: None,
            retry_override: None,
        }
    }

    /// Pin the clock used for the 365-day window. Defaults to `Utc::now()`.
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

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails after retries, the body does not
    /// validate, or GraphQL reports an error.
    pub async fn fetch(self) -> Result<ContributionsResponse, ApiError> {
        api::fetch_contributions(
            &self.client,
            &self.credentials,
            self.now.unwrap_or_else(Utc::now),
            self.retry_override.as_ref(),
        )
        .await
    }
}
