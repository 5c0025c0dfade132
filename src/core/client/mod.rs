//! Public client surface + builder.
//! Internals are split into `retry` (policy + status classification) and `constants` (UA + defaults).

mod constants;
pub mod retry;

use std::time::Duration;

use reqwest::{Client, Request, RequestBuilder, header::HeaderMap};
use serde::de::DeserializeOwned;
use tokio::time::{sleep, timeout};
use url::Url;

use crate::core::{
    ApiError,
    net::{self, redact_url},
};
use constants::{DEFAULT_BASE_GITHUB, DEFAULT_BASE_LASTFM, USER_AGENT};
pub use retry::{Backoff, RetryConfig};
use retry::{Verdict, classify};

/// Shared HTTP client for both upstream integrations.
///
/// Holds no per-request state; cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_lastfm: Url,
    base_github: Url,
    retry: RetryConfig,
}

impl ApiClient {
    /// Create a new builder.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /* -------- internal getters used by other modules -------- */

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }
    pub(crate) fn base_lastfm(&self) -> &Url {
        &self.base_lastfm
    }
    pub(crate) fn base_github(&self) -> &Url {
        &self.base_github
    }

    /// The client-wide retry policy.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Send `req` and buffer its body, retrying according to `retry_override`
    /// or the client's policy.
    ///
    /// One attempt covers the request, the response headers and the full body,
    /// all under `attempt_timeout`. A body that stalls or breaks off mid-way is
    /// retried like a transport error. 4xx other than 429 fail on the spot;
    /// 429 waits for `Retry-After`; 5xx, transport errors and attempt timeouts
    /// back off exponentially until the attempt budget runs out.
    ///
    /// # Errors
    ///
    /// `ApiError::Status` for an unsuccessful status, `ApiError::Timeout` when the
    /// final attempt timed out, `ApiError::Http` for transport failures.
    pub async fn send_with_retry(
        &self,
        req: RequestBuilder,
        retry_override: Option<&RetryConfig>,
    ) -> Result<String, ApiError> {
        let cfg = retry_override.unwrap_or(&self.retry);
        let attempts = cfg.attempts();
        let mut failures = 0u32;

        for attempt in 1..=attempts {
            let request = req
                .try_clone()
                .ok_or_else(|| ApiError::Data("request body cannot be replayed".into()))?
                .build()
                .map_err(|e| ApiError::Http(e.without_url()))?;
            let url = redact_url(request.url());
            let last = attempt == attempts;

            let wait = match timeout(cfg.attempt_timeout, self.exchange(request)).await {
                Err(_elapsed) => {
                    if last {
                        return Err(ApiError::Timeout { url });
                    }
                    let d = cfg.backoff.delay(failures);
                    failures += 1;
                    tracing::warn!(%url, attempt, delay_ms = d.as_millis() as u64, "attempt timed out, retrying");
                    d
                }
                Ok(Err(e)) => {
                    let e = e.without_url();
                    if last || e.is_builder() {
                        return Err(ApiError::Http(e));
                    }
                    let d = cfg.backoff.delay(failures);
                    failures += 1;
                    tracing::warn!(%url, attempt, error = %e, delay_ms = d.as_millis() as u64, "transport error, retrying");
                    d
                }
                Ok(Ok(Exchange::Body(body))) => return Ok(body),
                Ok(Ok(Exchange::Rejected {
                    status,
                    verdict,
                    headers,
                })) => match verdict {
                    Verdict::Fail => return Err(status_error(status, &url)),
                    _ if last => return Err(status_error(status, &url)),
                    Verdict::RateLimited => {
                        let d = cfg.rate_limit_wait(&headers);
                        tracing::warn!(%url, attempt, wait_ms = d.as_millis() as u64, "rate limited, honoring Retry-After");
                        d
                    }
                    _ => {
                        let d = cfg.backoff.delay(failures);
                        failures += 1;
                        tracing::warn!(%url, attempt, status, delay_ms = d.as_millis() as u64, "server error, retrying");
                        d
                    }
                },
            };
            sleep(wait).await;
        }

        // attempts() is at least 1 and the final iteration always returns
        Err(ApiError::Data("retry loop exhausted without an outcome".into()))
    }

    /// [`send_with_retry`](Self::send_with_retry), then decode the body into the wire model `T`.
    ///
    /// # Errors
    ///
    /// Everything `send_with_retry` returns, plus `ApiError::Json` for a body
    /// that does not fit `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        retry_override: Option<&RetryConfig>,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let body = self.send_with_retry(req, retry_override).await?;
        net::decode_json(&body, endpoint)
    }

    /// One attempt: send, classify, and read the body of an accepted response.
    async fn exchange(&self, request: Request) -> Result<Exchange, reqwest::Error> {
        let resp = self.http.execute(request).await?;
        let status = resp.status().as_u16();
        match classify(status) {
            Verdict::Done => Ok(Exchange::Body(resp.text().await?)),
            verdict => Ok(Exchange::Rejected {
                status,
                verdict,
                headers: resp.headers().clone(),
            }),
        }
    }
}

/// Outcome of one attempt that reached the server.
enum Exchange {
    Body(String),
    Rejected {
        status: u16,
        verdict: Verdict,
        headers: HeaderMap,
    },
}

fn status_error(status: u16, url: &str) -> ApiError {
    ApiError::Status {
        status,
        url: url.to_string(),
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Default)]
pub struct ApiClientBuilder {
    user_agent: Option<String>,
    base_lastfm: Option<Url>,
    base_github: Option<Url>,
    connect_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
}

impl ApiClientBuilder {
    /// Override the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Override the Last.fm REST root (e.g., `https://ws.audioscrobbler.com/2.0/`).
    pub fn base_lastfm(mut self, url: Url) -> Self {
        self.base_lastfm = Some(url);
        self
    }

    /// Override the GitHub GraphQL endpoint (e.g., `https://api.github.com/graphql`).
    pub fn base_github(mut self, url: Url) -> Self {
        self.base_github = Some(url);
        self
    }

    /// Set a connect timeout. Default: none.
    pub fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Replace the default retry policy.
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = Some(cfg);
        self
    }

    pub fn build(self) -> Result<ApiClient, ApiError> {
        let base_lastfm = match self.base_lastfm {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_LASTFM)?,
        };
        let base_github = match self.base_github {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_GITHUB)?,
        };

        let mut httpb =
            reqwest::Client::builder().user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(ct) = self.connect_timeout {
            httpb = httpb.connect_timeout(ct);
        }
        let http = httpb.build()?;

        Ok(ApiClient {
            http,
            base_lastfm,
            base_github,
            retry: self.retry.unwrap_or_default(),
        })
    }
}
