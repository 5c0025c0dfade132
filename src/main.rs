//! portfolio-api - HTTP entry point
//!
//! Serves `/api/music-stats`, `/api/github-contributions` and `/health`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use portfolio_api::{ApiClient, AppState, Backoff, CacheSettings, EnvSecrets, RetryConfig, router};

/// Command-line arguments for portfolio-api
#[derive(Parser, Debug)]
#[command(name = "portfolio-api")]
#[command(about = "Caching proxy for Last.fm and GitHub portfolio widgets")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:4321", env = "PORTFOLIO_BIND")]
    bind: SocketAddr,

    /// Freshness window for music stats, in seconds
    #[arg(long, default_value_t = 300, env = "PORTFOLIO_MUSIC_TTL_SECS")]
    music_ttl_secs: u64,

    /// Freshness window for the contribution calendar, in seconds
    #[arg(long, default_value_t = 60, env = "PORTFOLIO_GITHUB_TTL_SECS")]
    github_ttl_secs: u64,

    /// Upper bound for a single upstream attempt, in seconds
    #[arg(long, default_value_t = 8, env = "PORTFOLIO_ATTEMPT_TIMEOUT_SECS")]
    attempt_timeout_secs: u64,

    /// Attempts per upstream call, including the first
    #[arg(long, default_value_t = 3, env = "PORTFOLIO_MAX_ATTEMPTS")]
    max_attempts: u32,

    /// Base delay for exponential backoff, in milliseconds
    #[arg(long, default_value_t = 500, env = "PORTFOLIO_BACKOFF_BASE_MS")]
    backoff_base_ms: u64,

    /// Override the Last.fm REST root
    #[arg(long, env = "PORTFOLIO_LASTFM_BASE")]
    lastfm_base: Option<Url>,

    /// Override the GitHub GraphQL endpoint
    #[arg(long, env = "PORTFOLIO_GITHUB_BASE")]
    github_base: Option<Url>,
}

impl Args {
    fn retry_config(&self) -> RetryConfig {
        let defaults = RetryConfig::default();
        let max = match defaults.backoff {
            Backoff::Exponential { max, .. } => max,
            Backoff::Fixed(d) => d,
        };
        RetryConfig {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(self.backoff_base_ms),
                factor: 2.0,
                max,
            },
            ..defaults
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portfolio_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut builder = ApiClient::builder()
        .connect_timeout(Duration::from_secs(5))
        .retry_config(args.retry_config());
    if let Some(url) = args.lastfm_base.clone() {
        builder = builder.base_lastfm(url);
    }
    if let Some(url) = args.github_base.clone() {
        builder = builder.base_github(url);
    }
    let client = builder.build().context("Failed to build HTTP client")?;

    let cache = CacheSettings {
        music_ttl: Duration::from_secs(args.music_ttl_secs),
        github_ttl: Duration::from_secs(args.github_ttl_secs),
    };
    info!(
        music_ttl_secs = args.music_ttl_secs,
        github_ttl_secs = args.github_ttl_secs,
        max_attempts = args.max_attempts,
        "Starting portfolio-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::new(client, Arc::new(EnvSecrets), cache);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!("Listening on http://{}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
