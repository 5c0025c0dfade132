//! Centralized constants for default endpoints and UA.

pub(crate) const USER_AGENT: &str = concat!("portfolio-api/", env!("CARGO_PKG_VERSION"));

/// Last.fm REST root; every method is a query on this URL.
pub(crate) const DEFAULT_BASE_LASTFM: &str = "https://ws.audioscrobbler.com/2.0/";

/// GitHub GraphQL endpoint.
pub(crate) const DEFAULT_BASE_GITHUB: &str = "https://api.github.com/graphql";
