use thiserror::Error;

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An error occurred during an HTTP request (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The response body did not match the expected wire shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server returned an unsuccessful HTTP status code.
    #[error("Unexpected response status: {status} at {url}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// The URL that returned the error.
        url: String,
    },

    /// A single attempt exceeded the per-attempt timeout.
    #[error("request timed out: {url}")]
    Timeout {
        /// The URL that did not answer in time.
        url: String,
    },

    /// The upstream answered successfully at the HTTP level but reported an
    /// error in its body (Last.fm error objects, GraphQL `errors`).
    #[error("upstream error {code}: {message}")]
    Upstream {
        /// Upstream error code (`0` when the upstream does not supply one).
        code: i64,
        /// Upstream error message.
        message: String,
    },

    /// The data received was in an unexpected format or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),

    /// Required configuration (credentials, base URLs) is missing.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Client errors other than 429 and body-level upstream errors are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Http(_) | ApiError::Timeout { .. } => true,
            ApiError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
