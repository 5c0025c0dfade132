use serde::de::DeserializeOwned;
use url::Url;

use crate::core::ApiError;

const SECRET_PARAMS: &[&str] = &["api_key", "token", "access_token"];

/// Render `url` for logs and error messages with credential parameters masked.
pub(crate) fn redact_url(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| SECRET_PARAMS.contains(&k.as_ref())) {
        return url.to_string();
    }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if SECRET_PARAMS.contains(&k.as_ref()) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut clean = url.clone();
    clean.query_pairs_mut().clear().extend_pairs(pairs);
    clean.to_string()
}

/// Decode a buffered body into the wire model `T`.
///
/// Decoding is the validation step: a body that does not fit `T` is an error,
/// never a half-filled value.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &str, endpoint: &str) -> Result<T, ApiError> {
    tracing::trace!(endpoint, bytes = body.len(), "decoding upstream body");
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!(endpoint, error = %e, "upstream body failed validation");
        ApiError::Json(e)
    })
}
