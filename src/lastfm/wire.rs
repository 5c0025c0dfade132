use serde::{Deserialize, Deserializer};

use crate::core::ApiError;

/// Last.fm reports failures with HTTP 200 and an `{error, message}` body.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Error { error: i64, message: String },
    Ok(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_result(self) -> Result<T, ApiError> {
        match self {
            Envelope::Ok(v) => Ok(v),
            Envelope::Error { error, message } => Err(ApiError::Upstream {
                code: error,
                message,
            }),
        }
    }
}

/// Lists collapse to a bare object when they hold one element.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(v) => vec![v],
        }
    }
}

/* ---------- user.getinfo ---------- */

#[derive(Deserialize)]
pub(crate) struct UserInfoEnvelope {
    pub(crate) user: UserInfo,
}

#[derive(Deserialize)]
pub(crate) struct UserInfo {
    #[serde(default, deserialize_with = "de_count")]
    pub(crate) playcount: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub(crate) track_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub(crate) artist_count: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub(crate) album_count: u64,
}

/* ---------- user.getrecenttracks ---------- */

#[derive(Deserialize)]
pub(crate) struct RecentTracksEnvelope {
    pub(crate) recenttracks: RecentTracks,
}

#[derive(Deserialize)]
pub(crate) struct RecentTracks {
    #[serde(default)]
    pub(crate) track: Option<OneOrMany<serde_json::Value>>,
}

impl RecentTracksEnvelope {
    pub(crate) fn scrobbles(self) -> u64 {
        self.recenttracks
            .track
            .map_or(0, |t| t.into_vec().len() as u64)
    }
}

/* ---------- user.gettopartists ---------- */

#[derive(Deserialize)]
pub(crate) struct TopArtistsEnvelope {
    pub(crate) topartists: TopArtists,
}

#[derive(Deserialize)]
pub(crate) struct TopArtists {
    #[serde(default)]
    pub(crate) artist: Option<OneOrMany<Artist>>,
}

#[derive(Deserialize)]
pub(crate) struct Artist {
    pub(crate) name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_count_str")]
    pub(crate) playcount: Option<String>,
}

/* ---------- helpers ---------- */

#[derive(Deserialize)]
#[serde(untagged)]
enum AnyCount {
    Num(u64),
    Str(String),
}

/// Counts arrive as `"120"`, occasionally as `120`. Empty strings mean zero.
fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<AnyCount>::deserialize(deserializer)? {
        Some(AnyCount::Num(n)) => Ok(n),
        Some(AnyCount::Str(s)) if s.trim().is_empty() => Ok(0),
        Some(AnyCount::Str(s)) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid count {s:?}"))),
        None => Ok(0),
    }
}

fn de_opt_count_str<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<AnyCount>::deserialize(deserializer)? {
        Some(AnyCount::Num(n)) => Some(n.to_string()),
        Some(AnyCount::Str(s)) => Some(s),
        None => None,
    })
}
