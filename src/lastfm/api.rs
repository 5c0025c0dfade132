use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use futures::future::join_all;
use serde::de::DeserializeOwned;

use crate::{
    core::{
        ApiClient, ApiError,
        client::RetryConfig,
        net::redact_url,
    },
    lastfm::{
        LastFmCredentials,
        model::{ArtistInfo, Assembled, DayScrobbles, MusicStats},
        wire::{Envelope, RecentTracksEnvelope, TopArtistsEnvelope, UserInfoEnvelope},
    },
};

const TOP_ARTISTS: usize = 5;
const RECENT_TRACKS_LIMIT: &str = "200";

/// One UTC day of the trailing week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DayWindow {
    pub(crate) date: NaiveDate,
    pub(crate) from: i64,
    pub(crate) to: i64,
}

impl DayWindow {
    fn for_date(date: NaiveDate) -> Self {
        let from = date.and_hms_opt(0, 0, 0).map_or(0, |dt| dt.and_utc().timestamp());
        Self {
            date,
            from,
            to: from + 86_399,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self.date.weekday() {
            Weekday::Sun => "Sun",
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
        }
    }
}

/// Six days ago through today (UTC), oldest first.
pub(crate) fn trailing_week(now: DateTime<Utc>) -> Vec<DayWindow> {
    let today = now.date_naive();
    (0..7u64)
        .rev()
        .filter_map(|ago| today.checked_sub_days(Days::new(ago)))
        .map(DayWindow::for_date)
        .collect()
}

async fn call<T: DeserializeOwned>(
    client: &ApiClient,
    creds: &LastFmCredentials,
    method: &str,
    params: &[(&str, &str)],
    retry_override: Option<&RetryConfig>,
) -> Result<T, ApiError> {
    let mut url = client.base_lastfm().clone();
    url.query_pairs_mut()
        .append_pair("method", method)
        .append_pair("user", &creds.username)
        .append_pair("api_key", &creds.api_key)
        .append_pair("format", "json");
    for (k, v) in params {
        url.query_pairs_mut().append_pair(k, v);
    }

    let envelope: Envelope<T> = client
        .send_json(client.http().get(url.clone()), retry_override, method)
        .await
        .inspect_err(|e| tracing::debug!(method, url = %redact_url(&url), error = %e, "last.fm call failed"))?;
    envelope.into_result()
}

/// Fetch and assemble the weekly music statistics.
///
/// Issues `user.getinfo`, `user.gettopartists` and one `user.getrecenttracks`
/// per day of the trailing week, all concurrently. A failed call is replaced
/// by the matching part of `previous`, or a zero value. Fails only when every
/// call failed.
#[tracing::instrument(skip_all, fields(user = %creds.username))]
pub(super) async fn fetch_music_stats(
    client: &ApiClient,
    creds: &LastFmCredentials,
    previous: Option<&MusicStats>,
    now: DateTime<Utc>,
    retry_override: Option<&RetryConfig>,
) -> Result<Assembled<MusicStats>, ApiError> {
    let week = trailing_week(now);

    let user_info = call::<UserInfoEnvelope>(client, creds, "user.getinfo", &[], retry_override);
    let top_artists = call::<TopArtistsEnvelope>(
        client,
        creds,
        "user.gettopartists",
        &[("period", "7day"), ("limit", "5")],
        retry_override,
    );
    let days = join_all(week.iter().map(|w| async move {
        let from = w.from.to_string();
        let to = w.to.to_string();
        let res = call::<RecentTracksEnvelope>(
            client,
            creds,
            "user.getrecenttracks",
            &[("from", from.as_str()), ("to", to.as_str()), ("limit", RECENT_TRACKS_LIMIT)],
            retry_override,
        )
        .await;
        (*w, res.map(RecentTracksEnvelope::scrobbles))
    }));

    let (user_info, top_artists, days) = futures::join!(user_info, top_artists, days);

    let mut errors: Vec<ApiError> = Vec::new();

    let upper_stats_array = match user_info {
        Ok(env) => {
            let u = env.user;
            [u.playcount, u.track_count, u.artist_count, u.album_count]
        }
        Err(e) => {
            tracing::warn!(error = %e, "user.getinfo failed, using previous totals");
            errors.push(e);
            previous.map_or([0; 4], |p| p.upper_stats_array)
        }
    };

    let artists_info = match top_artists {
        Ok(env) => env
            .topartists
            .artist
            .map(|a| a.into_vec())
            .unwrap_or_default()
            .into_iter()
            .take(TOP_ARTISTS)
            .map(|a| ArtistInfo {
                name: a.name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unknown Artist".into()),
                count: a.playcount.unwrap_or_else(|| "0".into()),
            })
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "user.gettopartists failed, using previous artists");
            errors.push(e);
            previous.map(|p| p.artists_info.clone()).unwrap_or_default()
        }
    };

    let weekly_scrobbles = days
        .into_iter()
        .map(|(window, res)| {
            let scrobbles = match res {
                Ok(n) => n,
                Err(e) => {
                    tracing::warn!(day = %window.date, error = %e, "daily scrobbles failed, using previous value");
                    errors.push(e);
                    previous.and_then(|p| p.scrobbles_on(window.date)).unwrap_or(0)
                }
            };
            DayScrobbles {
                name: window.label().to_string(),
                scrobbles,
                date: window.date,
            }
        })
        .collect::<Vec<_>>();

    let total_calls = 2 + week.len();
    if errors.len() == total_calls {
        tracing::error!(calls = total_calls, "every last.fm call failed");
        return Err(errors.swap_remove(0));
    }
    if !errors.is_empty() {
        tracing::warn!(failed = errors.len(), calls = total_calls, "music stats assembled with fallbacks");
    }

    Ok(Assembled {
        payload: MusicStats {
            weekly_scrobbles,
            upper_stats_array,
            artists_info,
        },
        failed_calls: errors.len(),
    })
}
