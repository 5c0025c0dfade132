use chrono::NaiveDate;
use serde::Serialize;

/// Scrobbles logged on one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayScrobbles {
    /// Short English weekday (`Sun`..`Sat`).
    pub name: String,
    pub scrobbles: u64,
    /// The UTC date the count belongs to. Used to match fallbacks; not serialized.
    #[serde(skip)]
    pub date: NaiveDate,
}

/// One of the week's top artists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistInfo {
    pub name: String,
    /// Play count as reported by Last.fm (a decimal string).
    pub count: String,
}

/// Payload of `GET /api/music-stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicStats {
    /// Seven entries, oldest day first.
    pub weekly_scrobbles: Vec<DayScrobbles>,
    /// `[playcount, track_count, artist_count, album_count]`.
    pub upper_stats_array: [u64; 4],
    /// At most five entries.
    pub artists_info: Vec<ArtistInfo>,
}

impl MusicStats {
    /// Scrobble count previously recorded for `date`, if any.
    pub fn scrobbles_on(&self, date: NaiveDate) -> Option<u64> {
        self.weekly_scrobbles
            .iter()
            .find(|d| d.date == date)
            .map(|d| d.scrobbles)
    }
}

/// Result of one orchestrated fetch.
#[derive(Debug, Clone)]
pub struct Assembled<T> {
    pub payload: T,
    /// How many upstream calls were replaced by a fallback value.
    pub failed_calls: usize,
}

impl<T> Assembled<T> {
    pub fn is_degraded(&self) -> bool {
        self.failed_calls > 0
    }
}
