use serde::{Deserialize, Serialize};

/// Payload of `GET /api/github-contributions`, in GitHub's GraphQL shape.
///
/// `Default` is the zero-filled calendar served when nothing else is available.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionsResponse {
    pub data: ContributionsData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionsData {
    pub user: ContributionsUser,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsUser {
    pub contributions_collection: ContributionsCollection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionsCollection {
    pub contribution_calendar: ContributionCalendar,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionCalendar {
    pub total_contributions: u64,
    #[serde(default)]
    pub weeks: Vec<ContributionWeek>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionWeek {
    #[serde(default)]
    pub contribution_days: Vec<ContributionDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionDay {
    pub contribution_count: u64,
    /// `YYYY-MM-DD` as returned by GitHub.
    pub date: String,
    /// Hex color of the calendar cell.
    #[serde(default)]
    pub color: String,
}

impl ContributionsResponse {
    pub fn calendar(&self) -> &ContributionCalendar {
        &self.data.user.contributions_collection.contribution_calendar
    }
}

impl From<ContributionsUser> for ContributionsResponse {
    fn from(user: ContributionsUser) -> Self {
        Self {
            data: ContributionsData { user },
        }
    }
}
