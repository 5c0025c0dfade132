use chrono::{DateTime, Days, SecondsFormat, Utc};
use reqwest::header::AUTHORIZATION;

use crate::{
    core::{ApiClient, ApiError, client::RetryConfig},
    github::{
        GitHubCredentials,
        model::ContributionsResponse,
        wire::{CONTRIBUTIONS_QUERY, GraphQlEnvelope, GraphQlRequest, Variables},
    },
};

const WINDOW_DAYS: u64 = 365;

/// `[midnight 365 days ago, end of today]` in UTC, RFC 3339 with milliseconds.
pub(crate) fn contribution_window(now: DateTime<Utc>) -> Result<(String, String), ApiError> {
    let today = now.date_naive();
    let start = today
        .checked_sub_days(Days::new(WINDOW_DAYS))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ApiError::Data(format!("no contribution window before {today}")))?;
    let end = today
        .and_hms_milli_opt(23, 59, 59, 999)
        .ok_or_else(|| ApiError::Data(format!("no end of day for {today}")))?;
    Ok((
        start.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true),
        end.and_utc().to_rfc3339_opts(SecondsFormat::Millis, true),
    ))
}

#[tracing::instrument(skip_all, fields(user = %creds.username))]
pub(super) async fn fetch_contributions(
    client: &ApiClient,
    creds: &GitHubCredentials,
    now: DateTime<Utc>,
    retry_override: Option<&RetryConfig>,
) -> Result<ContributionsResponse, ApiError> {
    let (from, to) = contribution_window(now)?;
    let body = GraphQlRequest {
        query: CONTRIBUTIONS_QUERY,
        variables: Variables {
            username: &creds.username,
            from,
            to,
        },
    };

    let req = client
        .http()
        .post(client.base_github().clone())
        .header(AUTHORIZATION, format!("Bearer {}", creds.token))
        .json(&body);
    let envelope: GraphQlEnvelope = client
        .send_json(req, retry_override, "github_contributions")
        .await?;
    let user = envelope.into_user()?;
    tracing::debug!(
        total = user.contributions_collection.contribution_calendar.total_contributions,
        "contribution calendar fetched"
    );
    Ok(user.into())
}
