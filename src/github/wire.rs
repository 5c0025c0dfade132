use serde::{Deserialize, Serialize};

use crate::{core::ApiError, github::model::ContributionsUser};

pub(crate) const CONTRIBUTIONS_QUERY: &str = r"
query($username: String!, $from: DateTime!, $to: DateTime!) {
  user(login: $username) {
    contributionsCollection(from: $from, to: $to) {
      contributionCalendar {
        totalContributions
        weeks {
          contributionDays {
            contributionCount
            date
            color
          }
        }
      }
    }
  }
}
";

#[derive(Serialize)]
pub(crate) struct GraphQlRequest<'a> {
    pub(crate) query: &'a str,
    pub(crate) variables: Variables<'a>,
}

#[derive(Serialize)]
pub(crate) struct Variables<'a> {
    pub(crate) username: &'a str,
    pub(crate) from: String,
    pub(crate) to: String,
}

#[derive(Deserialize)]
pub(crate) struct GraphQlEnvelope {
    pub(crate) data: Option<UserData>,
    #[serde(default)]
    pub(crate) errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
pub(crate) struct UserData {
    pub(crate) user: Option<ContributionsUser>,
}

#[derive(Deserialize)]
pub(crate) struct GraphQlError {
    #[serde(default)]
    pub(crate) message: String,
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
}

impl GraphQlEnvelope {
    /// GraphQL reports failures inside a 200 body; a missing user is one too.
    pub(crate) fn into_user(self) -> Result<ContributionsUser, ApiError> {
        if let Some(first) = self.errors.into_iter().next() {
            return Err(ApiError::Upstream {
                code: 0,
                message: match first.kind {
                    Some(kind) => format!("{kind}: {}", first.message),
                    None => first.message,
                },
            });
        }
        self.data
            .and_then(|d| d.user)
            .ok_or_else(|| ApiError::Data("GraphQL response has no user".into()))
    }
}
