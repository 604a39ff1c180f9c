use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of `GET /repos/{owner}/{repo}/commits`, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetails,
    pub author: Option<CommitAuthorInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitDetails {
    pub message: String,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitAuthorInfo {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorSummary {
    pub login: String,
    #[serde(default)]
    pub avatar_url: String,
    pub contributions: u32,
}

/// Closed issue listing entry. GitHub's issues endpoint also returns pull
/// requests, which carry a `pull_request` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequestSummary {
    pub fn is_merged(&self) -> bool {
        self.merged_at.is_some()
    }
}
