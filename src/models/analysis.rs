use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commit::{CommitSummary, ContributorSummary};
use super::repository::RepositorySnapshot;

/// Five sub-scores in [0, 100] and their weighted combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    pub overall: u8,
    pub code_quality: u8,
    pub documentation: u8,
    pub activity: u8,
    pub community: u8,
    pub maintenance: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub open: u32,
    pub closed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestCounts {
    /// Copied from the repository's `open_issues_count`, which GitHub fills
    /// with open issues and open pull requests combined.
    pub open: u32,
    pub closed: u32,
    pub merged: u32,
    pub open_includes_issues: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub repo: RepositorySnapshot,
    pub commits: Vec<CommitSummary>,
    pub contributors: Vec<ContributorSummary>,
    pub health_score: HealthScore,
    pub analyzed_at: DateTime<Utc>,
    pub issues: IssueCounts,
    pub pull_requests: PullRequestCounts,
    pub has_readme: bool,
}
