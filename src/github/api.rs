use async_trait::async_trait;

use crate::classifier::RawFailure;
use crate::models::{
    CommitSummary, ContributorSummary, IssueSummary, PullRequestSummary, RateLimitStatus,
    RepositorySnapshot,
};

pub type FetchResult<T> = std::result::Result<T, RawFailure>;

/// Outcome of the README existence check. A failed probe is kept distinct
/// for logging but reads as "no README".
#[derive(Debug, Clone, PartialEq)]
pub enum ReadmeProbe {
    Present,
    Absent,
    Failed(RawFailure),
}

impl ReadmeProbe {
    pub fn exists(&self) -> bool {
        matches!(self, ReadmeProbe::Present)
    }
}

/// The hosting-platform requests the analyzer depends on. Failures are
/// returned raw; classification happens in the analyzer.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn get_repository(&self, owner: &str, repo: &str) -> FetchResult<RepositorySnapshot>;

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> FetchResult<Vec<CommitSummary>>;

    async fn list_contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> FetchResult<Vec<ContributorSummary>>;

    async fn list_closed_issues(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> FetchResult<Vec<IssueSummary>>;

    async fn list_closed_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        per_page: u32,
    ) -> FetchResult<Vec<PullRequestSummary>>;

    async fn probe_readme(&self, owner: &str, repo: &str) -> ReadmeProbe;

    async fn search_repositories(
        &self,
        query: &str,
        per_page: u32,
    ) -> FetchResult<Vec<RepositorySnapshot>>;

    async fn rate_limit_status(&self) -> FetchResult<RateLimitStatus>;

    /// Quota as last reported by response headers, if tracked.
    fn observed_rate_limit(&self) -> Option<RateLimitStatus> {
        None
    }
}
