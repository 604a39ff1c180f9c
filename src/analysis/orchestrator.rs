use std::sync::Arc;

use crate::analysis::scoring::{HealthScorer, ScoreInput};
use crate::analysis::single_flight::InFlight;
use crate::cache::{analysis_key, search_key, CacheStore};
use crate::classifier::{classify, validate_repo_input, ClassifiedError, ErrorKind};
use crate::config::AnalyzerConfig;
use crate::github::{FetchResult, HostingApi, ReadmeProbe};
use crate::models::{
    AnalysisResult, IssueCounts, PullRequestCounts, RateLimitStatus, RepositorySnapshot,
};

/// Validates input, consults the cache, fans out to the hosting API, scores
/// and caches the result. Every failure leaves as a [`ClassifiedError`].
pub struct Analyzer {
    api: Arc<dyn HostingApi>,
    cache: CacheStore,
    scorer: HealthScorer,
    in_flight: InFlight,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(api: impl HostingApi + 'static, cache: CacheStore, config: AnalyzerConfig) -> Self {
        Self {
            api: Arc::new(api),
            cache,
            scorer: HealthScorer::new(),
            in_flight: InFlight::new(),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub async fn analyze(&self, owner: &str, repo: &str) -> Result<AnalysisResult, ClassifiedError> {
        let (owner, repo) = (owner.trim(), repo.trim());
        if owner.is_empty() && repo.is_empty() {
            validate_repo_input("")?;
        }
        validate_repo_input(&format!("{}/{}", owner, repo))?;

        let key = analysis_key(owner, repo);
        if let Some(cached) = self.cache.get::<AnalysisResult>(&key) {
            tracing::info!("Cache hit for {}/{}", owner, repo);
            return Ok(cached);
        }

        let _flight = self.in_flight.acquire(&key).await;
        // another caller may have finished the same fetch while we waited
        if let Some(cached) = self.cache.get::<AnalysisResult>(&key) {
            tracing::info!("Cache filled by concurrent analysis of {}/{}", owner, repo);
            return Ok(cached);
        }

        tracing::info!("Cache miss for {}/{}, fetching", owner, repo);
        let result = self.fetch_and_score(owner, repo).await.map_err(|failure| {
            let classified = classify(failure);
            tracing::warn!("Analysis of {}/{} failed: {}", owner, repo, classified);
            classified
        })?;

        self.cache.set(&key, &result, Some(self.config.analysis_ttl));
        self.warn_if_quota_low();

        tracing::info!(
            "Analyzed {}/{}: overall health {}",
            owner,
            repo,
            result.health_score.overall
        );
        Ok(result)
    }

    async fn fetch_and_score(&self, owner: &str, repo: &str) -> FetchResult<AnalysisResult> {
        // Sequential so a missing or forbidden repository costs one request
        let snapshot = self.api.get_repository(owner, repo).await?;

        let pages = self.config.page_sizes;
        let bulk = async {
            futures::try_join!(
                self.api.list_commits(owner, repo, pages.commits),
                self.api.list_contributors(owner, repo, pages.contributors),
                self.api.list_closed_issues(owner, repo, pages.issues),
                self.api.list_closed_pull_requests(owner, repo, pages.pull_requests),
            )
        };
        let (bulk, has_readme) = futures::join!(bulk, self.readme_exists(owner, repo));
        let (commits, contributors, closed_issues, closed_prs) = bulk?;

        tracing::debug!(
            "Fetched {} commits, {} contributors, {} closed issues, {} closed PRs for {}/{}",
            commits.len(),
            contributors.len(),
            closed_issues.len(),
            closed_prs.len(),
            owner,
            repo
        );

        let closed_issue_count = count(closed_issues.len());
        let now = self.cache.clock().now();
        let health_score = self.scorer.score(
            &ScoreInput {
                repo: &snapshot,
                commits: &commits,
                contributors: &contributors,
                has_readme,
                open_issues: snapshot.open_issues_count,
                closed_issues: closed_issue_count,
            },
            now,
        );

        let issues = IssueCounts {
            open: snapshot.open_issues_count,
            closed: closed_issue_count,
        };
        let pull_requests = PullRequestCounts {
            open: snapshot.open_issues_count,
            closed: count(closed_prs.len()),
            merged: count(closed_prs.iter().filter(|pr| pr.is_merged()).count()),
            open_includes_issues: true,
        };

        Ok(AnalysisResult {
            repo: snapshot,
            commits,
            contributors,
            health_score,
            analyzed_at: now,
            issues,
            pull_requests,
            has_readme,
        })
    }

    async fn readme_exists(&self, owner: &str, repo: &str) -> bool {
        let probe = self.api.probe_readme(owner, repo).await;
        if let ReadmeProbe::Failed(ref failure) = probe {
            tracing::debug!("README probe for {}/{} failed, assuming none: {}", owner, repo, failure);
        }
        probe.exists()
    }

    fn warn_if_quota_low(&self) {
        if let Some(status) = self.api.observed_rate_limit() {
            if status.remaining < self.config.rate_limit_warning_threshold {
                tracing::warn!(
                    "GitHub API quota low: {}/{} requests left until {}",
                    status.remaining,
                    status.limit,
                    status.reset
                );
            }
        }
    }

    pub async fn search_repositories(
        &self,
        query: &str,
        per_page: u32,
    ) -> Result<Vec<RepositorySnapshot>, ClassifiedError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClassifiedError::new(ErrorKind::EmptyInput, "Search query is empty"));
        }

        let key = search_key(query, per_page);
        if let Some(cached) = self.cache.get::<Vec<RepositorySnapshot>>(&key) {
            tracing::info!("Cache hit for search {:?}", query);
            return Ok(cached);
        }

        let results = self
            .api
            .search_repositories(query, per_page)
            .await
            .map_err(classify)?;
        self.cache.set(&key, &results, Some(self.config.search_ttl));
        Ok(results)
    }

    /// Current quota. A `limit` of zero is passed through untouched; check
    /// [`RateLimitStatus::is_anomalous`].
    pub async fn rate_limit_status(&self) -> Result<RateLimitStatus, ClassifiedError> {
        let status = self.api.rate_limit_status().await.map_err(classify)?;
        if status.is_anomalous() {
            tracing::warn!("GitHub reported a rate limit of 0; the response is likely malformed");
        }
        Ok(status)
    }

    /// Drops one repository's cached analysis, or every cached entry.
    pub fn clear_cache(&self, target: Option<(&str, &str)>) {
        match target {
            Some((owner, repo)) => self.cache.clear(Some(&analysis_key(owner, repo))),
            None => self.cache.clear(None),
        }
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
