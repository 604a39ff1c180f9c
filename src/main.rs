use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use codepulse::cache::analysis_key;
use codepulse::classifier::error_info;
use codepulse::github::{forget_token, persist_token, resolve_token};
use codepulse::models::{AnalysisResult, RepositorySnapshot};
use codepulse::{
    Analyzer, AnalyzerConfig, CacheStore, ClassifiedError, ClientConfig, Config, GitHubClient,
    KeyValueStore, SqliteStore,
};

const RETRY_DELAY: Duration = Duration::from_secs(1);

static REPO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/]+)/([^/?#]+)").expect("repository URL pattern is valid")
});
static REPO_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^/]+)/([^/]+)$").expect("repository slug pattern is valid"));

#[derive(Parser, Debug)]
#[command(name = "codepulse")]
#[command(version = "0.1.0")]
#[command(about = "Score the health of GitHub repositories")]
struct Args {
    /// Token to use for this run, overriding persisted and configured ones
    #[arg(long, global = true)]
    token: Option<String>,

    /// Database path for the cache and the persisted token
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a repository given as owner/repo or a GitHub URL
    Analyze {
        repository: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Search repositories
    Search {
        query: String,

        #[arg(long, default_value = "10")]
        per_page: u32,
    },
    /// Show the remaining API quota
    RateLimit,
    /// Manage cached results
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the persisted GitHub token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Remove one repository's analysis, or everything when none is given
    Clear { repository: Option<String> },
    /// Remove expired entries
    Clean,
}

#[derive(Subcommand, Debug)]
enum TokenAction {
    Set { token: String },
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("codepulse=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(ref path) = args.database {
        config.database_path = path.clone();
    }

    let store = Arc::new(
        SqliteStore::new(&config.database_path)
            .with_context(|| format!("opening cache database {}", config.database_path))?,
    );

    match args.command {
        Command::Token { action } => run_token(action, store.as_ref()),
        Command::Cache { action } => {
            let cache = CacheStore::new(store).with_prefix(config.cache_prefix.clone());
            run_cache(action, &cache)
        }
        command => {
            let token = resolve_token(
                args.token.as_deref(),
                Some(store.as_ref() as &dyn KeyValueStore),
                config.github_token.as_deref(),
            );
            if token.is_none() {
                tracing::info!("No GitHub token configured, using unauthenticated requests");
            }

            let github = GitHubClient::new(token.as_deref(), &ClientConfig::from(&config))?;
            let cache = CacheStore::new(store)
                .with_prefix(config.cache_prefix.clone())
                .with_default_ttl(config.analysis_cache_ttl);
            let analyzer = Analyzer::new(github, cache, AnalyzerConfig::from(&config));
            run_remote(command, &analyzer).await
        }
    }
}

fn run_token(action: TokenAction, store: &dyn KeyValueStore) -> anyhow::Result<()> {
    match action {
        TokenAction::Set { token } => {
            persist_token(store, &token)?;
            println!("Token saved.");
        }
        TokenAction::Clear => {
            forget_token(store)?;
            println!("Token removed.");
        }
    }
    Ok(())
}

fn run_cache(action: CacheAction, cache: &CacheStore) -> anyhow::Result<()> {
    match action {
        CacheAction::Clear {
            repository: Some(repository),
        } => {
            let (owner, repo) = parse_repository(&repository)?;
            cache.clear(Some(&analysis_key(&owner, &repo)));
            println!("Cleared cached analysis of {}/{}.", owner, repo);
        }
        CacheAction::Clear { repository: None } => {
            cache.clear(None);
            println!("Cache cleared.");
        }
        CacheAction::Clean => {
            let removed = cache.clean_expired();
            println!("Removed {} expired entries.", removed);
        }
    }
    Ok(())
}

async fn run_remote(command: Command, analyzer: &Analyzer) -> anyhow::Result<()> {
    match command {
        Command::Analyze {
            repository,
            format,
            output,
        } => {
            let (owner, repo) = parse_repository(&repository)?;
            let result = analyze_with_retry(analyzer, &owner, &repo, RETRY_DELAY)
                .await
                .map_err(report)?;
            output_result(&result, &format, output.as_deref())?;
        }
        Command::Search { query, per_page } => {
            let repos = analyzer
                .search_repositories(&query, per_page)
                .await
                .map_err(report)?;
            println!("{}", format_search(&repos));
        }
        Command::RateLimit => {
            let status = analyzer.rate_limit_status().await.map_err(report)?;
            if status.is_anomalous() {
                println!("GitHub reported a rate limit of 0; the response looks malformed.");
            } else {
                let reset = chrono::DateTime::from_timestamp(status.reset as i64, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| status.reset.to_string());
                println!(
                    "{}/{} requests remaining ({} used), resets at {}",
                    status.remaining, status.limit, status.used, reset
                );
            }
        }
        Command::Token { .. } | Command::Cache { .. } => {}
    }

    Ok(())
}

/// Accepts `owner/repo` or any URL containing `github.com/owner/repo`.
fn parse_repository(input: &str) -> anyhow::Result<(String, String)> {
    let input = input.trim();
    let captures = REPO_URL
        .captures(input)
        .or_else(|| REPO_SLUG.captures(input))
        .with_context(|| format!("expected owner/repo or a GitHub URL, got {:?}", input))?;
    let repo = captures[2].trim_end_matches(".git").to_string();
    Ok((captures[1].to_string(), repo))
}

async fn analyze_with_retry(
    analyzer: &Analyzer,
    owner: &str,
    repo: &str,
    retry_delay: Duration,
) -> Result<AnalysisResult, ClassifiedError> {
    let max_retries = analyzer.config().max_retries;
    let mut attempt = 0;

    loop {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Analyzing {}/{}", owner, repo));
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = analyzer.analyze(owner, repo).await;
        pb.finish_and_clear();

        match result {
            Err(err) if err.should_retry() && attempt < max_retries => {
                attempt += 1;
                tracing::warn!("{} (retry {}/{})", err, attempt, max_retries);
                tokio::time::sleep(retry_delay).await;
            }
            other => return other,
        }
    }
}

/// Prints the user-facing wording and hands the error back so the process
/// exits non-zero.
fn report(err: ClassifiedError) -> anyhow::Error {
    let info = error_info(&err);
    eprintln!("{}: {}", info.title, info.message);
    eprintln!("{}", info.action);
    anyhow::Error::new(err)
}

fn output_result(result: &AnalysisResult, format: &str, path: Option<&str>) -> anyhow::Result<()> {
    let output = match format {
        "json" => serde_json::to_string_pretty(result)?,
        _ => format_text(result),
    };

    if let Some(path) = path {
        std::fs::write(path, &output)?;
        tracing::info!("Output written to: {}", path);
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_text(result: &AnalysisResult) -> String {
    let mut output = String::new();
    let repo = &result.repo;
    let score = &result.health_score;

    output.push_str(&format!("\n=== Repository Health: {} ===\n\n", repo.full_name));

    if let Some(ref description) = repo.description {
        output.push_str(&format!("{}\n\n", description));
    }

    output.push_str(&format!("Stars: {}  Forks: {}\n", repo.stargazers_count, repo.forks_count));
    if let Some(ref language) = repo.language {
        output.push_str(&format!("Language: {}\n", language));
    }
    if let Some(ref license) = repo.license {
        output.push_str(&format!("License: {}\n", license.name));
    }
    output.push_str(&format!("README: {}\n", if result.has_readme { "yes" } else { "no" }));
    match repo.pushed_at {
        Some(pushed) => output.push_str(&format!("Last push: {}\n", pushed.format("%Y-%m-%d"))),
        None => output.push_str("Last push: never\n"),
    }

    output.push_str(&format!("\nOverall: {}/100\n", score.overall));
    for (label, value) in [
        ("Code quality", score.code_quality),
        ("Documentation", score.documentation),
        ("Activity", score.activity),
        ("Community", score.community),
        ("Maintenance", score.maintenance),
    ] {
        output.push_str(&format!("  {:<14} {:>3}/100\n", label, value));
    }

    output.push_str(&format!(
        "\nCommits sampled: {}  Contributors: {}\n",
        result.commits.len(),
        result.contributors.len()
    ));
    output.push_str(&format!(
        "Issues: {} open, {} closed\n",
        result.issues.open, result.issues.closed
    ));
    let pr_open_note = if result.pull_requests.open_includes_issues {
        " (includes open issues)"
    } else {
        ""
    };
    output.push_str(&format!(
        "Pull requests: {} open{}, {} closed, {} merged\n",
        result.pull_requests.open,
        pr_open_note,
        result.pull_requests.closed,
        result.pull_requests.merged
    ));

    output.push_str(&format!(
        "\nAnalyzed on: {}\n",
        result.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}

fn format_search(repos: &[RepositorySnapshot]) -> String {
    if repos.is_empty() {
        return "No repositories found.".to_string();
    }

    let mut output = String::new();
    for repo in repos {
        output.push_str(&format!(
            "{:<40} {:>8} stars  {}\n",
            repo.full_name,
            repo.stargazers_count,
            repo.description.as_deref().unwrap_or("")
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codepulse::classifier::{ErrorKind, RawFailure};
    use codepulse::github::{FetchResult, HostingApi, ReadmeProbe};
    use codepulse::models::{
        CommitSummary, ContributorSummary, IssueSummary, PullRequestSummary, RateLimitStatus,
    };
    use codepulse::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails every repository lookup with the same failure.
    struct FailingApi {
        failure: RawFailure,
        lookups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HostingApi for FailingApi {
        async fn get_repository(&self, _: &str, _: &str) -> FetchResult<RepositorySnapshot> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Err(self.failure.clone())
        }

        async fn list_commits(&self, _: &str, _: &str, _: u32) -> FetchResult<Vec<CommitSummary>> {
            Ok(Vec::new())
        }

        async fn list_contributors(&self, _: &str, _: &str, _: u32) -> FetchResult<Vec<ContributorSummary>> {
            Ok(Vec::new())
        }

        async fn list_closed_issues(&self, _: &str, _: &str, _: u32) -> FetchResult<Vec<IssueSummary>> {
            Ok(Vec::new())
        }

        async fn list_closed_pull_requests(&self, _: &str, _: &str, _: u32) -> FetchResult<Vec<PullRequestSummary>> {
            Ok(Vec::new())
        }

        async fn probe_readme(&self, _: &str, _: &str) -> ReadmeProbe {
            ReadmeProbe::Absent
        }

        async fn search_repositories(&self, _: &str, _: u32) -> FetchResult<Vec<RepositorySnapshot>> {
            Err(self.failure.clone())
        }

        async fn rate_limit_status(&self) -> FetchResult<RateLimitStatus> {
            Err(self.failure.clone())
        }
    }

    fn failing_analyzer(failure: RawFailure, max_retries: u32) -> (Analyzer, Arc<AtomicUsize>) {
        let lookups = Arc::new(AtomicUsize::new(0));
        let api = FailingApi {
            failure,
            lookups: lookups.clone(),
        };
        let config = AnalyzerConfig {
            max_retries,
            ..AnalyzerConfig::default()
        };
        let cache = CacheStore::new(Arc::new(MemoryStore::new()));
        (Analyzer::new(api, cache, config), lookups)
    }

    fn connection_refused() -> RawFailure {
        RawFailure::Network {
            message: "error sending request".to_string(),
            code: Some("ECONNREFUSED".to_string()),
        }
    }

    #[tokio::test]
    async fn test_retryable_failure_is_retried_up_to_max_retries() {
        let (analyzer, lookups) = failing_analyzer(connection_refused(), 2);

        let err = analyze_with_retry(&analyzer, "facebook", "react", Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NetworkError);
        assert_eq!(lookups.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let (analyzer, lookups) = failing_analyzer(connection_refused(), 0);

        assert!(analyze_with_retry(&analyzer, "facebook", "react", Duration::ZERO)
            .await
            .is_err());
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let (analyzer, lookups) = failing_analyzer(RawFailure::http(404, "Not Found"), 3);

        let err = analyze_with_retry(&analyzer, "nobody", "nothing", Duration::ZERO)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_classified_failures_exit_with_error() {
        let (analyzer, _) = failing_analyzer(RawFailure::http(401, "Bad credentials"), 0);

        let analyze = Command::Analyze {
            repository: "facebook/react".to_string(),
            format: "text".to_string(),
            output: None,
        };
        let err = run_remote(analyze, &analyzer).await.unwrap_err();
        let classified = err.downcast_ref::<ClassifiedError>().unwrap();
        assert_eq!(classified.kind, ErrorKind::Unauthorized);

        let search = Command::Search {
            query: "react".to_string(),
            per_page: 10,
        };
        assert!(run_remote(search, &analyzer).await.is_err());
        assert!(run_remote(Command::RateLimit, &analyzer).await.is_err());
    }

    #[test]
    fn test_parse_repository_forms() {
        let expected = ("facebook".to_string(), "react".to_string());
        assert_eq!(parse_repository("facebook/react").unwrap(), expected);
        assert_eq!(parse_repository(" https://github.com/facebook/react ").unwrap(), expected);
        assert_eq!(parse_repository("github.com/facebook/react.git").unwrap(), expected);
        assert_eq!(
            parse_repository("https://github.com/facebook/react/tree/main").unwrap(),
            expected
        );
        assert!(parse_repository("react").is_err());
    }
}
