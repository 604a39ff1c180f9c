use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_CACHE_PREFIX: &str = "codepulse_";

#[derive(Debug, Clone)]
pub struct Config {
    /// Statically configured default token, the lowest-precedence credential.
    pub github_token: Option<String>,
    pub api_url: String,
    pub database_path: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub cache_prefix: String,
    pub analysis_cache_ttl: Duration,
    pub search_cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            api_url: DEFAULT_API_URL.to_string(),
            database_path: "codepulse.db".to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            analysis_cache_ttl: Duration::from_secs(30 * 60),
            search_cache_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let github_token = env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let api_url = env::var("GITHUB_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let database_path = env::var("DATABASE_PATH").unwrap_or(defaults.database_path);

        let request_timeout = parse_var::<u64>("REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let max_retries = parse_var("MAX_RETRIES")?.unwrap_or(defaults.max_retries);

        let cache_prefix = match env::var("CACHE_PREFIX") {
            Ok(prefix) => checked_prefix(prefix)?,
            Err(_) => defaults.cache_prefix,
        };

        let analysis_cache_ttl = parse_var::<u64>("ANALYSIS_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.analysis_cache_ttl);

        let search_cache_ttl = parse_var::<u64>("SEARCH_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.search_cache_ttl);

        Ok(Self {
            github_token,
            api_url,
            database_path,
            request_timeout,
            max_retries,
            cache_prefix,
            analysis_cache_ttl,
            search_cache_ttl,
        })
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} must be a number, got {:?}", name, raw))),
        Err(_) => Ok(None),
    }
}

/// An empty namespace would make cache-wide purges reach foreign keys such
/// as the persisted token.
fn checked_prefix(prefix: String) -> Result<String> {
    if prefix.trim().is_empty() {
        return Err(Error::Config("CACHE_PREFIX must not be empty".to_string()));
    }
    Ok(prefix)
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api_url.clone(),
            request_timeout: config.request_timeout,
            user_agent: format!("codepulse/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Per-request page sizes; every list fetch is a single bounded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub commits: u32,
    pub contributors: u32,
    pub issues: u32,
    pub pull_requests: u32,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            commits: 100,
            contributors: 30,
            issues: 100,
            pull_requests: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub page_sizes: PageSizes,
    pub analysis_ttl: Duration,
    pub search_ttl: Duration,
    /// Read by presentation layers deciding how often to re-offer a retry;
    /// the analyzer itself never retries.
    pub max_retries: u32,
    /// Remaining-quota level below which a warning is logged after a fetch.
    pub rate_limit_warning_threshold: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for AnalyzerConfig {
    fn from(config: &Config) -> Self {
        Self {
            page_sizes: PageSizes::default(),
            analysis_ttl: config.analysis_cache_ttl,
            search_ttl: config.search_cache_ttl,
            max_retries: config.max_retries,
            rate_limit_warning_threshold: 10,
        }
    }
}
