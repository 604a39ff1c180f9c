use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::classifier::RawFailure;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::github::api::{FetchResult, HostingApi, ReadmeProbe};
use crate::github::rate_limiter::RateLimitTracker;
use crate::models::rate_limit::RateLimitResponse;
use crate::models::{
    CommitSummary, ContributorSummary, IssueSummary, PullRequestSummary, RateLimitStatus,
    RepositorySnapshot, SearchResponse,
};

/// Thin reqwest wrapper over the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    rate_limits: RateLimitTracker,
    base_url: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

impl GitHubClient {
    /// `token` is the already-resolved credential; see
    /// [`resolve_token`](crate::github::resolve_token).
    pub fn new(token: Option<&str>, config: &ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&config.user_agent)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            rate_limits: RateLimitTracker::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, path: &str, query: &[(&str, String)]) -> FetchResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        self.rate_limits.update_from_headers(response.headers());
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FetchResult<T> {
        let response = self.send(path, query).await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FetchResult<Vec<T>> {
        let response = self.send(path, query).await?;
        let response = ensure_success(response).await?;

        // Empty repositories answer list endpoints with 204
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Vec::new());
        }
        Ok(response.json().await?)
    }
}

/// Turns a non-success response into [`RawFailure::Http`], keeping the
/// API's error message and the quota header.
async fn ensure_success(response: Response) -> FetchResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let rate_limit_remaining = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or_default().to_string());

    Err(RawFailure::Http {
        status: status.as_u16(),
        message,
        rate_limit_remaining,
    })
}

fn per_page(n: u32) -> (&'static str, String) {
    ("per_page", n.to_string())
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn get_repository(&self, owner: &str, repo: &str) -> FetchResult<RepositorySnapshot> {
        tracing::info!("Fetching repository: {}/{}", owner, repo);
        self.get_json(&format!("/repos/{}/{}", owner, repo), &[]).await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        per_page_count: u32,
    ) -> FetchResult<Vec<CommitSummary>> {
        self.get_list(
            &format!("/repos/{}/{}/commits", owner, repo),
            &[per_page(per_page_count)],
        )
        .await
    }

    async fn list_contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page_count: u32,
    ) -> FetchResult<Vec<ContributorSummary>> {
        self.get_list(
            &format!("/repos/{}/{}/contributors", owner, repo),
            &[per_page(per_page_count)],
        )
        .await
    }

    async fn list_closed_issues(
        &self,
        owner: &str,
        repo: &str,
        per_page_count: u32,
    ) -> FetchResult<Vec<IssueSummary>> {
        self.get_list(
            &format!("/repos/{}/{}/issues", owner, repo),
            &[("state", "closed".to_string()), per_page(per_page_count)],
        )
        .await
    }

    async fn list_closed_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        per_page_count: u32,
    ) -> FetchResult<Vec<PullRequestSummary>> {
        self.get_list(
            &format!("/repos/{}/{}/pulls", owner, repo),
            &[("state", "closed".to_string()), per_page(per_page_count)],
        )
        .await
    }

    async fn probe_readme(&self, owner: &str, repo: &str) -> ReadmeProbe {
        let response = match self.send(&format!("/repos/{}/{}/readme", owner, repo), &[]).await {
            Ok(response) => response,
            Err(failure) => return ReadmeProbe::Failed(failure),
        };

        if response.status() == StatusCode::NOT_FOUND {
            return ReadmeProbe::Absent;
        }
        match ensure_success(response).await {
            Ok(_) => ReadmeProbe::Present,
            Err(failure) => ReadmeProbe::Failed(failure),
        }
    }

    async fn search_repositories(
        &self,
        query: &str,
        per_page_count: u32,
    ) -> FetchResult<Vec<RepositorySnapshot>> {
        tracing::info!("Searching repositories: {}", query);
        let response: SearchResponse = self
            .get_json(
                "/search/repositories",
                &[
                    ("q", query.to_string()),
                    ("sort", "stars".to_string()),
                    ("order", "desc".to_string()),
                    per_page(per_page_count),
                ],
            )
            .await?;
        Ok(response.items)
    }

    async fn rate_limit_status(&self) -> FetchResult<RateLimitStatus> {
        let response: RateLimitResponse = self.get_json("/rate_limit", &[]).await?;
        response
            .core()
            .ok_or_else(|| RawFailure::generic("Invalid rate limit response from GitHub API"))
    }

    fn observed_rate_limit(&self) -> Option<RateLimitStatus> {
        self.rate_limits.last_observed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{classify, ErrorKind};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct Route {
        path: &'static str,
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    }

    fn route(path: &'static str, status: u16, body: &'static str) -> Route {
        Route {
            path,
            status,
            headers: Vec::new(),
            body,
        }
    }

    /// Minimal HTTP/1.1 responder: one canned answer per path, 404 otherwise.
    async fn serve(routes: Vec<Route>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let routes = std::sync::Arc::new(routes);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let routes = routes.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        let n = socket.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                    }
                    let request = String::from_utf8_lossy(&buf);
                    let target = request.split_whitespace().nth(1).unwrap_or("/");
                    let path = target.split('?').next().unwrap_or("/");

                    let (status, headers, body) = match routes.iter().find(|r| r.path == path) {
                        Some(r) => (r.status, r.headers.clone(), r.body),
                        None => (404, Vec::new(), r#"{"message":"Not Found"}"#),
                    };

                    let mut response = format!(
                        "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n",
                        status,
                        body.len()
                    );
                    for (name, value) in headers {
                        response.push_str(&format!("{}: {}\r\n", name, value));
                    }
                    response.push_str("\r\n");
                    response.push_str(body);
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn client(base_url: String) -> GitHubClient {
        let config = ClientConfig {
            base_url,
            ..ClientConfig::default()
        };
        GitHubClient::new(Some("test-token"), &config).unwrap()
    }

    const REPO_JSON: &str = r#"{
        "name": "react",
        "full_name": "facebook/react",
        "description": "A JavaScript library",
        "owner": {"login": "facebook", "avatar_url": ""},
        "stargazers_count": 500,
        "forks_count": 100,
        "open_issues_count": 15,
        "language": "JavaScript",
        "created_at": "2013-05-24T16:15:54Z",
        "updated_at": "2024-05-01T00:00:00Z",
        "pushed_at": "2024-04-29T00:00:00Z",
        "license": {"key": "mit", "name": "MIT License"},
        "topics": ["ui", "react"]
    }"#;

    #[tokio::test]
    async fn test_get_repository_and_quota_headers() {
        let base = serve(vec![Route {
            path: "/repos/facebook/react",
            status: 200,
            headers: vec![
                ("x-ratelimit-limit", "5000"),
                ("x-ratelimit-remaining", "4999"),
                ("x-ratelimit-reset", "1714521600"),
                ("x-ratelimit-used", "1"),
            ],
            body: REPO_JSON,
        }])
        .await;
        let client = client(base);

        let repo = client.get_repository("facebook", "react").await.unwrap();
        assert_eq!(repo.full_name, "facebook/react");
        assert_eq!(repo.license.as_ref().map(|l| l.name.as_str()), Some("MIT License"));
        assert_eq!(repo.topics.len(), 2);
        assert_eq!(client.observed_rate_limit().map(|r| r.remaining), Some(4999));
    }

    #[tokio::test]
    async fn test_not_found_is_http_failure() {
        let base = serve(vec![]).await;
        let failure = client(base).get_repository("nobody", "nothing").await.unwrap_err();

        assert_eq!(
            failure,
            RawFailure::Http {
                status: 404,
                message: "Not Found".to_string(),
                rate_limit_remaining: None,
            }
        );
        assert_eq!(classify(failure).kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_exhausted_quota_classifies_as_rate_limit() {
        let base = serve(vec![Route {
            path: "/repos/facebook/react",
            status: 403,
            headers: vec![("x-ratelimit-remaining", "0")],
            body: r#"{"message":"Forbidden"}"#,
        }])
        .await;

        let failure = client(base).get_repository("facebook", "react").await.unwrap_err();
        let classified = classify(failure);
        assert_eq!(classified.kind, ErrorKind::RateLimit);
        assert_eq!(classified.status, Some(403));
    }

    #[tokio::test]
    async fn test_readme_probe_outcomes() {
        let base = serve(vec![
            route("/repos/a/present/readme", 200, r#"{"name":"README.md"}"#),
            route("/repos/a/broken/readme", 500, r#"{"message":"boom"}"#),
        ])
        .await;
        let client = client(base);

        assert_eq!(client.probe_readme("a", "present").await, ReadmeProbe::Present);
        assert_eq!(client.probe_readme("a", "missing").await, ReadmeProbe::Absent);
        let broken = client.probe_readme("a", "broken").await;
        assert!(matches!(broken, ReadmeProbe::Failed(_)));
        assert!(!broken.exists());
    }

    #[tokio::test]
    async fn test_empty_list_on_no_content() {
        let base = serve(vec![route("/repos/a/empty/contributors", 204, "")]).await;
        let contributors = client(base).list_contributors("a", "empty", 30).await.unwrap();
        assert!(contributors.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_status_prefers_core() {
        let base = serve(vec![route(
            "/rate_limit",
            200,
            r#"{"resources":{"core":{"limit":60,"remaining":42,"reset":1714521600,"used":18}},
                "rate":{"limit":1,"remaining":1,"reset":1,"used":0}}"#,
        )])
        .await;

        let status = client(base).rate_limit_status().await.unwrap();
        assert_eq!(status.limit, 60);
        assert_eq!(status.remaining, 42);
        assert!(!status.is_anomalous());
    }

    #[tokio::test]
    async fn test_rate_limit_status_rejects_unknown_shape() {
        let base = serve(vec![route("/rate_limit", 200, r#"{"unexpected":true}"#)]).await;
        let failure = client(base).rate_limit_status().await.unwrap_err();
        assert_eq!(classify(failure).kind, ErrorKind::Unknown);
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let failure = client(format!("http://{}", addr))
            .get_repository("a", "b")
            .await
            .unwrap_err();
        assert_eq!(classify(failure).kind, ErrorKind::NetworkError);
    }
}
