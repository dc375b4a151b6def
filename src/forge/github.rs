//! forge::github
//!
//! GitHub forge implementation over the REST and Search APIs.
//!
//! # Design
//!
//! One `GitHubForge` serves every repository in a run. It owns:
//! - the HTTP client and bearer token
//! - the shared [`RateBudget`], refreshed from the rate-limit headers of
//!   every response and consulted before each request is issued
//! - the retry state machine for transient failures (connect errors, 5xx),
//!   bounded by configuration
//!
//! # Error mapping
//!
//! - 401 → [`ForgeError::AuthFailed`] (fatal for the run)
//! - 403 with an exhausted budget → [`ForgeError::RateLimited`]
//! - other 403 → [`ForgeError::PermissionDenied`] (scoped to that resource)
//! - 404 → [`ForgeError::NotFound`]
//! - 429 → [`ForgeError::RateLimited`]
//! - 5xx → [`ForgeError::Api`], retried with backoff
//!
//! Rate-limited responses zero the budget and re-enter the cooperative
//! pause rather than failing the request outright.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::rate::RateBudget;
use super::retry::Backoff;
use super::traits::{
    Comparison, CreatePrRequest, CreatedPr, Forge, ForgeError, RepoSummary,
};
use crate::core::config::RunConfig;
use crate::core::types::{PrSearchFilter, PullRequestRef, RepoRef};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "driftscan-cli";

/// GitHub's maximum page size.
const PER_PAGE: usize = 100;

/// The Search API serves at most 1000 results (10 pages of 100).
const MAX_SEARCH_PAGES: usize = 10;

/// Safety cap on listing pagination.
const MAX_LIST_PAGES: usize = 100;

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Bearer token for authentication
    token: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// Shared rate-limit budget for the run
    budget: Arc<RateBudget>,
    /// Attempts per request for transient failures
    retry_max_attempts: u32,
    /// Base delay for exponential backoff
    retry_base_delay: Duration,
    /// Cap on merged-PR search results per repository
    max_search_results: usize,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("api_base", &self.api_base)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .field("max_search_results", &self.max_search_results)
            .finish()
    }
}

impl GitHubForge {
    /// Create a forge from a token, a shared budget, and run configuration.
    pub fn new(token: impl Into<String>, budget: Arc<RateBudget>, config: &RunConfig) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            budget,
            retry_max_attempts: config.retry_max_attempts,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_search_results: config.max_search_results,
        }
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, repo: &RepoRef, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, repo.owner, repo.name, path
        )
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token))
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Refresh the shared budget from response headers.
    fn record_budget(&self, response: &Response) {
        let remaining = header_u64(response, "x-ratelimit-remaining");
        let reset_at = header_u64(response, "x-ratelimit-reset")
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single());
        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            self.budget.record(remaining, reset_at);
        }
    }

    /// Issue a request, gating on the budget and retrying transient failures.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response, ForgeError> {
        let headers = self.headers()?;
        let mut backoff = Backoff::new(self.retry_max_attempts, self.retry_base_delay);

        loop {
            self.budget.acquire().await;

            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(headers.clone());
            if let Some(ref body) = body {
                request = request.json(body);
            }

            let error = match request.send().await {
                Ok(response) => {
                    self.record_budget(&response);
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    self.classify_error(response, status).await
                }
                Err(e) => ForgeError::Network(e.to_string()),
            };

            // Rate-limited responses zero the budget so the next acquire()
            // pauses until the reset instant before retrying.
            if let ForgeError::RateLimited { reset_at } = &error {
                let reset = reset_at.unwrap_or_else(|| Utc::now() + chrono::Duration::seconds(60));
                self.budget.record(0, reset);
                if backoff.next_delay().is_some() {
                    continue;
                }
                return Err(error);
            }

            if !error.is_transient() {
                return Err(error);
            }
            match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(error),
            }
        }
    }

    /// Map an error response into a typed failure, consuming the body.
    async fn classify_error(&self, response: Response, status: StatusCode) -> ForgeError {
        let remaining = header_u64(&response, "x-ratelimit-remaining");
        let reset_at = header_u64(&response, "x-ratelimit-reset")
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single());
        let required_scopes = response
            .headers()
            .get("X-Accepted-OAuth-Scopes")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("invalid or expired token".into()),
            StatusCode::FORBIDDEN if remaining == Some(0) => ForgeError::RateLimited { reset_at },
            StatusCode::FORBIDDEN => {
                let mut msg = message;
                if let Some(scopes) = required_scopes {
                    if !scopes.is_empty() {
                        msg.push_str(&format!(" [required scopes: {}]", scopes));
                    }
                }
                ForgeError::PermissionDenied(msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited { reset_at },
            _ => ForgeError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// GET a JSON payload.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ForgeError> {
        let response = self.execute(Method::GET, url, None).await?;
        let status = response.status();
        response.json().await.map_err(|e| ForgeError::Api {
            status: status.as_u16(),
            message: format!("failed to parse response: {}", e),
        })
    }

    /// List repositories under one endpoint, following pagination.
    async fn list_repo_pages(&self, url_base: &str) -> Result<Vec<RepoSummary>, ForgeError> {
        let mut repos = Vec::new();
        for page in 1..=MAX_LIST_PAGES {
            let url = format!("{}?type=all&per_page={}&page={}", url_base, PER_PAGE, page);
            let items: Vec<GitHubRepoListItem> = self.get_json(&url).await?;
            let count = items.len();
            repos.extend(items.into_iter().map(|item| RepoSummary {
                name: item.name,
                default_branch: item.default_branch,
            }));
            if count < PER_PAGE {
                break;
            }
        }
        Ok(repos)
    }

    /// Fetch one PR's detail payload and convert it to a snapshot.
    ///
    /// Returns `None` for PRs that vanished between search and fetch, or
    /// that the search index misreported as merged.
    async fn fetch_pr_detail(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<PullRequestRef>, ForgeError> {
        let url = self.repo_url(repo, &format!("pulls/{}", number));
        let detail: GitHubPullRequest = match self.get_json(&url).await {
            Ok(detail) => detail,
            Err(ForgeError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let merged_at = match detail.merged_at {
            Some(merged_at) => merged_at,
            None => return Ok(None),
        };

        Ok(Some(PullRequestRef {
            repo: repo.clone(),
            number: detail.number,
            title: detail.title,
            url: detail.html_url,
            head_branch: detail.head.ref_name,
            base_branch: detail.base.ref_name,
            merged_at,
            author: detail.user.map(|u| u.login),
            head_sha: detail.head.sha,
            merge_commit_sha: detail.merge_commit_sha,
        }))
    }
}

/// Build the search query for merged PRs in one repository.
fn search_query(repo: &RepoRef, filter: &PrSearchFilter) -> String {
    let mut parts = vec![format!("repo:{}", repo.slug()), "is:pr".into(), "is:merged".into()];
    parts.extend(filter.query_terms());
    parts.join(" ")
}

/// Read a numeric response header.
fn header_u64(response: &Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn list_repos(&self, owner: &str) -> Result<Vec<RepoSummary>, ForgeError> {
        let org_url = format!("{}/orgs/{}/repos", self.api_base, owner);
        match self.list_repo_pages(&org_url).await {
            Ok(repos) => Ok(repos),
            // Owner may be a user rather than an organization
            Err(ForgeError::NotFound(_)) => {
                let user_url = format!("{}/users/{}/repos", self.api_base, owner);
                self.list_repo_pages(&user_url).await
            }
            Err(e) => Err(e),
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, ForgeError> {
        let url = format!("{}/repos/{}/{}", self.api_base, repo.owner, repo.name);
        let detail: GitHubRepoDetail = self.get_json(&url).await?;
        Ok(detail.default_branch)
    }

    async fn branch_exists(&self, repo: &RepoRef, branch: &str) -> Result<bool, ForgeError> {
        match self.branch_tip(repo, branch).await {
            Ok(_) => Ok(true),
            Err(ForgeError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        let url = self.repo_url(repo, &format!("branches/{}", branch));
        let detail: GitHubBranch = self.get_json(&url).await?;
        Ok(detail.commit.sha)
    }

    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<String>, ForgeError> {
        let mut branches = Vec::new();
        for page in 1..=MAX_LIST_PAGES {
            let url = self.repo_url(
                repo,
                &format!("branches?per_page={}&page={}", PER_PAGE, page),
            );
            let items: Vec<GitHubBranch> = self.get_json(&url).await?;
            let count = items.len();
            branches.extend(items.into_iter().map(|b| b.name));
            if count < PER_PAGE {
                break;
            }
        }
        Ok(branches)
    }

    async fn compare(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ForgeError> {
        let url = self.repo_url(repo, &format!("compare/{}...{}", base, head));
        let detail: GitHubComparison = self.get_json(&url).await?;
        Ok(Comparison {
            ahead_by: detail.ahead_by,
            behind_by: detail.behind_by,
        })
    }

    async fn search_merged_prs(
        &self,
        repo: &RepoRef,
        filter: &PrSearchFilter,
    ) -> Result<Vec<PullRequestRef>, ForgeError> {
        let query = search_query(repo, filter);
        let mut prs: Vec<PullRequestRef> = Vec::new();

        'pages: for page in 1..=MAX_SEARCH_PAGES {
            let url = format!(
                "{}/search/issues?q={}&sort=updated&order=desc&per_page={}&page={}",
                self.api_base,
                urlencode(&query),
                PER_PAGE,
                page
            );
            let results: GitHubSearchResults = self.get_json(&url).await?;
            let count = results.items.len();

            for item in results.items {
                if prs.len() >= self.max_search_results {
                    break 'pages;
                }
                if let Some(pr) = self.fetch_pr_detail(repo, item.number).await? {
                    prs.push(pr);
                }
            }

            if count < PER_PAGE {
                break;
            }
        }

        Ok(prs)
    }

    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<CreatedPr, ForgeError> {
        let url = self.repo_url(repo, "pulls");
        let body = serde_json::json!({
            "head": request.head,
            "base": request.base,
            "title": request.title,
            "body": request.body,
        });
        let response = self.execute(Method::POST, &url, Some(body)).await?;
        let status = response.status();
        let created: GitHubCreatedPr = response.json().await.map_err(|e| ForgeError::Api {
            status: status.as_u16(),
            message: format!("failed to parse response: {}", e),
        })?;
        Ok(CreatedPr {
            number: created.number,
            url: created.html_url,
        })
    }

    async fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        users: &[String],
    ) -> Result<(), ForgeError> {
        if users.is_empty() {
            return Ok(());
        }
        let url = self.repo_url(repo, &format!("pulls/{}/requested_reviewers", number));
        let body = serde_json::json!({ "reviewers": users });
        self.execute(Method::POST, &url, Some(body)).await?;
        Ok(())
    }

    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError> {
        let url = self.repo_url(repo, &format!("git/refs/heads/{}", branch));
        self.execute(Method::DELETE, &url, None).await?;
        Ok(())
    }
}

/// Percent-encode a search query (space and the few reserved characters the
/// Search API cares about).
fn urlencode(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '&' => out.push_str("%26"),
            '+' => out.push_str("%2B"),
            '?' => out.push_str("%3F"),
            _ => out.push(c),
        }
    }
    out
}

// --------------------------------------------------------------------------
// API Response Types
// --------------------------------------------------------------------------

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Repository entry from a listing endpoint.
#[derive(Deserialize)]
struct GitHubRepoListItem {
    name: String,
    default_branch: Option<String>,
}

/// Repository detail payload (subset).
#[derive(Deserialize)]
struct GitHubRepoDetail {
    default_branch: String,
}

/// Branch payload from listing and single-branch endpoints.
#[derive(Deserialize)]
struct GitHubBranch {
    #[serde(default)]
    name: String,
    commit: GitHubCommitRef,
}

/// Commit pointer inside a branch payload.
#[derive(Deserialize)]
struct GitHubCommitRef {
    sha: String,
}

/// Comparison payload (subset).
#[derive(Deserialize)]
struct GitHubComparison {
    ahead_by: u64,
    behind_by: u64,
}

/// Search results wrapper.
#[derive(Deserialize)]
struct GitHubSearchResults {
    items: Vec<GitHubSearchItem>,
}

/// One search hit; only the number is needed before the detail fetch.
#[derive(Deserialize)]
struct GitHubSearchItem {
    number: u64,
}

/// PR detail payload (subset).
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
    title: String,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
    head: GitHubHeadRef,
    base: GitHubBaseRef,
    user: Option<GitHubUser>,
}

/// Head ref with sha.
#[derive(Deserialize)]
struct GitHubHeadRef {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: String,
}

/// Base ref.
#[derive(Deserialize)]
struct GitHubBaseRef {
    #[serde(rename = "ref")]
    ref_name: String,
}

/// PR author.
#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

/// Created-PR payload (subset).
#[derive(Deserialize, Serialize)]
struct GitHubCreatedPr {
    number: u64,
    html_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forge() -> GitHubForge {
        GitHubForge::new(
            "token",
            Arc::new(RateBudget::new(25)),
            &RunConfig::default(),
        )
    }

    #[test]
    fn repo_url_format() {
        let forge = forge();
        let repo = RepoRef::new("octocat", "hello-world");
        assert_eq!(
            forge.repo_url(&repo, "pulls"),
            "https://api.github.com/repos/octocat/hello-world/pulls"
        );
        assert_eq!(
            forge.repo_url(&repo, "compare/main...dev"),
            "https://api.github.com/repos/octocat/hello-world/compare/main...dev"
        );
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let config = RunConfig {
            api_base: "https://github.example.com/api/v3/".into(),
            ..RunConfig::default()
        };
        let forge = GitHubForge::new("token", Arc::new(RateBudget::new(25)), &config);
        assert_eq!(forge.api_base, "https://github.example.com/api/v3");
    }

    #[test]
    fn debug_redacts_token() {
        let output = format!("{:?}", forge());
        assert!(!output.contains("token"));
        assert!(output.contains("api_base"));
    }

    #[test]
    fn search_query_includes_all_qualifiers() {
        let repo = RepoRef::new("acme", "widgets");
        let filter = PrSearchFilter {
            base: Some("main".into()),
            search: Some("author:alice".into()),
            ..PrSearchFilter::default()
        };
        assert_eq!(
            search_query(&repo, &filter),
            "repo:acme/widgets is:pr is:merged base:main author:alice"
        );
    }

    #[test]
    fn urlencode_escapes_spaces() {
        assert_eq!(
            urlencode("repo:a/b is:pr is:merged"),
            "repo:a/b%20is:pr%20is:merged"
        );
    }

    #[test]
    fn pull_request_payload_decodes() {
        let payload = serde_json::json!({
            "number": 7,
            "html_url": "https://github.com/acme/widgets/pull/7",
            "title": "Fix the frobnicator",
            "merged_at": "2024-03-01T12:00:00Z",
            "merge_commit_sha": "abc123",
            "head": { "ref": "fix/frob", "sha": "def456" },
            "base": { "ref": "main" },
            "user": { "login": "alice" }
        });
        let pr: GitHubPullRequest = serde_json::from_value(payload).unwrap();
        assert_eq!(pr.number, 7);
        assert_eq!(pr.head.sha, "def456");
        assert_eq!(pr.base.ref_name, "main");
        assert_eq!(pr.user.unwrap().login, "alice");
    }

    #[test]
    fn comparison_payload_decodes() {
        let payload = serde_json::json!({
            "ahead_by": 2,
            "behind_by": 0,
            "status": "ahead",
            "total_commits": 2
        });
        let cmp: GitHubComparison = serde_json::from_value(payload).unwrap();
        assert_eq!(cmp.ahead_by, 2);
        assert_eq!(cmp.behind_by, 0);
    }
}
