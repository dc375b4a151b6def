//! Wire-level tests for the GitHub client against a mock HTTP server.
//!
//! These verify payload decoding, error classification, transient-failure
//! retries, and rate-limit header bookkeeping without touching the network.

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use driftscan::core::config::RunConfig;
use driftscan::core::types::{PrSearchFilter, RepoRef};
use driftscan::forge::github::GitHubForge;
use driftscan::forge::rate::RateBudget;
use driftscan::forge::{Forge, ForgeError};

fn test_config(server: &MockServer) -> RunConfig {
    RunConfig {
        api_base: server.uri(),
        retry_max_attempts: 3,
        retry_base_delay_ms: 10,
        ..RunConfig::default()
    }
}

fn forge_with(config: RunConfig) -> (Arc<GitHubForge>, Arc<RateBudget>) {
    let budget = Arc::new(RateBudget::new(0));
    let forge = Arc::new(GitHubForge::new(
        "test-token",
        Arc::clone(&budget),
        &config,
    ));
    (forge, budget)
}

#[tokio::test]
async fn compare_decodes_counts_and_records_rate_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/compare/main...develop"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "status": "ahead",
                    "ahead_by": 2,
                    "behind_by": 0,
                    "total_commits": 2
                }))
                .insert_header("x-ratelimit-remaining", "4999")
                .insert_header("x-ratelimit-reset", "1893456000"),
        )
        .mount(&server)
        .await;

    let (forge, budget) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let cmp = forge.compare(&repo, "main", "develop").await.unwrap();

    assert_eq!(cmp.ahead_by, 2);
    assert_eq!(cmp.behind_by, 0);
    // The response headers refreshed the shared budget.
    let reset = budget.reset_at().unwrap();
    assert_eq!(reset.timestamp(), 1893456000);
}

#[tokio::test]
async fn unauthorized_is_a_fatal_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let err = forge.compare(&repo, "main", "develop").await.unwrap_err();

    assert!(matches!(err, ForgeError::AuthFailed(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn missing_branch_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/ghost"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");

    assert!(matches!(
        forge.branch_tip(&repo, "ghost").await,
        Err(ForgeError::NotFound(_))
    ));
    assert!(!forge.branch_exists(&repo, "ghost").await.unwrap());
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/main"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "message": "bad gateway" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/branches/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "main",
            "commit": { "sha": "abc123" }
        })))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let sha = forge.branch_tip(&repo, "main").await.unwrap();
    assert_eq!(sha, "abc123");
}

#[tokio::test]
async fn forbidden_with_exhausted_budget_is_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "API rate limit exceeded" }))
                .insert_header("x-ratelimit-remaining", "0")
                // A reset instant in the past so the test never sleeps
                .insert_header("x-ratelimit-reset", "1"),
        )
        .mount(&server)
        .await;

    let config = RunConfig {
        retry_max_attempts: 1,
        ..test_config(&server)
    };
    let (forge, _) = forge_with(config);
    let repo = RepoRef::new("acme", "widgets");

    assert!(matches!(
        forge.compare(&repo, "main", "develop").await,
        Err(ForgeError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn forbidden_with_budget_left_is_permission_denied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "message": "Resource not accessible" }))
                .insert_header("x-ratelimit-remaining", "4000")
                .insert_header("x-ratelimit-reset", "1893456000"),
        )
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let err = forge.compare(&repo, "main", "develop").await.unwrap_err();

    assert!(matches!(err, ForgeError::PermissionDenied(_)));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn search_feeds_pr_detail_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", "repo:acme/widgets is:pr is:merged base:main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "items": [ { "number": 7 } ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 7,
            "html_url": "https://github.com/acme/widgets/pull/7",
            "title": "Fix the frobnicator",
            "merged_at": "2024-03-01T12:00:00Z",
            "merge_commit_sha": "abc123",
            "head": { "ref": "fix/frob", "sha": "def456" },
            "base": { "ref": "main" },
            "user": { "login": "alice" }
        })))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let filter = PrSearchFilter {
        base: Some("main".into()),
        ..PrSearchFilter::default()
    };
    let prs = forge.search_merged_prs(&repo, &filter).await.unwrap();

    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].number, 7);
    assert_eq!(prs[0].head_sha, "def456");
    assert_eq!(prs[0].base_branch, "main");
    assert_eq!(prs[0].author.as_deref(), Some("alice"));
}

#[tokio::test]
async fn unmerged_search_hits_are_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 1,
            "items": [ { "number": 8 } ]
        })))
        .mount(&server)
        .await;
    // The search index said merged, the detail payload disagrees.
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/pulls/8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "number": 8,
            "html_url": "https://github.com/acme/widgets/pull/8",
            "title": "Still open",
            "merged_at": null,
            "merge_commit_sha": null,
            "head": { "ref": "wip", "sha": "fff" },
            "base": { "ref": "main" },
            "user": { "login": "bob" }
        })))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let prs = forge
        .search_merged_prs(&repo, &PrSearchFilter::default())
        .await
        .unwrap();
    assert!(prs.is_empty());
}

#[tokio::test]
async fn org_listing_falls_back_to_user_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orgs/alice/repos"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/alice/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "dotfiles", "default_branch": "main" }
        ])))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repos = forge.list_repos("alice").await.unwrap();

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].name, "dotfiles");
    assert_eq!(repos[0].default_branch.as_deref(), Some("main"));
}

#[tokio::test]
async fn create_pr_posts_and_decodes_the_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/widgets/pulls"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "number": 42,
            "html_url": "https://github.com/acme/widgets/pull/42"
        })))
        .mount(&server)
        .await;

    let (forge, _) = forge_with(test_config(&server));
    let repo = RepoRef::new("acme", "widgets");
    let created = forge
        .create_pr(
            &repo,
            driftscan::forge::CreatePrRequest {
                head: "fix".into(),
                base: "main".into(),
                title: "Fix (reopened)".into(),
                body: Some("Reopened from PR #7".into()),
            },
        )
        .await
        .unwrap();

    assert_eq!(created.number, 42);
    assert_eq!(created.url, "https://github.com/acme/widgets/pull/42");
}
