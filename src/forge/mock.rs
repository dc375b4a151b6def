//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock stores a small world model in memory: owners with repositories,
//! branches with tip shas, comparison results keyed by `(repo, base, head)`,
//! and merged PRs. Failure injection covers per-repository errors (for
//! partial-failure scenarios) and per-comparison error sequences (for retry
//! and retry-exhaustion scenarios).

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{
    Comparison, CreatePrRequest, CreatedPr, Forge, ForgeError, RepoSummary,
};
use crate::core::types::{PrSearchFilter, PullRequestRef, RepoRef};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug, Default)]
struct MockForgeInner {
    /// Owner -> repository summaries, in insertion order.
    owners: BTreeMap<String, Vec<RepoSummary>>,
    /// Slug -> default branch.
    default_branches: HashMap<String, String>,
    /// Slug -> branch name -> tip sha.
    branches: HashMap<String, BTreeMap<String, String>>,
    /// (slug, base, head) -> comparison.
    comparisons: HashMap<(String, String, String), Comparison>,
    /// (slug, base, head) -> errors returned before the comparison succeeds
    /// (or keeps failing once drained, if no comparison is seeded).
    comparison_failures: HashMap<(String, String, String), VecDeque<ForgeError>>,
    /// Slug -> error returned by every operation against that repository.
    repo_errors: HashMap<String, ForgeError>,
    /// Slug -> merged PRs served by search.
    merged_prs: HashMap<String, Vec<PullRequestRef>>,
    /// Recorded PR creations.
    created_prs: Vec<(RepoRef, CreatePrRequest)>,
    /// Recorded review requests.
    review_requests: Vec<(String, u64, Vec<String>)>,
    /// Recorded branch deletions.
    deleted_branches: Vec<(String, String)>,
    /// Error injected into the next create_pr calls.
    fail_create: Option<ForgeError>,
    /// Error injected into the next request_reviewers calls.
    fail_reviewers: Option<ForgeError>,
    /// (slug, branch) -> error injected into delete_branch.
    delete_failures: HashMap<(String, String), ForgeError>,
    /// Next PR number handed out by create_pr.
    next_pr_number: u64,
}

impl MockForge {
    /// Create a new empty mock forge.
    pub fn new() -> Self {
        let forge = Self::default();
        forge.lock().next_pr_number = 100;
        forge
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed a repository under an owner.
    pub fn add_repo(&self, owner: &str, name: &str, default_branch: &str) -> RepoRef {
        let repo = RepoRef::new(owner, name);
        let mut inner = self.lock();
        inner.owners.entry(owner.to_string()).or_default().push(RepoSummary {
            name: name.to_string(),
            default_branch: Some(default_branch.to_string()),
        });
        inner
            .default_branches
            .insert(repo.slug(), default_branch.to_string());
        repo
    }

    /// Seed a branch with a tip sha.
    pub fn set_branch(&self, repo: &RepoRef, branch: &str, tip_sha: &str) {
        self.lock()
            .branches
            .entry(repo.slug())
            .or_default()
            .insert(branch.to_string(), tip_sha.to_string());
    }

    /// Seed a comparison result for `base...head`.
    pub fn set_comparison(&self, repo: &RepoRef, base: &str, head: &str, ahead: u64, behind: u64) {
        self.lock().comparisons.insert(
            (repo.slug(), base.to_string(), head.to_string()),
            Comparison {
                ahead_by: ahead,
                behind_by: behind,
            },
        );
    }

    /// Inject errors returned by `compare(base, head)` before any seeded
    /// result is served. With no seeded result, the last error repeats.
    pub fn fail_comparison(&self, repo: &RepoRef, base: &str, head: &str, errors: Vec<ForgeError>) {
        self.lock()
            .comparison_failures
            .insert((repo.slug(), base.to_string(), head.to_string()), errors.into());
    }

    /// Make every operation against one repository fail.
    pub fn fail_repo(&self, repo: &RepoRef, error: ForgeError) {
        self.lock().repo_errors.insert(repo.slug(), error);
    }

    /// Seed a merged PR served by search.
    pub fn add_merged_pr(&self, pr: PullRequestRef) {
        self.lock()
            .merged_prs
            .entry(pr.repo.slug())
            .or_default()
            .push(pr);
    }

    /// Make create_pr fail with the given error.
    pub fn fail_create_pr(&self, error: ForgeError) {
        self.lock().fail_create = Some(error);
    }

    /// Make request_reviewers fail with the given error.
    pub fn fail_request_reviewers(&self, error: ForgeError) {
        self.lock().fail_reviewers = Some(error);
    }

    /// Make deleting one branch fail with the given error.
    pub fn fail_delete_branch(&self, repo: &RepoRef, branch: &str, error: ForgeError) {
        self.lock()
            .delete_failures
            .insert((repo.slug(), branch.to_string()), error);
    }

    /// PR creations recorded so far.
    pub fn created_prs(&self) -> Vec<(RepoRef, CreatePrRequest)> {
        self.lock().created_prs.clone()
    }

    /// Review requests recorded so far, as `(slug, number, users)`.
    pub fn review_requests(&self) -> Vec<(String, u64, Vec<String>)> {
        self.lock().review_requests.clone()
    }

    /// Branch deletions recorded so far, as `(slug, branch)`.
    pub fn deleted_branches(&self) -> Vec<(String, String)> {
        self.lock().deleted_branches.clone()
    }

    fn check_repo_error(inner: &MockForgeInner, repo: &RepoRef) -> Result<(), ForgeError> {
        match inner.repo_errors.get(&repo.slug()) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_repos(&self, owner: &str) -> Result<Vec<RepoSummary>, ForgeError> {
        let inner = self.lock();
        match inner.owners.get(owner) {
            Some(repos) => Ok(repos.clone()),
            None => Err(ForgeError::NotFound(format!("owner '{}'", owner))),
        }
    }

    async fn default_branch(&self, repo: &RepoRef) -> Result<String, ForgeError> {
        let inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        inner
            .default_branches
            .get(&repo.slug())
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("repository '{}'", repo)))
    }

    async fn branch_exists(&self, repo: &RepoRef, branch: &str) -> Result<bool, ForgeError> {
        let inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        Ok(inner
            .branches
            .get(&repo.slug())
            .is_some_and(|branches| branches.contains_key(branch)))
    }

    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError> {
        let inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        inner
            .branches
            .get(&repo.slug())
            .and_then(|branches| branches.get(branch))
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))
    }

    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<String>, ForgeError> {
        let inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        Ok(inner
            .branches
            .get(&repo.slug())
            .map(|branches| branches.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn compare(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ForgeError> {
        let mut inner = self.lock();
        Self::check_repo_error(&inner, repo)?;

        let key = (repo.slug(), base.to_string(), head.to_string());
        let has_seeded_success = inner.comparisons.contains_key(&key);
        if let Some(failures) = inner.comparison_failures.get_mut(&key) {
            if let Some(error) = failures.pop_front() {
                // With no seeded success, keep failing with the last error
                if failures.is_empty() && !has_seeded_success {
                    failures.push_back(error.clone());
                }
                return Err(error);
            }
        }

        inner
            .comparisons
            .get(&key)
            .copied()
            .ok_or_else(|| ForgeError::NotFound(format!("compare {}...{}", base, head)))
    }

    async fn search_merged_prs(
        &self,
        repo: &RepoRef,
        filter: &PrSearchFilter,
    ) -> Result<Vec<PullRequestRef>, ForgeError> {
        let inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        let mut prs: Vec<PullRequestRef> = inner
            .merged_prs
            .get(&repo.slug())
            .map(|prs| {
                prs.iter()
                    .filter(|pr| {
                        filter
                            .base
                            .as_ref()
                            .is_none_or(|base| &pr.base_branch == base)
                    })
                    .filter(|pr| {
                        filter
                            .merged_after
                            .is_none_or(|after| pr.merged_at.date_naive() >= after)
                    })
                    .filter(|pr| {
                        filter
                            .merged_before
                            .is_none_or(|before| pr.merged_at.date_naive() <= before)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        // Search serves newest-updated first; merged order is close enough
        // for the mock.
        prs.sort_by(|a, b| b.merged_at.cmp(&a.merged_at));
        Ok(prs)
    }

    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<CreatedPr, ForgeError> {
        let mut inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        if let Some(error) = inner.fail_create.clone() {
            return Err(error);
        }
        let number = inner.next_pr_number;
        inner.next_pr_number += 1;
        inner.created_prs.push((repo.clone(), request));
        Ok(CreatedPr {
            number,
            url: format!("https://github.com/{}/pull/{}", repo.slug(), number),
        })
    }

    async fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        users: &[String],
    ) -> Result<(), ForgeError> {
        let mut inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        if let Some(error) = inner.fail_reviewers.clone() {
            return Err(error);
        }
        inner
            .review_requests
            .push((repo.slug(), number, users.to_vec()));
        Ok(())
    }

    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError> {
        let mut inner = self.lock();
        Self::check_repo_error(&inner, repo)?;
        if let Some(error) = inner
            .delete_failures
            .get(&(repo.slug(), branch.to_string()))
        {
            return Err(error.clone());
        }
        if let Some(branches) = inner.branches.get_mut(&repo.slug()) {
            branches.remove(branch);
        }
        let slug = repo.slug();
        inner.deleted_branches.push((slug, branch.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_repo_is_listed_with_default_branch() {
        let forge = MockForge::new();
        forge.add_repo("acme", "widgets", "main");

        let repos = forge.list_repos("acme").await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "widgets");
        assert_eq!(repos[0].default_branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let forge = MockForge::new();
        assert!(matches!(
            forge.list_repos("ghost").await,
            Err(ForgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn comparison_failures_drain_before_success() {
        let forge = MockForge::new();
        let repo = forge.add_repo("acme", "widgets", "main");
        forge.set_comparison(&repo, "main", "dev", 2, 0);
        forge.fail_comparison(
            &repo,
            "main",
            "dev",
            vec![ForgeError::Network("reset".into())],
        );

        assert!(forge.compare(&repo, "main", "dev").await.is_err());
        let cmp = forge.compare(&repo, "main", "dev").await.unwrap();
        assert_eq!(cmp.ahead_by, 2);
    }

    #[tokio::test]
    async fn comparison_failures_repeat_without_seeded_success() {
        let forge = MockForge::new();
        let repo = forge.add_repo("acme", "widgets", "main");
        forge.fail_comparison(
            &repo,
            "main",
            "dev",
            vec![ForgeError::Network("reset".into())],
        );

        for _ in 0..5 {
            assert!(matches!(
                forge.compare(&repo, "main", "dev").await,
                Err(ForgeError::Network(_))
            ));
        }
    }

    #[tokio::test]
    async fn repo_error_applies_to_all_operations() {
        let forge = MockForge::new();
        let repo = forge.add_repo("acme", "private", "main");
        forge.fail_repo(&repo, ForgeError::PermissionDenied("no access".into()));

        assert!(forge.default_branch(&repo).await.is_err());
        assert!(forge.compare(&repo, "main", "dev").await.is_err());
        assert!(forge.list_branches(&repo).await.is_err());
    }

    #[tokio::test]
    async fn create_pr_assigns_numbers_and_records() {
        let forge = MockForge::new();
        let repo = forge.add_repo("acme", "widgets", "main");

        let created = forge
            .create_pr(
                &repo,
                CreatePrRequest {
                    head: "fix".into(),
                    base: "main".into(),
                    title: "Fix".into(),
                    body: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(created.number, 100);
        assert_eq!(forge.created_prs().len(), 1);
    }

    #[tokio::test]
    async fn delete_branch_removes_it() {
        let forge = MockForge::new();
        let repo = forge.add_repo("acme", "widgets", "main");
        forge.set_branch(&repo, "stale", "abc");

        forge.delete_branch(&repo, "stale").await.unwrap();
        assert!(!forge.branch_exists(&repo, "stale").await.unwrap());
        assert_eq!(forge.deleted_branches().len(), 1);
    }
}
