//! core::types
//!
//! Domain types shared across the resolver, engines, and renderers.
//!
//! # Design
//!
//! All remote API payloads are decoded into these types at the forge
//! boundary. Downstream code (engines, CLI, tables) never sees raw JSON.
//!
//! Snapshots are immutable: a [`PullRequestRef`] captures PR state at
//! discovery time and is never refreshed mid-run.

use chrono::{DateTime, NaiveDate, Utc};

/// A repository identifier: owner plus name.
///
/// The unique key for a repository is its slug, `owner/name`. The resolver
/// guarantees slugs are deduplicated and lexicographically ordered for the
/// lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoRef {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Create a new repository reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// The `owner/name` slug used as the repository's unique key.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Relationship between two branch tips relative to their merge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DivergenceStatus {
    /// Head has commits base lacks; base has none head lacks.
    Ahead,
    /// Base has commits head lacks; head has none base lacks.
    Behind,
    /// Both branches have commits the other lacks.
    Diverged,
    /// Both tips resolve to the same commit.
    Identical,
    /// A branch was missing or the comparison failed.
    Unknown,
}

impl DivergenceStatus {
    /// Classify an ahead/behind pair.
    ///
    /// The four definite statuses partition the non-negative count plane;
    /// [`DivergenceStatus::Unknown`] is never produced here and is reserved
    /// for failed or impossible comparisons.
    pub fn classify(ahead_by: u64, behind_by: u64) -> Self {
        match (ahead_by, behind_by) {
            (0, 0) => DivergenceStatus::Identical,
            (_, 0) => DivergenceStatus::Ahead,
            (0, _) => DivergenceStatus::Behind,
            (_, _) => DivergenceStatus::Diverged,
        }
    }
}

impl std::fmt::Display for DivergenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DivergenceStatus::Ahead => write!(f, "ahead"),
            DivergenceStatus::Behind => write!(f, "behind"),
            DivergenceStatus::Diverged => write!(f, "diverged"),
            DivergenceStatus::Identical => write!(f, "identical"),
            DivergenceStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Result of comparing a head branch against a base branch.
#[derive(Debug, Clone)]
pub struct BranchComparison {
    /// Repository the comparison ran in.
    pub repo: RepoRef,
    /// Head branch (the branch that might be ahead).
    pub head: String,
    /// Base branch (the branch compared against).
    pub base: String,
    /// Commits on head that base lacks.
    pub ahead_by: u64,
    /// Commits on base that head lacks.
    pub behind_by: u64,
    /// Derived classification of the pair.
    pub status: DivergenceStatus,
    /// Cause attached when `status` is `Unknown`.
    pub error: Option<String>,
}

impl BranchComparison {
    /// Build a comparison from ahead/behind counts.
    pub fn from_counts(
        repo: RepoRef,
        head: impl Into<String>,
        base: impl Into<String>,
        ahead_by: u64,
        behind_by: u64,
    ) -> Self {
        Self {
            repo,
            head: head.into(),
            base: base.into(),
            ahead_by,
            behind_by,
            status: DivergenceStatus::classify(ahead_by, behind_by),
            error: None,
        }
    }

    /// Build an unknown-status comparison with an attached cause.
    pub fn unknown(
        repo: RepoRef,
        head: impl Into<String>,
        base: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            head: head.into(),
            base: base.into(),
            ahead_by: 0,
            behind_by: 0,
            status: DivergenceStatus::Unknown,
            error: Some(cause.into()),
        }
    }
}

/// Immutable snapshot of a merged pull request, taken at discovery time.
#[derive(Debug, Clone)]
pub struct PullRequestRef {
    /// Repository the PR belongs to.
    pub repo: RepoRef,
    /// PR number.
    pub number: u64,
    /// PR title.
    pub title: String,
    /// Web URL for viewing the PR.
    pub url: String,
    /// Head branch (the branch with changes).
    pub head_branch: String,
    /// Base branch as recorded at merge time.
    pub base_branch: String,
    /// When the PR was merged.
    pub merged_at: DateTime<Utc>,
    /// Login of the PR author, when known.
    pub author: Option<String>,
    /// Sha of the PR's head commit.
    pub head_sha: String,
    /// Sha of the merge commit, when the host recorded one.
    pub merge_commit_sha: Option<String>,
}

/// Whether a merged PR's commits are still reachable from the current tip
/// of its recorded base branch.
///
/// `Unknown` is deliberately distinct from both definite answers: a PR whose
/// check exhausted retries must never be conflated with a confirmed orphan,
/// since orphan results can trigger PR recreation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The PR's commits are ancestors of the base branch's current tip.
    Reachable,
    /// The merge was undone by a history rewrite; commits are gone.
    Orphaned,
    /// The check could not be completed; carries the last error.
    Unknown(String),
}

impl Reachability {
    /// True only for a confirmed orphan.
    pub fn is_orphaned(&self) -> bool {
        matches!(self, Reachability::Orphaned)
    }

    /// True when the check was inconclusive.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Reachability::Unknown(_))
    }
}

/// A pull request paired with its reachability determination.
#[derive(Debug, Clone)]
pub struct OrphanResult {
    /// The PR that was checked.
    pub pr: PullRequestRef,
    /// Reachability against the current base-branch tip.
    pub reachability: Reachability,
}

/// Errors specific to recreating an orphaned PR.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReopenError {
    /// The original head branch no longer exists on the remote.
    #[error("source branch '{0}' not found; it may have been deleted")]
    SourceBranchMissing(String),
    /// PR creation failed.
    #[error("create failed: {0}")]
    Create(String),
    /// The PR was created but the review request failed.
    #[error("review request failed: {0}")]
    ReviewRequest(String),
}

/// Outcome of one recreation attempt for one orphaned PR.
///
/// At most one outcome exists per orphan per run. Create and review-request
/// are two steps: a created PR is reported even when the review request
/// fails afterwards.
#[derive(Debug, Clone)]
pub struct ReopenOutcome {
    /// The orphaned PR this attempt was for.
    pub original: PullRequestRef,
    /// Number of the recreated PR, when creation succeeded.
    pub new_pr_number: Option<u64>,
    /// URL of the recreated PR, when creation succeeded.
    pub new_pr_url: Option<String>,
    /// Whether a review was successfully requested from the original author.
    pub review_requested: bool,
    /// Error attached when any step failed.
    pub error: Option<ReopenError>,
}

/// Filters applied when discovering merged PRs.
#[derive(Debug, Clone, Default)]
pub struct PrSearchFilter {
    /// Only PRs merged into this branch.
    pub base: Option<String>,
    /// Only PRs merged on or after this date.
    pub merged_after: Option<NaiveDate>,
    /// Only PRs merged on or before this date.
    pub merged_before: Option<NaiveDate>,
    /// Free-text terms in the host's search syntax.
    pub search: Option<String>,
}

impl PrSearchFilter {
    /// Render the filter as search-qualifier terms.
    ///
    /// The repository and `is:pr is:merged` qualifiers are the client's
    /// responsibility; this covers only the user-supplied narrowing.
    pub fn query_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        if let Some(base) = &self.base {
            terms.push(format!("base:{}", base));
        }
        if let Some(after) = &self.merged_after {
            terms.push(format!("merged:>={}", after.format("%Y-%m-%d")));
        }
        if let Some(before) = &self.merged_before {
            terms.push(format!("merged:<={}", before.format("%Y-%m-%d")));
        }
        if let Some(search) = &self.search {
            terms.push(search.clone());
        }
        terms
    }
}
