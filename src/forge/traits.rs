//! forge::traits
//!
//! Forge trait definition for interacting with the remote host.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation involves network I/O.
//! All methods return `Result` so per-repository failures can be captured
//! at the coordinator boundary instead of aborting sibling repositories.
//!
//! Methods take a [`RepoRef`] rather than binding one repository at
//! construction time: a single client instance serves a whole organization
//! scan under one shared rate budget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::{PrSearchFilter, PullRequestRef, RepoRef};

/// Errors from forge operations.
///
/// Only the auth variants are fatal for a run; everything else is captured
/// per item by the coordinator.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// No credentials were available.
    #[error("authentication required")]
    AuthRequired,

    /// The token was rejected (invalid or expired). Fatal for the run.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The token is valid but lacks access to a specific resource.
    /// Scoped to that resource, never fatal.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded; carries the reset time when the host reported one.
    #[error("rate limited")]
    RateLimited {
        /// When the budget replenishes
        reset_at: Option<DateTime<Utc>>,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },
}

impl ForgeError {
    /// Whether this error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ForgeError::AuthRequired | ForgeError::AuthFailed(_))
    }

    /// Whether a retry with backoff might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::Network(_) => true,
            ForgeError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// One repository from an owner listing.
#[derive(Debug, Clone)]
pub struct RepoSummary {
    /// Repository name (without owner).
    pub name: String,
    /// Default branch, when the listing payload included it.
    pub default_branch: Option<String>,
}

/// Ahead/behind counts from a three-dot comparison.
///
/// Both directions come from one symmetric call; the counts are relative to
/// the merge base of the two refs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    /// Commits reachable from head but not base.
    pub ahead_by: u64,
    /// Commits reachable from base but not head.
    pub behind_by: u64,
}

/// Request to create a pull request.
#[derive(Debug, Clone)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes).
    pub head: String,
    /// Base branch name (the branch to merge into).
    pub base: String,
    /// PR title.
    pub title: String,
    /// PR body/description.
    pub body: Option<String>,
}

/// A newly created pull request.
#[derive(Debug, Clone)]
pub struct CreatedPr {
    /// PR number.
    pub number: u64,
    /// Web URL for viewing the PR.
    pub url: String,
}

/// The Forge trait for interacting with the remote host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance is shared across all
/// worker tasks.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// List all repositories under an owner, with default branches taken
    /// from the listing payload.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the owner does not exist or is inaccessible
    async fn list_repos(&self, owner: &str) -> Result<Vec<RepoSummary>, ForgeError>;

    /// Get a repository's default branch.
    async fn default_branch(&self, repo: &RepoRef) -> Result<String, ForgeError>;

    /// Check whether a branch exists.
    async fn branch_exists(&self, repo: &RepoRef, branch: &str) -> Result<bool, ForgeError>;

    /// Get the sha of a branch's current tip.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn branch_tip(&self, repo: &RepoRef, branch: &str) -> Result<String, ForgeError>;

    /// List all branch names in a repository.
    async fn list_branches(&self, repo: &RepoRef) -> Result<Vec<String>, ForgeError>;

    /// Three-dot comparison of two refs (`base...head`).
    ///
    /// Either ref may be a branch name or a commit sha. Reachability checks
    /// pass a sha as `base` and a snapshotted tip sha as `head`: the commit
    /// is an ancestor of the tip iff `behind_by == 0`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either ref does not exist in the repository
    async fn compare(
        &self,
        repo: &RepoRef,
        base: &str,
        head: &str,
    ) -> Result<Comparison, ForgeError>;

    /// Search merged PRs matching a filter, newest-updated first.
    ///
    /// Pagination is bounded by the host's search index limits and the
    /// configured result cap.
    async fn search_merged_prs(
        &self,
        repo: &RepoRef,
        filter: &PrSearchFilter,
    ) -> Result<Vec<PullRequestRef>, ForgeError>;

    /// Create a new pull request.
    async fn create_pr(
        &self,
        repo: &RepoRef,
        request: CreatePrRequest,
    ) -> Result<CreatedPr, ForgeError>;

    /// Request reviews on a PR from the given users.
    async fn request_reviewers(
        &self,
        repo: &RepoRef,
        number: u64,
        users: &[String],
    ) -> Result<(), ForgeError>;

    /// Delete a branch.
    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<(), ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_are_fatal() {
        assert!(ForgeError::AuthRequired.is_fatal());
        assert!(ForgeError::AuthFailed("expired".into()).is_fatal());
        assert!(!ForgeError::PermissionDenied("repo".into()).is_fatal());
        assert!(!ForgeError::NotFound("branch".into()).is_fatal());
        assert!(!ForgeError::RateLimited { reset_at: None }.is_fatal());
    }

    #[test]
    fn network_and_server_errors_are_transient() {
        assert!(ForgeError::Network("connection reset".into()).is_transient());
        assert!(ForgeError::Api {
            status: 502,
            message: "bad gateway".into()
        }
        .is_transient());
        assert!(!ForgeError::Api {
            status: 422,
            message: "validation".into()
        }
        .is_transient());
        assert!(!ForgeError::NotFound("x".into()).is_transient());
        assert!(!ForgeError::AuthFailed("x".into()).is_transient());
    }

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthFailed("bad token".into())),
            "authentication failed: bad token"
        );
        assert_eq!(
            format!("{}", ForgeError::RateLimited { reset_at: None }),
            "rate limited"
        );
        assert_eq!(
            format!(
                "{}",
                ForgeError::Api {
                    status: 422,
                    message: "Validation failed".into()
                }
            ),
            "API error: 422 - Validation failed"
        );
    }
}
