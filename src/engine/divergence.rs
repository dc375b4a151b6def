//! engine::divergence
//!
//! Per-repository branch divergence analysis.
//!
//! One symmetric comparison answers both directions at once, so a repository
//! costs at most three requests: optional default-branch lookup, a head
//! existence check, and the comparison itself.

use crate::core::types::{BranchComparison, RepoRef};
use crate::forge::{Forge, ForgeError};
use crate::resolve::ResolvedRepo;

/// Compare `head` against `base` in one repository.
///
/// When `base` is `None` the repository's default branch is used, taken from
/// the resolution payload when available and fetched otherwise. Missing
/// branches and repository-scoped failures fold into an unknown-status
/// comparison; only fatal errors propagate.
pub async fn check_repo(
    forge: &dyn Forge,
    resolved: &ResolvedRepo,
    head: &str,
    base: Option<&str>,
) -> Result<BranchComparison, ForgeError> {
    let repo = &resolved.repo;

    let base = match base {
        Some(base) => base.to_string(),
        None => match resolved.default_branch.clone() {
            Some(branch) => branch,
            None => match forge.default_branch(repo).await {
                Ok(branch) => branch,
                Err(e) => return fold(repo, head, "?", e),
            },
        },
    };

    match forge.branch_exists(repo, head).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(BranchComparison::unknown(
                repo.clone(),
                head,
                base,
                format!("branch '{}' not found", head),
            ))
        }
        Err(e) => return fold(repo, head, &base, e),
    }

    match forge.compare(repo, &base, head).await {
        Ok(cmp) => Ok(BranchComparison::from_counts(
            repo.clone(),
            head,
            base,
            cmp.ahead_by,
            cmp.behind_by,
        )),
        Err(ForgeError::NotFound(_)) => Ok(BranchComparison::unknown(
            repo.clone(),
            head,
            base.clone(),
            format!("branch '{}' not found", base),
        )),
        Err(e) => fold(repo, head, &base, e),
    }
}

fn fold(
    repo: &RepoRef,
    head: &str,
    base: &str,
    error: ForgeError,
) -> Result<BranchComparison, ForgeError> {
    if error.is_fatal() {
        return Err(error);
    }
    Ok(BranchComparison::unknown(
        repo.clone(),
        head,
        base,
        error.to_string(),
    ))
}
