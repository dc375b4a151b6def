//! engine::prune
//!
//! Deletion of fully merged branches.
//!
//! A branch is prunable when it has no commits its repository's default
//! branch lacks, which the same symmetric comparison used everywhere else
//! answers: `ahead_by == 0` with the default branch as base. The default
//! branch itself is never a candidate. In report mode nothing is deleted.

use regex::Regex;

use crate::core::types::RepoRef;
use crate::forge::{Forge, ForgeError};
use crate::resolve::ResolvedRepo;

/// One prunable branch and what happened to it.
#[derive(Debug)]
pub struct PruneRecord {
    /// Repository the branch lives in.
    pub repo: RepoRef,
    /// The prunable branch.
    pub branch: String,
    /// The default branch it was judged against.
    pub default_branch: String,
    /// Commits the default branch has that this branch lacks.
    pub behind_by: u64,
    /// Deletion outcome; `None` in report mode.
    pub deletion: Option<Result<(), ForgeError>>,
}

/// Find (and unless `report_only`, delete) fully merged branches.
///
/// `filter` restricts candidates to branch names matching the pattern.
/// Branches whose comparison fails non-fatally are skipped; deletion
/// failures are captured per branch.
pub async fn prune_repo(
    forge: &dyn Forge,
    resolved: &ResolvedRepo,
    filter: Option<&Regex>,
    report_only: bool,
) -> Result<Vec<PruneRecord>, ForgeError> {
    let repo = &resolved.repo;
    let default_branch = match resolved.default_branch.clone() {
        Some(branch) => branch,
        None => forge.default_branch(repo).await?,
    };

    let mut records = Vec::new();
    for branch in forge.list_branches(repo).await? {
        if branch == default_branch {
            continue;
        }
        if filter.is_some_and(|re| !re.is_match(&branch)) {
            continue;
        }
        let cmp = match forge.compare(repo, &default_branch, &branch).await {
            Ok(cmp) => cmp,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        };
        if cmp.ahead_by != 0 {
            continue;
        }
        let deletion = if report_only {
            None
        } else {
            match forge.delete_branch(repo, &branch).await {
                Ok(()) => Some(Ok(())),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => Some(Err(e)),
            }
        };
        records.push(PruneRecord {
            repo: repo.clone(),
            branch,
            default_branch: default_branch.clone(),
            behind_by: cmp.behind_by,
            deletion,
        });
    }
    Ok(records)
}
