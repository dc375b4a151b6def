//! engine::orphans
//!
//! Detection of merged PRs whose commits were dropped by a history rewrite.
//!
//! # Design
//!
//! Within one repository the work is sequential: discover merged PRs via
//! search, snapshot the current tip of each distinct base branch once, then
//! test each PR's commits against the snapshotted tip. The snapshot keeps
//! every PR in a repository judged against the same tip even if the branch
//! moves mid-run.
//!
//! A PR is reachable when its head commit is an ancestor of the snapshotted
//! tip, which one symmetric comparison answers: ancestor iff `behind_by`
//! is zero. A head sha the host no longer knows falls back to the merge
//! commit sha; when neither exists the commits are gone and the PR is a
//! confirmed orphan. An exhausted retry budget yields `Unknown`, never
//! `Orphaned`: orphan results can trigger PR recreation, so an inconclusive
//! check must stay visibly inconclusive.

use std::collections::HashMap;
use std::time::Duration;

use crate::core::types::{OrphanResult, PrSearchFilter, PullRequestRef, Reachability, RepoRef};
use crate::forge::retry::Backoff;
use crate::forge::{Forge, ForgeError};
use crate::resolve::ResolvedRepo;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// Snapshotted state of one base branch.
enum TipState {
    Sha(String),
    Missing,
    Failed(String),
}

/// Find merged PRs in one repository and classify each one's reachability.
///
/// `retries` bounds the attempts per reachability probe. Fatal errors and
/// search failures propagate; per-PR probe failures are captured as
/// [`Reachability::Unknown`].
pub async fn find_orphans(
    forge: &dyn Forge,
    resolved: &ResolvedRepo,
    filter: &PrSearchFilter,
    retries: u32,
) -> Result<Vec<OrphanResult>, ForgeError> {
    let repo = &resolved.repo;
    let prs = forge.search_merged_prs(repo, filter).await?;

    let mut tips: HashMap<String, TipState> = HashMap::new();
    for pr in &prs {
        if tips.contains_key(&pr.base_branch) {
            continue;
        }
        let state = snapshot_tip(forge, repo, &pr.base_branch, retries).await?;
        tips.insert(pr.base_branch.clone(), state);
    }

    let mut results = Vec::with_capacity(prs.len());
    for pr in prs {
        let reachability = match tips.get(&pr.base_branch) {
            Some(TipState::Sha(tip)) => probe(forge, repo, &pr, tip, retries).await?,
            // Base branch deleted: nothing merged into it is reachable.
            Some(TipState::Missing) => Reachability::Orphaned,
            Some(TipState::Failed(cause)) => Reachability::Unknown(cause.clone()),
            None => Reachability::Unknown("base branch tip not snapshotted".into()),
        };
        results.push(OrphanResult { pr, reachability });
    }

    results.sort_by(|a, b| b.pr.merged_at.cmp(&a.pr.merged_at));
    Ok(results)
}

async fn snapshot_tip(
    forge: &dyn Forge,
    repo: &RepoRef,
    branch: &str,
    retries: u32,
) -> Result<TipState, ForgeError> {
    let mut backoff = Backoff::new(retries.max(1), RETRY_BASE_DELAY);
    loop {
        match forge.branch_tip(repo, branch).await {
            Ok(sha) => return Ok(TipState::Sha(sha)),
            Err(ForgeError::NotFound(_)) => return Ok(TipState::Missing),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) if e.is_transient() => match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Ok(TipState::Failed(e.to_string())),
            },
            Err(e) => return Ok(TipState::Failed(e.to_string())),
        }
    }
}

/// Test one PR against a snapshotted tip.
async fn probe(
    forge: &dyn Forge,
    repo: &RepoRef,
    pr: &PullRequestRef,
    tip: &str,
    retries: u32,
) -> Result<Reachability, ForgeError> {
    match is_ancestor(forge, repo, &pr.head_sha, tip, retries).await? {
        ProbeResult::Ancestor => return Ok(Reachability::Reachable),
        ProbeResult::NotAncestor => return Ok(Reachability::Orphaned),
        ProbeResult::Inconclusive(cause) => return Ok(Reachability::Unknown(cause)),
        ProbeResult::ShaUnknown => {}
    }

    // Head sha gone from the host; the merge commit is the second witness.
    let merge_sha = match &pr.merge_commit_sha {
        Some(sha) => sha,
        None => return Ok(Reachability::Orphaned),
    };
    match is_ancestor(forge, repo, merge_sha, tip, retries).await? {
        ProbeResult::Ancestor => Ok(Reachability::Reachable),
        ProbeResult::NotAncestor | ProbeResult::ShaUnknown => Ok(Reachability::Orphaned),
        ProbeResult::Inconclusive(cause) => Ok(Reachability::Unknown(cause)),
    }
}

enum ProbeResult {
    Ancestor,
    NotAncestor,
    ShaUnknown,
    Inconclusive(String),
}

async fn is_ancestor(
    forge: &dyn Forge,
    repo: &RepoRef,
    sha: &str,
    tip: &str,
    retries: u32,
) -> Result<ProbeResult, ForgeError> {
    let mut backoff = Backoff::new(retries.max(1), RETRY_BASE_DELAY);
    loop {
        match forge.compare(repo, sha, tip).await {
            // behind_by counts commits reachable from sha but not the tip;
            // zero means every commit of sha is in the tip's history.
            Ok(cmp) if cmp.behind_by == 0 => return Ok(ProbeResult::Ancestor),
            Ok(_) => return Ok(ProbeResult::NotAncestor),
            Err(ForgeError::NotFound(_)) => return Ok(ProbeResult::ShaUnknown),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) if e.is_transient() => match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Ok(ProbeResult::Inconclusive(e.to_string())),
            },
            Err(e) => return Ok(ProbeResult::Inconclusive(e.to_string())),
        }
    }
}
