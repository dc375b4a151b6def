//! engine::reopen
//!
//! Recreation of confirmed orphans as fresh pull requests.
//!
//! Only results whose reachability is a confirmed orphan are acted on;
//! reachable and unknown results are skipped. Each orphan gets at most one
//! attempt per run. Creation and the review request are separate steps, so
//! a created PR is still reported when the follow-up review request fails.

use crate::core::types::{OrphanResult, PullRequestRef, ReopenError, ReopenOutcome};
use crate::forge::{CreatePrRequest, Forge, ForgeError};

/// Recreate every confirmed orphan in `results`.
///
/// Fatal errors propagate; everything else is captured per orphan in the
/// outcome. PRs whose head branch no longer exists cannot be recreated and
/// are reported as such.
pub async fn reopen_orphans(
    forge: &dyn Forge,
    results: &[OrphanResult],
) -> Result<Vec<ReopenOutcome>, ForgeError> {
    let mut outcomes = Vec::new();
    for result in results {
        if !result.reachability.is_orphaned() {
            continue;
        }
        outcomes.push(reopen_one(forge, &result.pr).await?);
    }
    Ok(outcomes)
}

async fn reopen_one(
    forge: &dyn Forge,
    pr: &PullRequestRef,
) -> Result<ReopenOutcome, ForgeError> {
    let failed = |error: ReopenError| ReopenOutcome {
        original: pr.clone(),
        new_pr_number: None,
        new_pr_url: None,
        review_requested: false,
        error: Some(error),
    };

    match forge.branch_exists(&pr.repo, &pr.head_branch).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(failed(ReopenError::SourceBranchMissing(
                pr.head_branch.clone(),
            )))
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(failed(ReopenError::Create(e.to_string()))),
    }

    let request = CreatePrRequest {
        head: pr.head_branch.clone(),
        base: pr.base_branch.clone(),
        title: format!("{} (reopened)", pr.title),
        body: Some(format!("Reopened from PR #{}", pr.number)),
    };
    let created = match forge.create_pr(&pr.repo, request).await {
        Ok(created) => created,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => return Ok(failed(ReopenError::Create(e.to_string()))),
    };

    // Review request failure is partial success: the PR exists either way.
    let (review_requested, error) = match &pr.author {
        Some(author) => match forge
            .request_reviewers(&pr.repo, created.number, std::slice::from_ref(author))
            .await
        {
            Ok(()) => (true, None),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => (false, Some(ReopenError::ReviewRequest(e.to_string()))),
        },
        None => (false, None),
    };

    Ok(ReopenOutcome {
        original: pr.clone(),
        new_pr_number: Some(created.number),
        new_pr_url: Some(created.url),
        review_requested,
        error,
    })
}
