//! cli::commands::orphans
//!
//! Orphaned merged-PR detection, with optional recreation.
//!
//! Confirmed orphans and inconclusive checks are listed; reachable PRs are
//! only counted. With `--reopen`, each confirmed orphan gets one recreation
//! attempt and its outcome is reported, including partial success when the
//! PR was created but the review request failed.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use super::{Context, Session};
use crate::core::types::{OrphanResult, PrSearchFilter, Reachability, ReopenOutcome};
use crate::engine::{orphans, pool, reopen};
use crate::ui::output;
use crate::ui::table::{Column, Table};

/// Orphan-scan options taken from the command line.
pub struct Options {
    /// Only PRs merged into this branch.
    pub base: Option<String>,
    /// Extra search terms.
    pub search: Option<String>,
    /// Only PRs merged on or after this date.
    pub merged_after: Option<NaiveDate>,
    /// Only PRs merged on or before this date.
    pub merged_before: Option<NaiveDate>,
    /// Recreate confirmed orphans.
    pub reopen: bool,
}

/// Run the orphans command.
pub fn orphans(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    options: Options,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(orphans_async(ctx, target, repo, options))
}

async fn orphans_async(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    options: Options,
) -> Result<()> {
    let session = Session::build(ctx)?;
    let repos = session.resolve(ctx, repo, target).await?;

    let filter = PrSearchFilter {
        base: options.base.clone(),
        merged_after: options.merged_after,
        merged_before: options.merged_before,
        search: options.search.clone(),
    };

    let forge = Arc::clone(&session.forge);
    let filter_owned = filter.clone();
    let retries = session.config.reachability_retries;
    let do_reopen = options.reopen;
    let outcomes = pool::run_per_repo(repos, session.config.concurrency, move |resolved| {
        let forge = Arc::clone(&forge);
        let filter = filter_owned.clone();
        async move {
            let results =
                orphans::find_orphans(forge.as_ref(), &resolved, &filter, retries).await?;
            let reopened = if do_reopen {
                reopen::reopen_orphans(forge.as_ref(), &results).await?
            } else {
                Vec::new()
            };
            Ok((results, reopened))
        }
    })
    .await?;

    let mut checked = 0usize;
    let mut orphaned = 0usize;
    let mut unknown = 0usize;
    let mut table = Table::new(vec![
        Column::new("REPO", 4, 60),
        Column::new("PR", 2, 8),
        Column::new("TITLE", 5, 40),
        Column::new("BRANCH", 6, 30),
        Column::new("BASE", 4, 30),
        Column::new("AUTHOR", 6, 20),
        Column::new("MERGED", 6, 12),
        Column::new("STATUS", 6, 10),
    ]);
    let mut reopened: Vec<ReopenOutcome> = Vec::new();

    for outcome in &outcomes {
        let (results, repo_reopened) = match &outcome.result {
            Ok(pair) => pair,
            Err(e) => {
                output::warn(format!("{}: {}", outcome.repo.repo, e), ctx.verbosity);
                continue;
            }
        };
        checked += results.len();
        for result in results {
            match &result.reachability {
                Reachability::Reachable => continue,
                Reachability::Orphaned => orphaned += 1,
                Reachability::Unknown(cause) => {
                    unknown += 1;
                    output::warn(
                        format!(
                            "{} PR #{}: check inconclusive: {}",
                            result.pr.repo, result.pr.number, cause
                        ),
                        ctx.verbosity,
                    );
                }
            }
            output::debug(
                format!(
                    "{} PR #{}: head_sha={} merge_commit_sha={}",
                    result.pr.repo,
                    result.pr.number,
                    result.pr.head_sha,
                    result.pr.merge_commit_sha.as_deref().unwrap_or("-")
                ),
                ctx.verbosity,
            );
            table.add_row(orphan_row(result));
        }
        reopened.extend(repo_reopened.iter().cloned());
    }

    if table.is_empty() {
        output::print(
            format!("no orphaned PRs found ({} merged PRs checked)", checked),
            ctx.verbosity,
        );
    } else {
        output::result(table.render());
    }
    output::print(
        format!(
            "{} merged PRs checked, {} orphaned, {} inconclusive",
            checked, orphaned, unknown
        ),
        ctx.verbosity,
    );

    for outcome in &reopened {
        report_reopen(ctx, outcome);
    }
    if options.reopen {
        output::print(reopen_summary(&reopened), ctx.verbosity);
    }
    Ok(())
}

fn reopen_summary(outcomes: &[ReopenOutcome]) -> String {
    let succeeded = outcomes
        .iter()
        .filter(|o| o.new_pr_number.is_some())
        .count();
    format!("reopened {} of {} orphaned PRs", succeeded, outcomes.len())
}

fn orphan_row(result: &OrphanResult) -> Vec<String> {
    let status = match &result.reachability {
        Reachability::Reachable => "reachable",
        Reachability::Orphaned => "orphaned",
        Reachability::Unknown(_) => "unknown",
    };
    vec![
        result.pr.repo.slug(),
        format!("#{}", result.pr.number),
        result.pr.title.clone(),
        result.pr.head_branch.clone(),
        result.pr.base_branch.clone(),
        result.pr.author.clone().unwrap_or_else(|| "-".to_string()),
        result.pr.merged_at.format("%Y-%m-%d").to_string(),
        status.to_string(),
    ]
}

fn report_reopen(ctx: &Context, outcome: &ReopenOutcome) {
    let original = format!("{} PR #{}", outcome.original.repo, outcome.original.number);
    match (&outcome.new_pr_url, &outcome.error) {
        (Some(url), None) => {
            let review = if outcome.review_requested {
                format!(
                    ", review requested from {}",
                    outcome.original.author.as_deref().unwrap_or("author")
                )
            } else {
                String::new()
            };
            output::result(format!("reopened {} as {}{}", original, url, review));
        }
        (Some(url), Some(e)) => {
            output::result(format!("reopened {} as {}", original, url));
            output::warn(format!("{}: {}", original, e), ctx.verbosity);
        }
        (None, Some(e)) => output::warn(format!("could not reopen {}: {}", original, e), ctx.verbosity),
        (None, None) => {}
    }
}
