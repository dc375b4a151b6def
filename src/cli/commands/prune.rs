//! cli::commands::prune
//!
//! Deletion of fully merged branches, with a report-only mode.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use regex::Regex;

use super::{Context, Session};
use crate::engine::{pool, prune as prune_engine};
use crate::ui::output;
use crate::ui::table::{Column, Table};

/// Run the prune command.
pub fn prune(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    report: bool,
    filter: Option<&str>,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(prune_async(ctx, target, repo, report, filter))
}

async fn prune_async(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    report: bool,
    filter: Option<&str>,
) -> Result<()> {
    let filter = filter
        .map(Regex::new)
        .transpose()
        .context("invalid --filter pattern")?;

    let session = Session::build(ctx)?;
    let repos = session.resolve(ctx, repo, target).await?;

    let forge = Arc::clone(&session.forge);
    let filter_owned = filter.clone();
    let outcomes = pool::run_per_repo(repos, session.config.concurrency, move |resolved| {
        let forge = Arc::clone(&forge);
        let filter = filter_owned.clone();
        async move {
            prune_engine::prune_repo(forge.as_ref(), &resolved, filter.as_ref(), report).await
        }
    })
    .await?;

    let mut table = Table::new(vec![
        Column::new("REPO", 4, 60),
        Column::new("BRANCH", 6, 50),
        Column::new("BEHIND", 6, 8),
        Column::new("RESULT", 6, 60),
    ]);
    let mut deleted = 0usize;
    let mut failures = 0usize;

    for outcome in &outcomes {
        let records = match &outcome.result {
            Ok(records) => records,
            Err(e) => {
                failures += 1;
                output::warn(format!("{}: {}", outcome.repo.repo, e), ctx.verbosity);
                continue;
            }
        };
        for record in records {
            let result = match &record.deletion {
                None => "would delete".to_string(),
                Some(Ok(())) => {
                    deleted += 1;
                    "deleted".to_string()
                }
                Some(Err(e)) => {
                    failures += 1;
                    format!("failed: {}", e)
                }
            };
            table.add_row(vec![
                record.repo.slug(),
                record.branch.clone(),
                record.behind_by.to_string(),
                result,
            ]);
        }
    }

    if table.is_empty() {
        output::print("no prunable branches found", ctx.verbosity);
    } else {
        output::result(table.render());
    }
    if report {
        output::print("report mode: nothing was deleted", ctx.verbosity);
    } else {
        output::print(
            format!("{} branches deleted, {} failures", deleted, failures),
            ctx.verbosity,
        );
    }
    Ok(())
}
