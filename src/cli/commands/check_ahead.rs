//! cli::commands::check_ahead
//!
//! Branch divergence across a repository set.
//!
//! By default only repositories where the head is strictly ahead are shown,
//! plus any whose check failed; `--all` shows every repository. Zero counts
//! render as `-` so the interesting numbers stand out.

use std::sync::Arc;

use anyhow::Result;

use super::{Context, Session};
use crate::core::types::DivergenceStatus;
use crate::engine::{divergence, pool};
use crate::ui::output;
use crate::ui::table::{Column, Table};

/// Run the check-ahead command.
pub fn check_ahead(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    head: &str,
    base: Option<&str>,
    all: bool,
) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(check_ahead_async(ctx, target, repo, head, base, all))
}

async fn check_ahead_async(
    ctx: &Context,
    target: Option<&str>,
    repo: Option<&str>,
    head: &str,
    base: Option<&str>,
    all: bool,
) -> Result<()> {
    let session = Session::build(ctx)?;
    let repos = session.resolve(ctx, repo, target).await?;
    let total = repos.len();

    let forge = Arc::clone(&session.forge);
    let head_owned = head.to_string();
    let base_owned = base.map(String::from);
    let outcomes = pool::run_per_repo(repos, session.config.concurrency, move |resolved| {
        let forge = Arc::clone(&forge);
        let head = head_owned.clone();
        let base = base_owned.clone();
        async move { divergence::check_repo(forge.as_ref(), &resolved, &head, base.as_deref()).await }
    })
    .await?;

    let mut table = Table::new(vec![
        Column::new("REPO", 4, 60),
        Column::new("HEAD", 4, 40),
        Column::new("BASE", 4, 40),
        Column::new("AHEAD", 5, 8),
        Column::new("BEHIND", 6, 8),
        Column::new("STATUS", 6, 10),
        Column::new("NOTE", 4, 60),
    ]);

    let mut ahead = 0usize;
    let mut failed = 0usize;
    for outcome in &outcomes {
        let cmp = match &outcome.result {
            Ok(cmp) => cmp,
            // check_repo folds non-fatal errors into the comparison.
            Err(e) => {
                failed += 1;
                output::warn(format!("{}: {}", outcome.repo.repo, e), ctx.verbosity);
                continue;
            }
        };
        let is_ahead = cmp.ahead_by > 0;
        let is_unknown = cmp.status == DivergenceStatus::Unknown;
        if is_ahead {
            ahead += 1;
        }
        if is_unknown {
            failed += 1;
        }
        if !all && !is_ahead && !is_unknown {
            continue;
        }
        table.add_row(vec![
            cmp.repo.slug(),
            cmp.head.clone(),
            cmp.base.clone(),
            count_cell(cmp.ahead_by, is_unknown),
            count_cell(cmp.behind_by, is_unknown),
            cmp.status.to_string(),
            cmp.error.clone().unwrap_or_default(),
        ]);
    }

    if table.is_empty() {
        output::print(
            format!("{}: no repositories ahead of base ({} checked)", head, total),
            ctx.verbosity,
        );
    } else {
        output::result(table.render());
    }
    output::print(
        format!(
            "{} checked, {} ahead, {} inconclusive",
            total, ahead, failed
        ),
        ctx.verbosity,
    );
    Ok(())
}

fn count_cell(count: u64, unknown: bool) -> String {
    if unknown || count == 0 {
        "-".to_string()
    } else {
        count.to_string()
    }
}
