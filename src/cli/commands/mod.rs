//! cli::commands
//!
//! Command handlers. Each command is a synchronous wrapper around an async
//! implementation; the handlers own presentation, the engines own the work.

mod check_ahead;
mod completion;
mod orphans;
mod prune;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::auth;
use crate::cli::args::Command;
use crate::core::config::RunConfig;
use crate::forge::github::GitHubForge;
use crate::forge::rate::RateBudget;
use crate::resolve::{self, ResolvedRepo, Target};
use crate::ui::output::{self, Verbosity};

/// Shared per-invocation context derived from global flags.
pub struct Context {
    /// Working directory for current-repository detection.
    pub cwd: PathBuf,
    /// Token from the `--token` flag, when given.
    pub token: Option<String>,
    /// Output verbosity.
    pub verbosity: Verbosity,
}

/// Everything a command needs to talk to the host.
pub struct Session {
    /// The forge client, shared across all workers.
    pub forge: Arc<GitHubForge>,
    /// Run tunables.
    pub config: RunConfig,
}

impl Session {
    /// Build a session: load config, discover credentials, construct the
    /// client with a fresh shared rate budget.
    pub fn build(ctx: &Context) -> Result<Self> {
        let config = RunConfig::load()?;
        let token = auth::discover_token(ctx.token.as_deref())?;
        let budget = Arc::new(RateBudget::new(config.rate_safety_margin));
        let forge = Arc::new(GitHubForge::new(token, budget, &config));
        Ok(Self { forge, config })
    }

    /// Resolve a target selection into the repository set for this run.
    pub async fn resolve(
        &self,
        ctx: &Context,
        repo_flag: Option<&str>,
        positional: Option<&str>,
    ) -> Result<Vec<ResolvedRepo>> {
        let target = resolve::select_target(repo_flag, positional);
        if matches!(target, Target::Current) {
            output::debug("no target given; using the current repository", ctx.verbosity);
        }
        let repos = resolve::resolve_target(self.forge.as_ref(), &target, &ctx.cwd).await?;
        output::debug(
            format!("resolved {} repositories", repos.len()),
            ctx.verbosity,
        );
        Ok(repos)
    }
}

/// Dispatch a parsed command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::CheckAhead {
            target,
            repo,
            head,
            base,
            all,
        } => check_ahead::check_ahead(ctx, target.as_deref(), repo.as_deref(), &head, base.as_deref(), all),
        Command::Orphans {
            target,
            repo,
            base,
            search,
            merged_after,
            merged_before,
            reopen,
        } => orphans::orphans(
            ctx,
            target.as_deref(),
            repo.as_deref(),
            orphans::Options {
                base,
                search,
                merged_after,
                merged_before,
                reopen,
            },
        ),
        Command::Prune {
            target,
            repo,
            report,
            filter,
        } => prune::prune(ctx, target.as_deref(), repo.as_deref(), report, filter.as_deref()),
        Command::Completion { shell } => completion::completion(shell),
    }
}
