//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--token <token>`: API token (overrides the environment and `gh`)
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//!
//! # Targets
//!
//! Commands that scan repositories share a target convention: a positional
//! `TARGET` of `owner`, `owner/*`, or `owner/repo`, plus a `-R/--repo` flag
//! that takes precedence over the positional. With neither, the repository
//! is inferred from the `origin` remote of the working directory.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Driftscan - branch divergence and orphaned-PR inspection for GitHub
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// API token (overrides GITHUB_TOKEN and the gh CLI)
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Run as if drift was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how far a branch has diverged from a base across repositories
    #[command(
        name = "check-ahead",
        after_help = "\
EXAMPLES:
    # Is develop ahead of main anywhere in the acme org?
    drift check-ahead acme --head develop

    # One repository, explicit base
    drift check-ahead -R acme/widgets --head develop --base release

    # Current repository, show every repo even when not ahead
    drift check-ahead --head develop --all"
    )]
    CheckAhead {
        /// Target: owner, owner/*, or owner/repo
        #[arg(value_name = "TARGET")]
        target: Option<String>,

        /// Repository to check (takes precedence over TARGET)
        #[arg(short = 'R', long = "repo", value_name = "OWNER/REPO")]
        repo: Option<String>,

        /// Head branch to measure
        #[arg(short = 'H', long = "head", value_name = "BRANCH")]
        head: String,

        /// Base branch to measure against (default: each repo's default branch)
        #[arg(short = 'B', long = "base", value_name = "BRANCH")]
        base: Option<String>,

        /// Show all repositories, not just those ahead
        #[arg(long)]
        all: bool,
    },

    /// Find merged PRs whose commits were dropped by a history rewrite
    #[command(
        name = "orphans",
        after_help = "\
EXAMPLES:
    # Scan every repository in an org for orphaned merged PRs
    drift orphans acme

    # Narrow to one base branch and a merge window
    drift orphans -R acme/widgets -B main --merged-after 2024-01-01

    # Recreate confirmed orphans as fresh PRs
    drift orphans -R acme/widgets --reopen"
    )]
    Orphans {
        /// Target: owner, owner/*, or owner/repo
        #[arg(value_name = "TARGET")]
        target: Option<String>,

        /// Repository to scan (takes precedence over TARGET)
        #[arg(short = 'R', long = "repo", value_name = "OWNER/REPO")]
        repo: Option<String>,

        /// Only PRs merged into this branch
        #[arg(short = 'B', long = "base", value_name = "BRANCH")]
        base: Option<String>,

        /// Extra search terms in GitHub search syntax
        #[arg(short = 'S', long = "search", value_name = "TERMS")]
        search: Option<String>,

        /// Only PRs merged on or after this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        merged_after: Option<NaiveDate>,

        /// Only PRs merged on or before this date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        merged_before: Option<NaiveDate>,

        /// Recreate confirmed orphans as fresh PRs
        #[arg(long)]
        reopen: bool,
    },

    /// Delete branches fully merged into the default branch
    #[command(
        name = "prune",
        after_help = "\
EXAMPLES:
    # Report prunable branches without deleting anything
    drift prune acme --report

    # Delete merged feature branches in one repository
    drift prune -R acme/widgets --filter '^feature/'"
    )]
    Prune {
        /// Target: owner, owner/*, or owner/repo
        #[arg(value_name = "TARGET")]
        target: Option<String>,

        /// Repository to prune (takes precedence over TARGET)
        #[arg(short = 'R', long = "repo", value_name = "OWNER/REPO")]
        repo: Option<String>,

        /// Report prunable branches without deleting
        #[arg(long)]
        report: bool,

        /// Only branches matching this regular expression
        #[arg(long, value_name = "PATTERN")]
        filter: Option<String>,
    },

    /// Generate shell completion scripts
    #[command(name = "completion")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Shells we can generate completions for.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    /// Bash
    Bash,
    /// Zsh
    Zsh,
    /// Fish
    Fish,
    /// PowerShell
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_ahead_parses_target_and_flags() {
        let cli = Cli::try_parse_from([
            "drift",
            "check-ahead",
            "acme/*",
            "--head",
            "develop",
            "--base",
            "main",
            "--all",
        ])
        .unwrap();
        match cli.command {
            Command::CheckAhead {
                target,
                head,
                base,
                all,
                ..
            } => {
                assert_eq!(target.as_deref(), Some("acme/*"));
                assert_eq!(head, "develop");
                assert_eq!(base.as_deref(), Some("main"));
                assert!(all);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn orphans_parses_dates() {
        let cli = Cli::try_parse_from([
            "drift",
            "orphans",
            "-R",
            "acme/widgets",
            "--merged-after",
            "2024-01-01",
            "--reopen",
        ])
        .unwrap();
        match cli.command {
            Command::Orphans {
                repo,
                merged_after,
                reopen,
                ..
            } => {
                assert_eq!(repo.as_deref(), Some("acme/widgets"));
                assert_eq!(
                    merged_after,
                    NaiveDate::from_ymd_opt(2024, 1, 1)
                );
                assert!(reopen);
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn bad_date_is_rejected() {
        assert!(Cli::try_parse_from(["drift", "orphans", "--merged-after", "notadate"]).is_err());
    }
}
