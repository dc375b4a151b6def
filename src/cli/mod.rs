//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Own presentation; the engines never print
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! the [`crate::engine`] modules for execution. Per-repository failures are
//! reported and do not fail the process; only fatal conditions (bad
//! credentials, unresolvable target) produce a non-zero exit.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let cwd = match cli.cwd.clone() {
        Some(cwd) => cwd,
        None => std::env::current_dir()?,
    };
    let ctx = commands::Context {
        cwd,
        token: cli.token.clone(),
        verbosity: Verbosity::from_flags(cli.quiet, cli.debug),
    };

    commands::dispatch(cli.command, &ctx)
}
