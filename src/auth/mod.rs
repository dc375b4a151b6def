//! auth
//!
//! Credential discovery.
//!
//! # Discovery order
//!
//! 1. The `--token` flag
//! 2. The `GITHUB_TOKEN` environment variable
//! 3. The `GH_TOKEN` environment variable
//! 4. `gh auth token`, when the GitHub CLI is installed and logged in
//!
//! The first non-empty source wins. Nothing here validates the token; a bad
//! one surfaces as an authentication failure on the first request.
//!
//! The chain is written against injected lookups so tests never depend on
//! the host's real environment or an installed `gh`.

use std::process::Command;

use thiserror::Error;

/// Environment variables consulted, in order.
const TOKEN_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Errors from credential discovery.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Every source came up empty.
    #[error(
        "no credentials found; pass --token, set GITHUB_TOKEN, or log in with 'gh auth login'"
    )]
    NoCredentials,
}

/// Discover a token from the flag, environment, or the GitHub CLI.
pub fn discover_token(flag: Option<&str>) -> Result<String, AuthError> {
    discover_from(flag, |var| std::env::var(var).ok(), gh_cli_token)
}

/// The discovery chain itself, with the environment and CLI lookups
/// injected.
fn discover_from(
    flag: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
    cli: impl FnOnce() -> Option<String>,
) -> Result<String, AuthError> {
    if let Some(token) = non_empty(flag.map(String::from)) {
        return Ok(token);
    }
    for var in TOKEN_VARS {
        if let Some(token) = non_empty(env(var)) {
            return Ok(token);
        }
    }
    if let Some(token) = non_empty(cli()) {
        return Ok(token);
    }
    Err(AuthError::NoCredentials)
}

/// Ask the GitHub CLI for its stored token. Any failure (not installed, not
/// logged in) is treated as "no token here".
fn gh_cli_token() -> Option<String> {
    let output = Command::new("gh").args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn no_cli() -> Option<String> {
        None
    }

    #[test]
    fn flag_wins_over_everything() {
        let token = discover_from(
            Some("ghp_flagtoken"),
            |_| Some("ghp_envtoken".into()),
            || Some("ghp_clitoken".into()),
        )
        .unwrap();
        assert_eq!(token, "ghp_flagtoken");
    }

    #[test]
    fn empty_flag_falls_through_to_the_environment() {
        let token = discover_from(
            Some("   "),
            |var| (var == "GITHUB_TOKEN").then(|| "ghp_envtoken".into()),
            no_cli,
        )
        .unwrap();
        assert_eq!(token, "ghp_envtoken");
    }

    #[test]
    fn github_token_is_consulted_before_gh_token() {
        let token = discover_from(
            None,
            |var| match var {
                "GITHUB_TOKEN" => Some("ghp_primary".into()),
                "GH_TOKEN" => Some("ghp_secondary".into()),
                _ => None,
            },
            no_cli,
        )
        .unwrap();
        assert_eq!(token, "ghp_primary");
    }

    #[test]
    fn empty_environment_falls_through_to_the_cli() {
        let token = discover_from(None, |_| Some("  ".into()), || Some("ghp_cli".into())).unwrap();
        assert_eq!(token, "ghp_cli");
    }

    #[test]
    fn all_sources_empty_is_no_credentials() {
        assert!(matches!(
            discover_from(None, no_env, no_cli),
            Err(AuthError::NoCredentials)
        ));
    }

    #[test]
    fn non_empty_trims_and_filters() {
        assert_eq!(non_empty(Some("  x  ".into())), Some("x".to_string()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
