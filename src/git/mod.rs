//! git
//!
//! Local repository detection via git2.
//!
//! This is the only local-VCS touchpoint in the tool: when no target is
//! given on the command line, the repository is inferred from the `origin`
//! remote of the working directory. Nothing is ever cloned or mutated; the
//! remote host stays the source of truth for all history questions.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::RepoRef;

/// Errors from current-repository detection.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// The repository has no `origin` remote.
    #[error("no 'origin' remote configured")]
    NoOriginRemote,

    /// The `origin` remote does not point at a recognized GitHub URL.
    #[error("'origin' remote is not a GitHub repository: {url}")]
    NotAGitHubRemote {
        /// The remote URL that failed to parse
        url: String,
    },
}

/// Infer the current repository from the `origin` remote.
///
/// Searches upward from `cwd` for a repository, reads the `origin` remote
/// URL, and parses it into an owner/name pair.
pub fn current_repository(cwd: &Path) -> Result<RepoRef, GitError> {
    let repo = git2::Repository::discover(cwd).map_err(|_| GitError::NotARepo {
        path: cwd.to_path_buf(),
    })?;
    let remote = repo
        .find_remote("origin")
        .map_err(|_| GitError::NoOriginRemote)?;
    let url = remote.url().ok_or(GitError::NoOriginRemote)?;
    let (owner, name) = parse_github_url(url).ok_or_else(|| GitError::NotAGitHubRemote {
        url: url.to_string(),
    })?;
    Ok(RepoRef::new(owner, name))
}

/// Parse a GitHub remote URL to extract owner and repo.
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    // SSH format: git@github.com:owner/repo.git
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    // HTTPS format: https://github.com/owner/repo.git
    if let Some(rest) = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
    {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    None
}
