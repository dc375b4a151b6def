//! resolve
//!
//! Target resolution: turning a user-supplied target string into a
//! concrete, deduplicated, stably ordered set of repositories.
//!
//! # Targets
//!
//! - `owner/name`: a single repository
//! - `owner/*` or a bare `owner`: every repository under the owner
//! - nothing: the current repository, inferred from the `origin` remote
//!
//! Wildcard expansion takes each repository's default branch from the
//! listing payload, so no extra request is needed per repository. A single
//! repository's default branch is left unresolved here and fetched lazily
//! only if the caller supplied no base branch.
//!
//! # Ordering
//!
//! Output is sorted lexicographically by slug and deduplicated; resolving
//! the same target twice in one run state yields identical ordering.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::core::types::RepoRef;
use crate::forge::{Forge, ForgeError};
use crate::git::{self, GitError};

/// Errors from target resolution. All of these are fatal for the run:
/// with no repositories there is nothing to process.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The organization or repository does not exist or is inaccessible.
    #[error("target not found: {0}")]
    TargetNotFound(String),

    /// No target was given and the current repository could not be inferred.
    #[error("could not detect current repository: {0}")]
    NoRepositoryDetected(#[from] GitError),

    /// The host rejected the resolution requests.
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

/// A parsed target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Infer the current repository from local version-control metadata.
    Current,
    /// A single `owner/name` repository.
    Repo(RepoRef),
    /// Every repository under an owner (`owner` or `owner/*`).
    Owner(String),
}

/// Parse a target string.
///
/// `owner/*` and a bare `owner` both mean wildcard expansion; anything with
/// a slash and a concrete name is a single repository.
pub fn parse_target(target: &str) -> Target {
    if let Some(owner) = target.strip_suffix("/*") {
        return Target::Owner(owner.to_string());
    }
    match target.split_once('/') {
        Some((owner, name)) if !name.is_empty() => Target::Repo(RepoRef::new(owner, name)),
        _ => Target::Owner(target.trim_end_matches('/').to_string()),
    }
}

/// Pick the effective target from the `-R/--repo` flag and the positional
/// argument. The flag wins; with neither, the current repository is used.
pub fn select_target(repo_flag: Option<&str>, positional: Option<&str>) -> Target {
    match repo_flag.or(positional) {
        Some(target) => parse_target(target),
        None => Target::Current,
    }
}

/// A repository with its lazily resolved default branch.
#[derive(Debug, Clone)]
pub struct ResolvedRepo {
    /// The repository.
    pub repo: RepoRef,
    /// Default branch, when the resolution path already knew it.
    pub default_branch: Option<String>,
}

/// Resolve a target into an ordered repository set.
///
/// # Errors
///
/// - [`ResolveError::TargetNotFound`] if the owner or repository does not
///   exist, or a wildcard expands to nothing
/// - [`ResolveError::NoRepositoryDetected`] if no target was given and the
///   working directory is not a GitHub-remoted repository
pub async fn resolve_target(
    forge: &dyn Forge,
    target: &Target,
    cwd: &Path,
) -> Result<Vec<ResolvedRepo>, ResolveError> {
    match target {
        Target::Current => {
            let repo = git::current_repository(cwd)?;
            Ok(vec![ResolvedRepo {
                repo,
                default_branch: None,
            }])
        }
        Target::Repo(repo) => Ok(vec![ResolvedRepo {
            repo: repo.clone(),
            default_branch: None,
        }]),
        Target::Owner(owner) => {
            let summaries = match forge.list_repos(owner).await {
                Ok(summaries) => summaries,
                Err(ForgeError::NotFound(_)) => {
                    return Err(ResolveError::TargetNotFound(owner.clone()))
                }
                Err(e) => return Err(ResolveError::Forge(e)),
            };
            if summaries.is_empty() {
                return Err(ResolveError::TargetNotFound(owner.clone()));
            }
            // BTreeMap dedups by slug and yields lexicographic order
            let mut by_slug = BTreeMap::new();
            for summary in summaries {
                let repo = RepoRef::new(owner.clone(), summary.name);
                by_slug.entry(repo.slug()).or_insert(ResolvedRepo {
                    repo,
                    default_branch: summary.default_branch,
                });
            }
            Ok(by_slug.into_values().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::MockForge;

    mod parse {
        use super::*;

        #[test]
        fn owner_slash_star_is_wildcard() {
            assert_eq!(parse_target("acme/*"), Target::Owner("acme".into()));
        }

        #[test]
        fn bare_owner_is_wildcard() {
            assert_eq!(parse_target("acme"), Target::Owner("acme".into()));
        }

        #[test]
        fn owner_slash_name_is_single_repo() {
            assert_eq!(
                parse_target("acme/widgets"),
                Target::Repo(RepoRef::new("acme", "widgets"))
            );
        }

        #[test]
        fn trailing_slash_is_wildcard() {
            assert_eq!(parse_target("acme/"), Target::Owner("acme".into()));
        }

        #[test]
        fn repo_flag_wins_over_positional() {
            assert_eq!(
                select_target(Some("acme/widgets"), Some("other/thing")),
                Target::Repo(RepoRef::new("acme", "widgets"))
            );
            assert_eq!(
                select_target(None, Some("acme")),
                Target::Owner("acme".into())
            );
            assert_eq!(select_target(None, None), Target::Current);
        }
    }

    mod resolve {
        use super::*;

        #[tokio::test]
        async fn wildcard_is_sorted_and_carries_default_branches() {
            let forge = MockForge::new();
            forge.add_repo("acme", "zeta", "main");
            forge.add_repo("acme", "alpha", "develop");

            let repos = resolve_target(&forge, &Target::Owner("acme".into()), Path::new("."))
                .await
                .unwrap();

            assert_eq!(repos.len(), 2);
            assert_eq!(repos[0].repo.slug(), "acme/alpha");
            assert_eq!(repos[0].default_branch.as_deref(), Some("develop"));
            assert_eq!(repos[1].repo.slug(), "acme/zeta");
        }

        #[tokio::test]
        async fn wildcard_resolution_is_stable_across_calls() {
            let forge = MockForge::new();
            forge.add_repo("acme", "b", "main");
            forge.add_repo("acme", "a", "main");
            forge.add_repo("acme", "c", "main");

            let target = Target::Owner("acme".into());
            let first = resolve_target(&forge, &target, Path::new(".")).await.unwrap();
            let second = resolve_target(&forge, &target, Path::new(".")).await.unwrap();

            let slugs = |repos: &[ResolvedRepo]| {
                repos.iter().map(|r| r.repo.slug()).collect::<Vec<_>>()
            };
            assert_eq!(slugs(&first), slugs(&second));
            assert_eq!(slugs(&first), vec!["acme/a", "acme/b", "acme/c"]);
        }

        #[tokio::test]
        async fn unknown_owner_is_target_not_found() {
            let forge = MockForge::new();
            let result =
                resolve_target(&forge, &Target::Owner("ghost".into()), Path::new(".")).await;
            assert!(matches!(result, Err(ResolveError::TargetNotFound(_))));
        }

        #[tokio::test]
        async fn single_repo_leaves_default_branch_lazy() {
            let forge = MockForge::new();
            let target = Target::Repo(RepoRef::new("acme", "widgets"));
            let repos = resolve_target(&forge, &target, Path::new(".")).await.unwrap();

            assert_eq!(repos.len(), 1);
            assert!(repos[0].default_branch.is_none());
        }
    }
}
