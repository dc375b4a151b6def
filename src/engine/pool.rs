//! engine::pool
//!
//! Bounded concurrent fan-out over a repository set.
//!
//! # Design
//!
//! One task per repository, gated by a semaphore so at most `concurrency`
//! repositories are in flight. Results are written back by index, so output
//! order is exactly input order regardless of completion order.
//!
//! Per-repository errors are captured in the outcome and never abort
//! siblings. A fatal error (bad credentials) flips a shared flag: tasks not
//! yet started return early, and the run as a whole fails with that error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::forge::ForgeError;
use crate::resolve::ResolvedRepo;

/// The result of processing one repository.
#[derive(Debug)]
pub struct RepoOutcome<T> {
    /// The repository.
    pub repo: ResolvedRepo,
    /// What happened: a value, or the error that stopped this repository.
    pub result: Result<T, ForgeError>,
}

/// Run `task` once per repository, at most `concurrency` at a time.
///
/// Returns one outcome per input repository, in input order. Returns `Err`
/// only when some task hit a fatal error; everything completed before the
/// flag flipped is discarded because the run cannot be trusted.
pub async fn run_per_repo<T, F, Fut>(
    repos: Vec<ResolvedRepo>,
    concurrency: usize,
    task: F,
) -> Result<Vec<RepoOutcome<T>>, ForgeError>
where
    T: Send + 'static,
    F: Fn(ResolvedRepo) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<T, ForgeError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let aborted = Arc::new(AtomicBool::new(false));
    let task = Arc::new(task);

    let mut set = JoinSet::new();
    let total = repos.len();
    for (idx, repo) in repos.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let aborted = Arc::clone(&aborted);
        let task = Arc::clone(&task);
        set.spawn(async move {
            // Semaphore is never closed while the set is alive.
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return (idx, None),
            };
            if aborted.load(Ordering::SeqCst) {
                return (idx, None);
            }
            let result = (*task)(repo.clone()).await;
            if let Err(e) = &result {
                if e.is_fatal() {
                    aborted.store(true, Ordering::SeqCst);
                }
            }
            (idx, Some(RepoOutcome { repo, result }))
        });
    }

    let mut slots: Vec<Option<RepoOutcome<T>>> = Vec::with_capacity(total);
    slots.resize_with(total, || None);
    let mut fatal: Option<ForgeError> = None;
    while let Some(joined) = set.join_next().await {
        let (idx, outcome) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                // A panicking task is a bug; surface it rather than hang.
                fatal = Some(ForgeError::Api {
                    status: 0,
                    message: format!("worker task failed: {}", e),
                });
                continue;
            }
        };
        if let Some(outcome) = outcome {
            if let Err(e) = &outcome.result {
                if e.is_fatal() && fatal.is_none() {
                    fatal = Some(e.clone());
                }
            }
            slots[idx] = Some(outcome);
        }
    }

    if let Some(e) = fatal {
        return Err(e);
    }
    Ok(slots.into_iter().flatten().collect())
}
