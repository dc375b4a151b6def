//! Driftscan - branch divergence and orphaned-PR inspection for GitHub
//!
//! Driftscan is a single-binary tool for answering two questions across many
//! repositories at once: how far has a branch diverged from its base, and
//! which merged pull requests lost their commits to a history rewrite.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Divergence, orphan, reopen, and prune engines plus the
//!   worker pool that fans them out
//! - [`resolve`] - Target resolution into an ordered repository set
//! - [`core`] - Domain types and run configuration
//! - [`forge`] - Abstraction for the remote host (GitHub v1) with shared
//!   rate-limit governance
//! - [`git`] - Local repository detection
//! - [`auth`] - Credential discovery
//! - [`ui`] - Output and table rendering
//!
//! # Correctness Invariants
//!
//! Driftscan maintains the following invariants:
//!
//! 1. One repository's failure never hides another repository's result
//! 2. Output order depends only on the resolved repository set, never on
//!    completion order
//! 3. An inconclusive reachability check is never reported as an orphan
//! 4. All workers share one rate budget and pause together near exhaustion

pub mod auth;
pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod resolve;
pub mod ui;
