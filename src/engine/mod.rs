//! engine
//!
//! The analysis engines, each written against the `Forge` trait.
//!
//! # Modules
//!
//! - [`pool`]: Bounded concurrent fan-out with ordered, per-item outcomes
//! - [`divergence`]: Branch ahead/behind analysis
//! - [`orphans`]: Detection of merged PRs dropped by history rewrites
//! - [`reopen`]: Recreation of confirmed orphans as fresh PRs
//! - [`prune`]: Deletion of fully merged branches

pub mod divergence;
pub mod orphans;
pub mod pool;
pub mod prune;
pub mod reopen;
