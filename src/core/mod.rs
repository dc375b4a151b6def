//! core
//!
//! Domain types and run configuration.
//!
//! Everything the engines operate on lives here: repository references,
//! comparisons, PR snapshots, reachability results, and the tunables that
//! bound concurrency and retries.

pub mod config;
pub mod types;

pub use config::{ConfigError, RunConfig};
pub use types::*;
