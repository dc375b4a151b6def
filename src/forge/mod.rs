//! forge
//!
//! Remote host access: the `Forge` trait seam, the GitHub implementation,
//! rate-limit bookkeeping, and retry/backoff.
//!
//! # Architecture
//!
//! Engines depend only on the [`Forge`] trait. The [`github`] module is the
//! single place raw API payloads exist; everything past it is typed. The
//! rate budget lives here because it is owned by the client: every response
//! refreshes it, every request gates on it.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST and Search APIs
//! - [`rate`]: Shared rate-limit budget with cooperative pausing
//! - [`retry`]: Bounded exponential backoff state machine
//! - [`mock`]: Mock implementation for deterministic testing

pub mod github;
pub mod mock;
pub mod rate;
pub mod retry;
mod traits;

pub use traits::*;
