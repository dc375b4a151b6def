//! ui
//!
//! Terminal presentation: message output and plain-text tables.

pub mod output;
pub mod table;
