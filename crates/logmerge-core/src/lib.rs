#![forbid(unsafe_code)]
//! logmerge-core: shared types for the streaming log merge.
//!
//! This crate holds the pieces every other crate agrees on: source identifiers,
//! the timestamped line value, timestamp parsing, configuration, hashing, and
//! the merge report. No async or file IO lives here.

pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod line;
pub mod manifest;
pub mod timestamp;

/// Engine version recorded in every merge report.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
