//! Strongly-typed source identifier.
//!
//! Downstream crates should *not* pass raw indices around for sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an input in the externally supplied source list, in `[0, N)`.
///
/// Ordering on `SourceId` is the tie-break order for equal timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(transparent)]
pub struct SourceId(usize);

impl SourceId {
    pub const fn new(v: usize) -> Self {
        Self(v)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({})", self.0)
    }
}
