//! The merge frontier: at most one pending line per live source.
//!
//! Entries are ordered by `(timestamp, source)`, so the minimum is unique even
//! when several sources hold byte-identical timestamps. Removal is by source
//! key, never by comparing line values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use logmerge_core::id::SourceId;
use logmerge_core::line::TimestampedLine;
use logmerge_core::timestamp::Timestamp;

use crate::error::{MergeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierStats {
    pub max_frontier_size: usize,
    pub emitted: u64,
}

/// Ordering key. Field order gives timestamp first, then source index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FrontierKey {
    timestamp: Timestamp,
    source: SourceId,
}

#[derive(Debug)]
pub struct Frontier {
    entries: BTreeMap<FrontierKey, TimestampedLine>,
    // Per-source key of the pending entry, for removal by source.
    slots: Vec<Option<Timestamp>>,
    max_len: usize,
    emitted: u64,
}

impl Frontier {
    pub fn new(sources: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            slots: vec![None; sources],
            max_len: 0,
            emitted: 0,
        }
    }

    /// Capacity: the number of sources this frontier serves.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, source: SourceId) -> bool {
        matches!(self.slots.get(source.index()), Some(Some(_)))
    }

    /// Add the pending entry for `line.source`. The source must not already
    /// hold an entry.
    pub fn insert(&mut self, line: TimestampedLine) -> Result<()> {
        let source = line.source;
        let slot = self.slots.get_mut(source.index()).ok_or_else(|| {
            MergeError::Invariant(format!("{source} is outside the frontier's source range"))
        })?;
        if slot.is_some() {
            return Err(MergeError::Invariant(format!(
                "{source} already has a pending line in the frontier"
            )));
        }
        let (timestamp, key_source) = line.merge_key();
        *slot = Some(timestamp.clone());
        let key = FrontierKey {
            timestamp: timestamp.clone(),
            source: key_source,
        };
        self.entries.insert(key, line);
        self.max_len = self.max_len.max(self.entries.len());
        Ok(())
    }

    /// Smallest timestamp, ties broken by smallest source index.
    pub fn select_minimum(&self) -> Option<&TimestampedLine> {
        self.entries.values().next()
    }

    /// Remove the pending entry of `source`, if any.
    pub fn remove(&mut self, source: SourceId) -> Option<TimestampedLine> {
        let timestamp = self.slots.get_mut(source.index())?.take()?;
        let line = self.entries.remove(&FrontierKey { timestamp, source });
        if line.is_some() {
            self.emitted += 1;
        }
        line
    }

    pub fn stats(&self) -> FrontierStats {
        FrontierStats {
            max_frontier_size: self.max_len,
            emitted: self.emitted,
        }
    }
}
