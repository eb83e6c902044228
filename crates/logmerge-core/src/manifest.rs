//! Merge report emitted after a successful run.
//!
//! The report carries the output digest so two runs over identical inputs can
//! be compared without re-reading the merged file.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;
use crate::id::SourceId;
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

/// Per-source accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub source: SourceId,
    /// Display form of the source location.
    pub name: String,
    pub lines: u64,
    pub first_timestamp: Option<Timestamp>,
    pub last_timestamp: Option<Timestamp>,
}

impl SourceSummary {
    pub fn new(source: SourceId, name: impl Into<String>) -> Self {
        Self {
            source,
            name: name.into(),
            lines: 0,
            first_timestamp: None,
            last_timestamp: None,
        }
    }

    pub fn observe(&mut self, ts: &Timestamp) {
        self.lines += 1;
        if self.first_timestamp.is_none() {
            self.first_timestamp = Some(ts.clone());
        }
        self.last_timestamp = Some(ts.clone());
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub id: ReportId,

    /// Engine version string for provenance.
    pub engine_version: String,

    /// Stable hash of the merge configuration used.
    pub config_hash: Hash256,

    pub sources: Vec<SourceSummary>,

    pub lines_written: u64,
    pub bytes_written: u64,

    /// Largest number of lines buffered at once; never exceeds the source count.
    pub max_frontier_size: usize,

    pub output_digest: Option<Hash256>,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl MergeReport {
    pub fn new(config_hash: Hash256, sources: Vec<SourceSummary>, started_ms: u64) -> Self {
        Self {
            id: ReportId(Uuid::new_v4()),
            engine_version: crate::VERSION.to_string(),
            config_hash,
            sources,
            lines_written: 0,
            bytes_written: 0,
            max_frontier_size: 0,
            output_digest: None,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, output_digest: Option<Hash256>) -> Self {
        self.finished_ms = finished_ms;
        self.output_digest = output_digest;
        self
    }

    /// Wall-clock run time; zero if the clock stepped backwards mid-run.
    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }

    pub fn lines_read(&self) -> u64 {
        self.sources.iter().map(|s| s.lines).sum()
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
