//! The unit that flows from a source through the frontier to the sink.

use serde::{Deserialize, Serialize};

use crate::id::SourceId;
use crate::timestamp::{Timestamp, TimestampError, TimestampParser};

/// A raw line bound to its parsed timestamp and originating source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedLine {
    pub source: SourceId,
    /// 1-based position within the source, for diagnostics.
    pub line_no: u64,
    pub timestamp: Timestamp,
    pub text: String,
}

impl TimestampedLine {
    pub fn parse(
        source: SourceId,
        line_no: u64,
        text: String,
        parser: &TimestampParser,
    ) -> Result<Self, TimestampError> {
        let timestamp = parser.parse(&text)?;
        Ok(Self {
            source,
            line_no,
            timestamp,
            text,
        })
    }

    /// Merge order key: timestamp first, then source index.
    pub fn merge_key(&self) -> (&Timestamp, SourceId) {
        (&self.timestamp, self.source)
    }
}
