//! Input validation: stream one source end to end and check that every
//! timestamp parses and never goes backwards.

use tokio::sync::mpsc;
use tracing::debug;

use logmerge_core::line::TimestampedLine;
use logmerge_core::manifest::SourceSummary;
use logmerge_core::timestamp::TimestampParser;
use logmerge_io::source::{LineSource, SourceEvent};

use crate::error::{MergeError, Result};

pub async fn validate_source(source: &LineSource, parser: &TimestampParser) -> Result<SourceSummary> {
    let id = source.id();
    let name = source.location().name();
    let mut summary = SourceSummary::new(id, name.clone());

    let (tx, mut rx) = mpsc::channel(1);
    let handle = source.start(tx);

    while let Some(event) = rx.recv().await {
        match event {
            SourceEvent::Line { line_no, text, .. } => {
                let line = TimestampedLine::parse(id, line_no, text, parser).map_err(|error| {
                    MergeError::TimestampParse {
                        source_id: id,
                        line_no,
                        error,
                    }
                })?;
                if let Some(prev) = &summary.last_timestamp {
                    if line.timestamp < *prev {
                        return Err(MergeError::OutOfOrder {
                            source_id: id,
                            line_no,
                            previous: prev.clone(),
                            timestamp: line.timestamp,
                        });
                    }
                }
                summary.observe(&line.timestamp);
                handle.resume();
            }
            SourceEvent::Exhausted { lines, .. } => {
                debug!(source = %id, lines, "validated");
                return Ok(summary);
            }
            SourceEvent::Failed { error, .. } => {
                return Err(MergeError::SourceRead {
                    source_id: id,
                    name,
                    error,
                });
            }
        }
    }
    Err(MergeError::Invariant(format!(
        "{id} stopped without signalling exhaustion"
    )))
}
