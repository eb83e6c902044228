//! Runtime: build sources and the sink from a `MergeConfig`, run the
//! coordinator, and emit a `MergeReport`.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::info;

use logmerge_core::config::MergeConfig;
use logmerge_core::hash::hash_serde;
use logmerge_core::id::SourceId;
use logmerge_core::manifest::{MergeReport, SourceSummary};
use logmerge_io::sink::{open_destination, LineSink};
use logmerge_io::source::{LineSource, SourceLocation};

use crate::coordinator::{Coordinator, MergeOutcome};
use crate::error::{MergeError, Result};
use crate::validate::validate_source;

/// Engine owns the merge configuration; every run is independent.
#[derive(Debug, Clone)]
pub struct Engine {
    cfg: MergeConfig,
}

impl Engine {
    pub fn new(cfg: MergeConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.cfg
    }

    /// Merge `inputs` into the configured output destination.
    pub async fn merge(&self, inputs: Vec<SourceLocation>) -> Result<MergeReport> {
        let sources = self.line_sources(inputs)?;
        let sink = open_destination(
            &self.cfg.output,
            self.cfg.line_ending,
            self.cfg.write_buffer_bytes,
        )
        .await
        .map_err(MergeError::SinkWrite)?;
        info!(output = %self.cfg.output, "merging {} sources", sources.len());
        let (report, _) = self.run(sources, sink).await?;
        Ok(report)
    }

    /// Merge `inputs` into an arbitrary writer and hand the writer back.
    pub async fn merge_into<W>(&self, inputs: Vec<SourceLocation>, writer: W) -> Result<(MergeReport, W)>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let sources = self.line_sources(inputs)?;
        let sink = LineSink::new(writer, self.cfg.line_ending, self.cfg.write_buffer_bytes);
        let (report, sink) = self.run(sources, sink).await?;
        Ok((report, sink.into_inner()))
    }

    /// Run `merge` on the tokio runtime; the handle is the completion signal.
    pub fn spawn(&self, inputs: Vec<SourceLocation>) -> JoinHandle<Result<MergeReport>> {
        let engine = self.clone();
        tokio::spawn(async move { engine.merge(inputs).await })
    }

    /// Check that every input parses and is internally sorted, without merging.
    pub async fn validate(&self, inputs: Vec<SourceLocation>) -> Result<Vec<SourceSummary>> {
        let sources = self.line_sources(inputs)?;
        let parser = self.cfg.timestamp_parser();
        let mut summaries = Vec::with_capacity(sources.len());
        for source in &sources {
            summaries.push(validate_source(source, &parser).await?);
        }
        Ok(summaries)
    }

    fn line_sources(&self, inputs: Vec<SourceLocation>) -> Result<Vec<LineSource>> {
        if let Some(expected) = self.cfg.source_count {
            if expected != inputs.len() {
                return Err(MergeError::SourceCountMismatch {
                    expected,
                    actual: inputs.len(),
                });
            }
        }
        Ok(inputs
            .into_iter()
            .enumerate()
            .map(|(i, loc)| LineSource::new(SourceId::new(i), loc, self.cfg.read_buffer_bytes))
            .collect())
    }

    async fn run<W>(&self, sources: Vec<LineSource>, sink: LineSink<W>) -> Result<(MergeReport, LineSink<W>)>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let config_hash = hash_serde(&self.cfg)?;
        let started_ms = now_millis();

        let coordinator = Coordinator::new(sources, self.cfg.timestamp_parser(), sink)?;
        let MergeOutcome {
            sink,
            sink_stats,
            frontier,
            sources,
        } = coordinator.run().await?;

        let mut report = MergeReport::new(config_hash, sources, started_ms);
        report.lines_written = sink_stats.lines;
        report.bytes_written = sink_stats.bytes;
        report.max_frontier_size = frontier.max_frontier_size;
        let report = report.finish(now_millis(), Some(sink_stats.digest));

        if report.lines_written != report.lines_read() {
            return Err(MergeError::Invariant(format!(
                "read {} lines but wrote {}",
                report.lines_read(),
                report.lines_written
            )));
        }
        Ok((report, sink))
    }
}

// --- helpers ---

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use logmerge_core::config::{LineEnding, OutputDestination};

    fn cfg() -> MergeConfig {
        MergeConfig {
            timestamp_prefix_len: 19,
            ..Default::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let bad = MergeConfig {
            timestamp_prefix_len: 0,
            ..Default::default()
        };
        assert!(matches!(Engine::new(bad), Err(MergeError::Config(_))));
    }

    #[tokio::test]
    async fn source_count_is_enforced() {
        let engine = Engine::new(MergeConfig {
            source_count: Some(3),
            ..cfg()
        })
        .unwrap();
        let inputs = vec![SourceLocation::from_lines("1", &["2024-01-01T00:00:01 a"])];
        let err = engine.merge_into(inputs, Vec::new()).await.unwrap_err();
        assert!(matches!(
            err,
            MergeError::SourceCountMismatch {
                expected: 3,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn report_accounts_for_every_line() {
        let engine = Engine::new(MergeConfig {
            line_ending: LineEnding::Crlf,
            ..cfg()
        })
        .unwrap();
        let inputs = vec![
            SourceLocation::from_lines("a", &["2024-01-01T00:00:01 a1", "2024-01-01T00:00:04 a2"]),
            SourceLocation::from_lines("b", &["2024-01-01T00:00:02 b1"]),
        ];
        let (report, out) = engine.merge_into(inputs, Vec::new()).await.unwrap();
        assert_eq!(report.lines_written, 3);
        assert_eq!(report.lines_read(), 3);
        assert_eq!(report.bytes_written, out.len() as u64);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2024-01-01T00:00:01 a1\r\n2024-01-01T00:00:02 b1\r\n2024-01-01T00:00:04 a2\r\n"
        );
        assert_eq!(report.sources[0].name, "a");
        assert!(report.max_frontier_size <= 2);
    }

    #[tokio::test]
    async fn spawned_merge_writes_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output/merged.log");
        let engine = Engine::new(MergeConfig {
            output: OutputDestination::Path(out.clone()),
            ..cfg()
        })
        .unwrap();
        let inputs = vec![
            SourceLocation::from_lines("1", &["2024-01-01T00:00:03 x"]),
            SourceLocation::from_lines("2", &["2024-01-01T00:00:01 y"]),
        ];
        let report = engine.spawn(inputs).await.unwrap().unwrap();
        assert_eq!(report.lines_written, 2);
        assert_eq!(
            std::fs::read_to_string(out).unwrap(),
            "2024-01-01T00:00:01 y\n2024-01-01T00:00:03 x\n"
        );
    }
}
