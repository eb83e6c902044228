//! Merge coordinator: the state machine that decides every emission.
//!
//! Sources only emit events; the coordinator is the single consumer of the
//! event queue and the only writer of the frontier, so each
//! select-write-remove-resume cycle runs without interleaving.
//!
//! A minimum is only taken when every live source has a line in the frontier.
//! In steady state exactly one source is in flight (the one just resumed), so
//! the next decision waits for that source's next line or its exhaustion.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use logmerge_core::id::SourceId;
use logmerge_core::line::TimestampedLine;
use logmerge_core::manifest::SourceSummary;
use logmerge_core::timestamp::TimestampParser;
use logmerge_io::sink::{LineSink, SinkStats};
use logmerge_io::source::{LineSource, SourceEvent, SourceHandle};

use crate::error::{MergeError, Result};
use crate::frontier::{Frontier, FrontierStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    AwaitingInitialFill,
    Draining,
    Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceStatus {
    /// Producing (or about to produce) its next line.
    InFlight,
    /// Its pending line sits in the frontier; the source is paused.
    Buffered,
    Exhausted,
}

/// What a completed merge hands back.
pub struct MergeOutcome<W: AsyncWrite + Unpin> {
    pub sink: LineSink<W>,
    pub sink_stats: SinkStats,
    pub frontier: FrontierStats,
    pub sources: Vec<SourceSummary>,
}

pub struct Coordinator<W: AsyncWrite + Unpin> {
    state: MergeState,
    sources: Vec<LineSource>,
    handles: Vec<SourceHandle>,
    status: Vec<SourceStatus>,
    frontier: Frontier,
    summaries: Vec<SourceSummary>,
    parser: TimestampParser,
    sink: LineSink<W>,
}

impl<W: AsyncWrite + Unpin> Coordinator<W> {
    /// `sources[i]` must carry `SourceId::new(i)`.
    pub fn new(sources: Vec<LineSource>, parser: TimestampParser, sink: LineSink<W>) -> Result<Self> {
        for (i, s) in sources.iter().enumerate() {
            if s.id().index() != i {
                return Err(MergeError::Invariant(format!(
                    "source at position {i} carries {}",
                    s.id()
                )));
            }
        }
        let n = sources.len();
        let summaries = sources
            .iter()
            .map(|s| SourceSummary::new(s.id(), s.location().name()))
            .collect();
        Ok(Self {
            state: MergeState::AwaitingInitialFill,
            sources,
            handles: Vec::with_capacity(n),
            status: vec![SourceStatus::InFlight; n],
            frontier: Frontier::new(n),
            summaries,
            parser,
            sink,
        })
    }

    pub fn state(&self) -> MergeState {
        self.state
    }

    /// Start every source and drain them all into the sink.
    ///
    /// Resolves once, after the sink is closed, or with the first fatal error.
    /// On error every source is closed before returning.
    pub async fn run(mut self) -> Result<MergeOutcome<W>> {
        // Each source has at most one undelivered event at any time.
        let (tx, mut rx) = mpsc::channel(self.sources.len().max(1));
        self.handles = self.sources.iter().map(|s| s.start(tx.clone())).collect();
        drop(tx);
        info!(sources = self.sources.len(), "awaiting initial fill");

        if let Err(e) = self.drive(&mut rx).await {
            warn!(error = %e, "merge aborted");
            self.close_sources();
            return Err(e);
        }

        let sink_stats = self.sink.close().await.map_err(MergeError::SinkWrite)?;
        let frontier = self.frontier.stats();
        info!(
            lines = sink_stats.lines,
            max_frontier = frontier.max_frontier_size,
            "merge drained"
        );
        Ok(MergeOutcome {
            sink: self.sink,
            sink_stats,
            frontier,
            sources: self.summaries,
        })
    }

    async fn drive(&mut self, rx: &mut mpsc::Receiver<SourceEvent>) -> Result<()> {
        self.advance().await?;
        while self.state != MergeState::Drained {
            let event = rx.recv().await.ok_or_else(|| {
                MergeError::Invariant("event queue closed before every source was drained".into())
            })?;
            self.on_event(event)?;
            self.advance().await?;
        }
        Ok(())
    }

    fn on_event(&mut self, event: SourceEvent) -> Result<()> {
        let source = event.source();
        let idx = source.index();
        if self.status.get(idx) != Some(&SourceStatus::InFlight) {
            return Err(MergeError::Invariant(format!(
                "{source} sent an event while not in flight"
            )));
        }

        match event {
            SourceEvent::Line { line_no, text, .. } => {
                let line = TimestampedLine::parse(source, line_no, text, &self.parser).map_err(
                    |error| MergeError::TimestampParse {
                        source_id: source,
                        line_no,
                        error,
                    },
                )?;
                let summary = &mut self.summaries[idx];
                if let Some(prev) = &summary.last_timestamp {
                    if line.timestamp < *prev {
                        warn!(source = %source, line_no, "input is not sorted; global order cannot hold");
                    }
                }
                summary.observe(&line.timestamp);
                self.frontier.insert(line)?;
                self.status[idx] = SourceStatus::Buffered;
            }
            SourceEvent::Exhausted { lines, .. } => {
                if lines != self.summaries[idx].lines {
                    return Err(MergeError::Invariant(format!(
                        "{source} reported {lines} lines, {} were received",
                        self.summaries[idx].lines
                    )));
                }
                debug!(source = %source, lines, "source exhausted");
                self.status[idx] = SourceStatus::Exhausted;
            }
            SourceEvent::Failed { error, .. } => {
                return Err(MergeError::SourceRead {
                    source_id: source,
                    name: self.summaries[idx].name.clone(),
                    error,
                });
            }
        }
        Ok(())
    }

    /// Apply every transition and emission the current state allows.
    async fn advance(&mut self) -> Result<()> {
        loop {
            match self.state {
                MergeState::AwaitingInitialFill => {
                    if !self.frontier_complete() {
                        return Ok(());
                    }
                    info!(buffered = self.frontier.len(), "initial fill complete");
                    self.state = MergeState::Draining;
                }
                MergeState::Draining => {
                    if !self.frontier_complete() {
                        return Ok(());
                    }
                    match self.frontier.select_minimum().map(|l| l.source) {
                        Some(source) => self.emit(source).await?,
                        None => {
                            // Complete and empty: every source is exhausted.
                            self.state = MergeState::Drained;
                            info!("all sources exhausted");
                        }
                    }
                }
                MergeState::Drained => return Ok(()),
            }
        }
    }

    /// Every source is either buffered or exhausted.
    fn frontier_complete(&self) -> bool {
        !self.status.contains(&SourceStatus::InFlight)
    }

    async fn emit(&mut self, source: SourceId) -> Result<()> {
        let idx = source.index();
        let line = self.frontier.remove(source).ok_or_else(|| {
            MergeError::Invariant(format!("{source} selected but missing from frontier"))
        })?;
        self.sink
            .write_line(&line.text)
            .await
            .map_err(MergeError::SinkWrite)?;

        if self.status[idx] != SourceStatus::Buffered {
            return Err(MergeError::Invariant(format!(
                "refusing to resume {source}: not buffered"
            )));
        }
        self.status[idx] = SourceStatus::InFlight;
        self.handles[idx].resume();
        Ok(())
    }

    fn close_sources(&self) {
        for h in &self.handles {
            h.close();
        }
    }
}
