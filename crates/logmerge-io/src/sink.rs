//! Ordered, append-only line sink.
//!
//! Writes are applied in call order through a single `BufWriter`; nothing is
//! reordered or batched across `close()`. The sink also keeps a running blake3
//! digest of every byte it accepts.

use std::path::Path;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use logmerge_core::config::{LineEnding, OutputDestination};
use logmerge_core::hash::{Hash256, OutputHasher};

use crate::error::{Error, Result};

pub type BoxedSink = LineSink<Box<dyn AsyncWrite + Send + Unpin>>;

/// Counters reported when the sink closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkStats {
    pub lines: u64,
    pub bytes: u64,
    pub digest: Hash256,
}

pub struct LineSink<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
    ending: LineEnding,
    hasher: OutputHasher,
    lines: u64,
    bytes: u64,
    closed: bool,
}

impl<W: AsyncWrite + Unpin> LineSink<W> {
    pub fn new(writer: W, ending: LineEnding, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity.max(1), writer),
            ending,
            hasher: OutputHasher::new(),
            lines: 0,
            bytes: 0,
            closed: false,
        }
    }

    /// Append `line` followed by the record separator.
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        if self.closed {
            return Err(Error::SinkClosed);
        }
        let sep = self.ending.as_bytes();
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(sep).await?;
        self.hasher.update(line.as_bytes());
        self.hasher.update(sep);
        self.lines += 1;
        self.bytes += (line.len() + sep.len()) as u64;
        Ok(())
    }

    /// Flush and shut down the underlying writer. Idempotent.
    pub async fn close(&mut self) -> Result<SinkStats> {
        if !self.closed {
            self.writer.flush().await?;
            self.writer.shutdown().await?;
            self.closed = true;
            debug!(lines = self.lines, bytes = self.bytes, "sink closed");
        }
        Ok(self.stats())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> SinkStats {
        SinkStats {
            lines: self.lines,
            bytes: self.bytes,
            digest: self.hasher.digest(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Open the configured destination, creating parent directories for paths.
pub async fn open_destination(
    dest: &OutputDestination,
    ending: LineEnding,
    capacity: usize,
) -> Result<BoxedSink> {
    let writer: Box<dyn AsyncWrite + Send + Unpin> = match dest {
        OutputDestination::Stdout => Box::new(tokio::io::stdout()),
        OutputDestination::Path(p) => Box::new(create_file(p).await?),
    };
    Ok(LineSink::new(writer, ending, capacity))
}

async fn create_file(path: &Path) -> Result<tokio::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(tokio::fs::File::create(path).await?)
}
