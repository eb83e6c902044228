//! Line sources with cooperative backpressure.
//!
//! Each started source is a tokio task gated by a `watch` flag. The task reads
//! one line, flips its own gate closed, and only then publishes the line, so a
//! source never has more than one unconsumed line in flight. `resume()` reopens
//! the gate for exactly one more line (or the end-of-input signal).

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use logmerge_core::id::SourceId;

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;

/// Where a source reads from. Opening it again restarts from the beginning.
#[derive(Clone)]
pub enum SourceLocation {
    Path(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl SourceLocation {
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    pub fn memory(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// In-memory source holding `lines` joined with `\n`.
    pub fn from_lines<S: AsRef<str>>(name: impl Into<String>, lines: &[S]) -> Self {
        let mut buf = String::new();
        for l in lines {
            buf.push_str(l.as_ref());
            buf.push('\n');
        }
        Self::memory(name, buf.into_bytes())
    }

    pub fn name(&self) -> String {
        match self {
            Self::Path(p) => p.display().to_string(),
            Self::Memory { name, .. } => name.clone(),
        }
    }

    async fn open(&self, capacity: usize) -> io::Result<BufReader<BoxedRead>> {
        let inner: BoxedRead = match self {
            Self::Path(p) => Box::new(tokio::fs::File::open(p).await?),
            Self::Memory { bytes, .. } => Box::new(io::Cursor::new(Arc::clone(bytes))),
        };
        Ok(BufReader::with_capacity(capacity, inner))
    }
}

impl fmt::Debug for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => f.debug_tuple("Path").field(p).finish(),
            Self::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// What a running source reports. Every source ends with exactly one
/// `Exhausted` or `Failed`, after which it sends nothing.
#[derive(Debug)]
pub enum SourceEvent {
    Line {
        source: SourceId,
        line_no: u64,
        text: String,
    },
    Exhausted {
        source: SourceId,
        lines: u64,
    },
    Failed {
        source: SourceId,
        error: io::Error,
    },
}

impl SourceEvent {
    pub fn source(&self) -> SourceId {
        match self {
            Self::Line { source, .. } | Self::Exhausted { source, .. } | Self::Failed { source, .. } => {
                *source
            }
        }
    }
}

/// A startable description of one ordered input.
#[derive(Debug, Clone)]
pub struct LineSource {
    id: SourceId,
    location: SourceLocation,
    read_buffer_bytes: usize,
}

impl LineSource {
    pub fn new(id: SourceId, location: SourceLocation, read_buffer_bytes: usize) -> Self {
        Self {
            id,
            location,
            read_buffer_bytes: read_buffer_bytes.max(1),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    /// Spawn the reader task. It delivers its first line immediately and then
    /// waits for `resume()`. Must be called inside a tokio runtime.
    pub fn start(&self, events: mpsc::Sender<SourceEvent>) -> SourceHandle {
        let (gate, _) = watch::channel(true);
        let gate = Arc::new(gate);
        let task = tokio::spawn(drive(
            self.id,
            self.location.clone(),
            self.read_buffer_bytes,
            Arc::clone(&gate),
            events,
        ));
        SourceHandle {
            id: self.id,
            gate,
            task,
        }
    }
}

/// Control side of a started source. Dropping it closes the source.
#[derive(Debug)]
pub struct SourceHandle {
    id: SourceId,
    gate: Arc<watch::Sender<bool>>,
    task: JoinHandle<()>,
}

impl SourceHandle {
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Stop producing until `resume()`. Idempotent.
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    /// Allow the next line (or end-of-input) to be delivered.
    pub fn resume(&self) {
        debug!(source = %self.id, "resume");
        self.gate.send_replace(true);
    }

    pub fn is_paused(&self) -> bool {
        !*self.gate.borrow()
    }

    /// Release the read handle. Idempotent.
    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(
    id: SourceId,
    location: SourceLocation,
    capacity: usize,
    gate: Arc<watch::Sender<bool>>,
    events: mpsc::Sender<SourceEvent>,
) {
    let mut running = gate.subscribe();

    let mut lines = match location.open(capacity).await {
        Ok(reader) => reader.lines(),
        Err(error) => {
            let _ = events.send(SourceEvent::Failed { source: id, error }).await;
            return;
        }
    };

    let mut line_no = 0u64;
    loop {
        let open = running.wait_for(|r| *r).await.is_ok();
        if !open {
            return;
        }

        match lines.next_line().await {
            Ok(Some(text)) => {
                line_no += 1;
                // Close the gate before publishing so a fast resume is never lost.
                gate.send_replace(false);
                debug!(source = %id, line_no, "paused after line");
                if events
                    .send(SourceEvent::Line {
                        source: id,
                        line_no,
                        text,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(None) => {
                debug!(source = %id, lines = line_no, "exhausted");
                let _ = events
                    .send(SourceEvent::Exhausted {
                        source: id,
                        lines: line_no,
                    })
                    .await;
                return;
            }
            Err(error) => {
                let _ = events.send(SourceEvent::Failed { source: id, error }).await;
                return;
            }
        }
    }
}
