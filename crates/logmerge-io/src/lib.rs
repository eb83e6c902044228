#![forbid(unsafe_code)]
//! logmerge-io: line sources and the output sink.
//!
//! A `LineSource` runs as its own tokio task and delivers one line at a time
//! over an mpsc channel, pausing itself after every line until resumed. The
//! `LineSink` appends lines in exactly the order it is handed them.

pub mod error;
pub mod sink;
pub mod source;

pub use error::{Error, Result};
pub use sink::{open_destination, BoxedSink, LineSink, SinkStats};
pub use source::{LineSource, SourceEvent, SourceHandle, SourceLocation};
