use thiserror::Error;

/// Result type local to logmerge-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink already closed")]
    SinkClosed,
}
