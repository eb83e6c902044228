#![forbid(unsafe_code)]
//! logmerge: merge N timestamp-sorted log streams into one ordered stream
//! with at most one buffered line per source.
//!
//! ```no_run
//! # async fn demo() -> Result<(), logmerge::MergeError> {
//! use logmerge::{Engine, MergeConfig, SourceLocation};
//!
//! let engine = Engine::new(MergeConfig::default())?;
//! let report = engine
//!     .merge(vec![SourceLocation::path("logs/1.log"), SourceLocation::path("logs/2.log")])
//!     .await?;
//! println!("wrote {} lines", report.lines_written);
//! # Ok(())
//! # }
//! ```

pub use logmerge_core::config::{LineEnding, MergeConfig, OutputDestination};
pub use logmerge_core::manifest::MergeReport;
pub use logmerge_core::timestamp::TimestampFormat;
pub use logmerge_exec::{Engine, MergeError};
pub use logmerge_io::SourceLocation;
