//! Merge configuration that downstream crates can serialize/deserialize.
//!
//! Layering, lowest to highest priority: `Default` → `from_env` → YAML file
//! (`MergeConfigFile::apply`) → CLI flags.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::timestamp::{TimestampFormat, TimestampParser};

/// Width of the timestamp field in the reference log format.
pub const DEFAULT_TIMESTAMP_PREFIX_LEN: usize = 32;

/// Where merged output goes. Textual form: `-` for stdout, anything else is a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputDestination {
    Stdout,
    Path(PathBuf),
}

impl Default for OutputDestination {
    fn default() -> Self {
        Self::Path(PathBuf::from("output/merged.log"))
    }
}

impl From<String> for OutputDestination {
    fn from(s: String) -> Self {
        if s == "-" {
            Self::Stdout
        } else {
            Self::Path(PathBuf::from(s))
        }
    }
}

impl From<OutputDestination> for String {
    fn from(d: OutputDestination) -> Self {
        d.to_string()
    }
}

impl fmt::Display for OutputDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => f.write_str("-"),
            Self::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

/// Record separator appended after every written line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::Crlf => b"\r\n",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Number of inputs the caller expects. `None` accepts whatever list is supplied.
    pub source_count: Option<usize>,

    /// Bytes at the start of each line that form the timestamp field.
    pub timestamp_prefix_len: usize,

    pub timestamp_format: TimestampFormat,

    pub output: OutputDestination,

    pub line_ending: LineEnding,

    /// Per-source read buffer capacity.
    pub read_buffer_bytes: usize,

    /// Sink write buffer capacity.
    pub write_buffer_bytes: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            source_count: None,
            timestamp_prefix_len: DEFAULT_TIMESTAMP_PREFIX_LEN,
            timestamp_format: TimestampFormat::default(),
            output: OutputDestination::default(),
            line_ending: LineEnding::default(),
            read_buffer_bytes: 64 * 1024,
            write_buffer_bytes: 64 * 1024,
        }
    }
}

impl MergeConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `LOGMERGE_SOURCE_COUNT`: number of inputs to expect
    /// - `LOGMERGE_TIMESTAMP_PREFIX_LEN`: timestamp field width in bytes
    /// - `LOGMERGE_TIMESTAMP_FORMAT`: `iso8601`, `rfc3339`, `lexical` or a strftime pattern
    /// - `LOGMERGE_OUTPUT`: output path, `-` for stdout
    /// - `LOGMERGE_LINE_ENDING`: `lf` or `crlf`
    /// - `LOGMERGE_READ_BUFFER_BYTES` / `LOGMERGE_WRITE_BUFFER_BYTES`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("LOGMERGE_SOURCE_COUNT") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.source_count = Some(v);
            }
        }

        if let Ok(s) = std::env::var("LOGMERGE_TIMESTAMP_PREFIX_LEN") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.timestamp_prefix_len = v;
            }
        }

        if let Ok(s) = std::env::var("LOGMERGE_TIMESTAMP_FORMAT") {
            if let Ok(v) = s.parse::<TimestampFormat>() {
                cfg.timestamp_format = v;
            }
        }

        if let Ok(s) = std::env::var("LOGMERGE_OUTPUT") {
            cfg.output = OutputDestination::from(s);
        }

        if let Ok(s) = std::env::var("LOGMERGE_LINE_ENDING") {
            match s.to_ascii_lowercase().as_str() {
                "lf" => cfg.line_ending = LineEnding::Lf,
                "crlf" => cfg.line_ending = LineEnding::Crlf,
                _ => {}
            }
        }

        if let Ok(s) = std::env::var("LOGMERGE_READ_BUFFER_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.read_buffer_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("LOGMERGE_WRITE_BUFFER_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.write_buffer_bytes = v;
            }
        }

        cfg
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timestamp_prefix_len == 0 {
            return Err(Error::Config("timestamp_prefix_len must be > 0".into()));
        }
        if self.read_buffer_bytes == 0 || self.write_buffer_bytes == 0 {
            return Err(Error::Config("buffer sizes must be > 0".into()));
        }
        Ok(())
    }

    pub fn timestamp_parser(&self) -> TimestampParser {
        TimestampParser::new(self.timestamp_prefix_len, self.timestamp_format.clone())
    }
}

/// Optional overrides loaded from a YAML config file.
///
/// ```yaml
/// source_count: 10
/// timestamp_prefix_len: 32
/// timestamp_format: iso8601
/// output: output/merged.log
/// line_ending: crlf
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfigFile {
    pub source_count: Option<usize>,
    pub timestamp_prefix_len: Option<usize>,
    pub timestamp_format: Option<TimestampFormat>,
    pub output: Option<OutputDestination>,
    pub line_ending: Option<LineEnding>,
    pub read_buffer_bytes: Option<usize>,
    pub write_buffer_bytes: Option<usize>,
}

impl MergeConfigFile {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn apply(&self, cfg: &mut MergeConfig) {
        if let Some(n) = self.source_count {
            cfg.source_count = Some(n);
        }
        if let Some(n) = self.timestamp_prefix_len {
            cfg.timestamp_prefix_len = n;
        }
        if let Some(f) = &self.timestamp_format {
            cfg.timestamp_format = f.clone();
        }
        if let Some(o) = &self.output {
            cfg.output = o.clone();
        }
        if let Some(e) = self.line_ending {
            cfg.line_ending = e;
        }
        if let Some(n) = self.read_buffer_bytes {
            cfg.read_buffer_bytes = n;
        }
        if let Some(n) = self.write_buffer_bytes {
            cfg.write_buffer_bytes = n;
        }
    }
}
