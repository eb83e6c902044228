//! logmerge CLI: merge timestamp-sorted log files into one ordered output.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use logmerge_core::config::{LineEnding, MergeConfig, MergeConfigFile, OutputDestination};
use logmerge_core::timestamp::TimestampFormat;
use logmerge_exec::Engine;
use logmerge_io::SourceLocation;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "logmerge")]
#[command(about = "Merge independently sorted log files into one timestamp-ordered stream", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads inputs.
#[derive(Args, Debug, Default)]
struct InputOptions {
    /// YAML config file (overrides LOGMERGE_* environment defaults)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Width of the timestamp prefix in bytes (overrides config)
    #[arg(long)]
    prefix_len: Option<usize>,

    /// Timestamp format: iso8601, rfc3339, lexical, or a strftime pattern
    #[arg(long)]
    format: Option<TimestampFormat>,

    /// Number of inputs to expect; the run is rejected on mismatch
    #[arg(long)]
    expect_sources: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the inputs into a single ordered output
    Merge {
        /// Input log files, in source-index order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        opts: InputOptions,

        /// Output file (overrides config)
        #[arg(short, long, conflicts_with = "stdout")]
        output: Option<PathBuf>,

        /// Write merged lines to stdout
        #[arg(long)]
        stdout: bool,

        /// Terminate output lines with CRLF
        #[arg(long)]
        crlf: bool,

        /// Write the merge report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Check that every input parses and is internally sorted
    Validate {
        /// Input log files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        opts: InputOptions,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("logmerge={0},logmerge_exec={0},logmerge_io={0}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Merge {
            inputs,
            opts,
            output,
            stdout,
            crlf,
            report,
        } => {
            if let Err(e) = run_merge(inputs, &opts, output, stdout, crlf, report).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { inputs, opts } => {
            if let Err(e) = run_validate(inputs, &opts).await {
                eprintln!("Validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_merge(
    inputs: Vec<PathBuf>,
    opts: &InputOptions,
    output: Option<PathBuf>,
    stdout: bool,
    crlf: bool,
    report_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = build_config(opts)?;
    if let Some(path) = output {
        config.output = OutputDestination::Path(path);
    }
    if stdout {
        config.output = OutputDestination::Stdout;
    }
    if crlf {
        config.line_ending = LineEnding::Crlf;
    }
    let to_stdout = config.output == OutputDestination::Stdout;

    let engine = Engine::new(config)?;
    let report = engine.merge(locations(inputs)).await?;
    info!(digest = ?report.output_digest.map(|d| d.to_hex()), "merge finished");

    if let Some(path) = report_path {
        fs::write(path, report.to_json_pretty()?)?;
    }

    // Keep stdout clean when it carries the merged lines.
    if !to_stdout {
        println!("✓ Merged {} sources", report.sources.len());
        println!("  Lines: {}", report.lines_written);
        println!("  Output: {}", engine.config().output);
        println!("  Duration: {}ms", report.duration_ms());
        if let Some(digest) = report.output_digest {
            println!("  Digest: {}", digest);
        }
    }
    Ok(())
}

async fn run_validate(
    inputs: Vec<PathBuf>,
    opts: &InputOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(build_config(opts)?)?;
    let summaries = engine.validate(locations(inputs)).await?;
    for s in &summaries {
        match (&s.first_timestamp, &s.last_timestamp) {
            (Some(first), Some(last)) => {
                println!("✓ {}: {} lines, {} .. {}", s.name, s.lines, first, last)
            }
            _ => println!("✓ {}: empty", s.name),
        }
    }
    Ok(())
}

/// Defaults → environment → config file → CLI flags.
fn build_config(opts: &InputOptions) -> Result<MergeConfig, Box<dyn std::error::Error>> {
    let mut config = MergeConfig::from_env();
    if let Some(path) = &opts.config {
        let file = load_config_file(path)?;
        file.apply(&mut config);
    }
    apply_cli_overrides(&mut config, opts);
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<MergeConfigFile, Box<dyn std::error::Error>> {
    let yaml = fs::read_to_string(path)?;
    Ok(MergeConfigFile::from_yaml_str(&yaml)?)
}

fn apply_cli_overrides(cfg: &mut MergeConfig, opts: &InputOptions) {
    if let Some(n) = opts.prefix_len {
        cfg.timestamp_prefix_len = n;
    }
    if let Some(f) = &opts.format {
        cfg.timestamp_format = f.clone();
    }
    if let Some(n) = opts.expect_sources {
        cfg.source_count = Some(n);
    }
}

fn locations(inputs: Vec<PathBuf>) -> Vec<SourceLocation> {
    inputs.into_iter().map(SourceLocation::Path).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_file_overrides_defaults() {
        let mut config = MergeConfig::default();
        let file = MergeConfigFile {
            timestamp_prefix_len: Some(19),
            output: Some(OutputDestination::Stdout),
            ..Default::default()
        };
        file.apply(&mut config);
        assert_eq!(config.timestamp_prefix_len, 19);
        assert_eq!(config.output, OutputDestination::Stdout);
    }

    #[test]
    fn cli_overrides_higher_priority_than_config() {
        let mut config = MergeConfig::default();
        MergeConfigFile {
            timestamp_prefix_len: Some(19),
            ..Default::default()
        }
        .apply(&mut config);

        let opts = InputOptions {
            prefix_len: Some(25),
            format: Some(TimestampFormat::Lexical),
            expect_sources: Some(4),
            ..Default::default()
        };
        apply_cli_overrides(&mut config, &opts);
        assert_eq!(config.timestamp_prefix_len, 25);
        assert_eq!(config.timestamp_format, TimestampFormat::Lexical);
        assert_eq!(config.source_count, Some(4));
    }

    #[test]
    fn parses_merge_arguments() {
        let cli = Cli::try_parse_from([
            "logmerge", "merge", "1.log", "2.log", "--prefix-len", "19", "--format", "rfc3339",
            "--stdout",
        ])
        .unwrap();
        match cli.command {
            Commands::Merge {
                inputs,
                opts,
                stdout,
                ..
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(opts.prefix_len, Some(19));
                assert_eq!(opts.format, Some(TimestampFormat::Rfc3339));
                assert!(stdout);
            }
            Commands::Validate { .. } => panic!("expected merge"),
        }
    }

    #[test]
    fn output_and_stdout_conflict() {
        let parsed = Cli::try_parse_from(["logmerge", "merge", "1.log", "-o", "x.log", "--stdout"]);
        assert!(parsed.is_err());
    }
}
