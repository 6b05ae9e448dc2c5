//! cpack - pack a source tree into a single corpus file.
//!
//! Usage:
//!   cpack [DIR]                     Pack DIR (default: current directory)
//!   cpack -i '**/*.rs' -x '**/target/**' .
//!   cpack -z -b -o corpus.txt.gz    Gzip then base64 encode the output
//!   cpack --help                    Show help

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cpack_core::{PackConfig, RunSummary};
use cpack_pack::Aggregator;

#[derive(Parser)]
#[command(
    name = "cpack",
    version,
    about = "Pack source code into a single corpus file",
    long_about = "cpack walks a directory, selects files with include/exclude glob \
                  patterns and writes their contents into one output file.\n\n\
                  Options not given on the command line are read from --config or \
                  from a cpack.yaml, cpack.yml or cpack.json in the working directory."
)]
struct Cli {
    /// Directory to pack (overrides --dir)
    directory: Option<PathBuf>,

    /// Input directory to process
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Output file path (default: corpus-out.txt, or corpus-out.txt.gz with --gzip)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include a summary at the start of the output file
    #[arg(short, long)]
    verbose: bool,

    /// Remove extra whitespace from file contents
    #[arg(short, long)]
    compress: bool,

    /// Also strip comments before compressing
    #[arg(short, long)]
    max_compress: bool,

    /// Gzip the output file
    #[arg(short = 'z', long)]
    gzip: bool,

    /// Base64 encode the gzip stream (requires --gzip)
    #[arg(short, long)]
    base64: bool,

    /// Glob patterns to include (e.g. '**/*.go,src/**/*.py')
    #[arg(short, long, value_delimiter = ',')]
    include: Vec<String>,

    /// Glob patterns to exclude (e.g. '**/vendor/**,**/*_test.go')
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Read options from this YAML or JSON file
    #[arg(long, conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Do not look for a cpack.* config file
    #[arg(long)]
    no_config: bool,

    /// Log level for diagnostics on stderr (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Cli {
    /// Options given explicitly on the command line.
    fn explicit_config(&self) -> PackConfig {
        let input_dir = self
            .directory
            .clone()
            .or_else(|| self.dir.clone())
            .unwrap_or_default();

        PackConfig {
            input_dir,
            output_file: self.output.clone().unwrap_or_default(),
            include_globs: non_empty(&self.include),
            exclude_globs: non_empty(&self.exclude),
            verbose: self.verbose,
            compress: self.compress,
            max_compress: self.max_compress,
            gzip: self.gzip,
            base64: self.base64,
        }
    }

    fn file_config(&self) -> Result<Option<PackConfig>> {
        if self.no_config {
            return Ok(None);
        }
        if let Some(path) = &self.config {
            let config = PackConfig::from_file(path)
                .wrap_err_with(|| format!("Failed to load config {}", path.display()))?;
            return Ok(Some(config));
        }

        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        discovered_config(&cwd)
    }
}

/// Load the first config file found in `dir`, looking only once.
fn discovered_config(dir: &Path) -> Result<Option<PackConfig>> {
    let Some(found) = PackConfig::discover(dir) else {
        return Ok(None);
    };
    tracing::info!(config = %found.display(), "Using discovered config file");
    let config = PackConfig::from_file(&found)
        .wrap_err_with(|| format!("Failed to load discovered config {}", found.display()))?;
    Ok(Some(config))
}

fn non_empty(patterns: &[String]) -> Option<Vec<String>> {
    let patterns: Vec<String> = patterns
        .iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    (!patterns.is_empty()).then_some(patterns)
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.log_level)?;

    let config = cli
        .explicit_config()
        .merge(cli.file_config()?)
        .apply_defaults();
    let output = config.output_file.clone();

    let summary = Aggregator::run(config).context("Packing failed")?;
    print_report(&output, &summary);

    Ok(())
}

fn init_tracing(level: Option<LogLevel>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(crate_directives(level.as_str()))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(crate_directives("info")))?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn crate_directives(level: &str) -> String {
    ["cpack", "cpack_core", "cpack_scan", "cpack_pack"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn print_report(output: &Path, summary: &RunSummary) {
    eprintln!(
        "Packed {} files ({}) into {} in {:.2}s",
        summary.processed.len(),
        format_size(summary.total_bytes),
        output.display(),
        summary.elapsed().as_secs_f64()
    );
    if !summary.skipped.is_empty() {
        eprintln!("{} file(s) skipped", summary.skipped.len());
    }
    if summary.has_warnings() {
        eprintln!("{} warning(s) during packing", summary.warnings.len());
    }
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
