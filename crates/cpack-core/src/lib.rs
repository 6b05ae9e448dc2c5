//! Core types and configuration for cpack.
//!
//! This crate provides the data structures shared by the scanning and
//! packing crates: the resolved run configuration, error and warning
//! types, and the per-run summary.

mod config;
mod error;
mod summary;

pub use config::{
    CONFIG_FILE_NAMES, DEFAULT_GZIP_OUTPUT_FILE, DEFAULT_OUTPUT_FILE, PackConfig,
    PackConfigBuilder, default_exclude_globs, default_include_globs,
};
pub use error::{ConfigError, PackError, PackWarning, WarningKind};
pub use summary::{RunSummary, SUMMARY_FOOTER, SUMMARY_HEADER};
