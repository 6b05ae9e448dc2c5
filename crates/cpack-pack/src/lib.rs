//! Packing engine for cpack.
//!
//! Walks a directory with [`cpack_scan::Walker`], rewrites each accepted
//! file with a [`ContentTransformer`] and streams the framed blocks through
//! an [`OutputPipeline`] (optionally gzip, optionally base64 on top).
//!
//! # Example
//!
//! ```rust,no_run
//! use cpack_core::PackConfig;
//! use cpack_pack::Aggregator;
//!
//! let config = PackConfig::new("./src").apply_defaults();
//! let summary = Aggregator::run(config).unwrap();
//! println!("Packed {} files", summary.processed.len());
//! ```

mod aggregator;
mod pipeline;
mod transform;

pub use aggregator::{Aggregator, RunState};
pub use pipeline::{EncodingChain, OutputPipeline, Stage};
pub use transform::{CompressMode, ContentTransformer};

// Re-export core types for convenience
pub use cpack_core::{PackConfig, PackError, PackWarning, RunSummary};
