//! Path matching and directory walking for cpack.
//!
//! This crate decides which files of a tree are packed.
//!
//! # Overview
//!
//! - [`GlobRule`] compiles `*`, `?`, `**` and `{a,b}` patterns into
//!   anchored regular expressions over normalized paths
//! - [`PathFilter`] applies include/exclude rule sets to directories
//!   (descend or prune) and files (emit or skip)
//! - [`Walker`] traverses the tree with jwalk, consulting the filter at
//!   every node and visiting each canonical path at most once
//!
//! # Example
//!
//! ```rust,no_run
//! use cpack_scan::{PathFilter, WalkItem, Walker};
//!
//! let filter = PathFilter::new(&["**/*.rs".to_string()], &["**/target/**".to_string()]);
//! for item in Walker::new(".", filter).walk() {
//!     if let WalkItem::File(node) = item {
//!         println!("{}", node.rel_path);
//!     }
//! }
//! ```

mod filter;
mod pattern;
mod visited;
mod walker;

pub use filter::{FilterSet, PathFilter};
pub use pattern::{GlobRule, normalize_dir, normalize_path};
pub use visited::VisitedPaths;
pub use walker::{EntryKind, TraversalNode, WalkItem, Walker};

// Re-export core types for convenience
pub use cpack_core::{PackError, PackWarning, WarningKind};
