//! Canonical-path tracking for at-most-once traversal.

use std::path::{Path, PathBuf};

use dashmap::DashSet;

/// Tracks canonical paths already claimed during one walk.
///
/// A file or directory reachable through several routes (a symlink next to
/// the real entry, a link back to an ancestor) canonicalizes to the same
/// path, so only the first claim wins. jwalk requires its read-dir hook to
/// be `Send + Sync`, which is why this is a concurrent set.
#[derive(Debug, Default)]
pub struct VisitedPaths {
    seen: DashSet<PathBuf>,
}

impl VisitedPaths {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Claim a canonical path. Returns `true` the first time it is seen.
    pub fn claim(&self, canonical: impl Into<PathBuf>) -> bool {
        self.seen.insert(canonical.into())
    }

    /// Check if a path was claimed (without claiming it).
    pub fn contains(&self, canonical: &Path) -> bool {
        self.seen.contains(canonical)
    }

    /// Number of claimed paths.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been claimed.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
