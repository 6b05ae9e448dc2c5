//! Filtered pre-order directory traversal built on jwalk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use jwalk::{Parallelism, WalkDirGeneric};

use cpack_core::{PackWarning, WarningKind};

use crate::filter::PathFilter;
use crate::visited::VisitedPaths;

/// Walk decision attached to each jwalk entry by the read-dir hook.
#[derive(Debug, Default, Clone, Copy)]
struct EntryState {
    emit: bool,
    via_symlink: bool,
}

type Client = ((), EntryState);
type Entry = jwalk::DirEntry<Client>;

/// Kind of traversal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A filesystem entry reached by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalNode {
    /// Absolute path as traversed (not resolved through symlinks).
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub rel_path: String,
    pub kind: EntryKind,
    /// Whether the entry resolves somewhere other than its traversed path.
    pub via_symlink: bool,
}

/// One item produced by [`Walker::walk`].
#[derive(Debug, Clone)]
pub enum WalkItem {
    /// An accepted directory, yielded before its children.
    Directory(TraversalNode),
    /// A file accepted by the filter.
    File(TraversalNode),
    /// A file rejected by the filter.
    Skipped(TraversalNode),
    /// A recoverable access problem with a single entry.
    Warning(PackWarning),
}

/// Directory walker that consults a [`PathFilter`] at every node.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    filter: Arc<PathFilter>,
    ignored: Vec<PathBuf>,
}

impl Walker {
    /// Create a walker over `root`.
    pub fn new(root: impl Into<PathBuf>, filter: PathFilter) -> Self {
        Self {
            root: root.into(),
            filter: Arc::new(filter),
            ignored: Vec::new(),
        }
    }

    /// Never yield the entry at `path`, compared by canonical path.
    pub fn ignore_path(mut self, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.ignored.push(canonical);
        self
    }

    /// The filter used by this walker.
    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Walk the tree lazily.
    ///
    /// Entries are sorted by file name within each directory. Excluded
    /// directories are pruned before they are read, and every canonical
    /// path is visited at most once, so symlink cycles terminate.
    pub fn walk(&self) -> impl Iterator<Item = WalkItem> + use<> {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());

        let visited = VisitedPaths::new();
        visited.claim(root.clone());

        let hook = ReadDirHook {
            root: root.clone(),
            filter: Arc::clone(&self.filter),
            visited,
            ignored: self.ignored.clone(),
        };

        WalkDirGeneric::<Client>::new(&root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(true)
            .sort(true)
            .process_read_dir(move |depth, _dir, _state, children| {
                // The root entry itself is listed at depth `None`; it is
                // already claimed above.
                if depth.is_some() {
                    hook.prune(children);
                }
            })
            .into_iter()
            .filter_map(move |result| match result {
                Ok(entry) if entry.depth == 0 => None,
                Ok(entry) => Some(walk_item(&root, &entry)),
                Err(err) => Some(WalkItem::Warning(classify_error(&err))),
            })
    }
}

/// State shared with jwalk's `process_read_dir` callback.
struct ReadDirHook {
    root: PathBuf,
    filter: Arc<PathFilter>,
    visited: VisitedPaths,
    ignored: Vec<PathBuf>,
}

impl ReadDirHook {
    /// Drop children that must not be yielded or descended into.
    ///
    /// Direct entries claim their canonical paths before symlinks in the
    /// same directory, so a file reachable both ways keeps its direct path.
    fn prune(&self, children: &mut Vec<jwalk::Result<Entry>>) {
        let mut keep = vec![true; children.len()];
        for symlinks in [false, true] {
            for (idx, child) in children.iter_mut().enumerate() {
                if let Ok(entry) = child {
                    if entry.path_is_symlink() == symlinks {
                        keep[idx] = self.admit(entry);
                    }
                }
            }
        }

        let mut keep = keep.into_iter();
        children.retain(|_| keep.next().unwrap_or(true));
    }

    fn admit(&self, entry: &mut Entry) -> bool {
        let path = entry.path();
        let rel = relative_path(&self.root, &path);
        let is_dir = entry.file_type().is_dir();

        if is_dir && !self.filter.should_descend(&rel) {
            return false;
        }
        let emit = is_dir || self.filter.should_emit(&rel);

        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(err) => {
                tracing::debug!(path = %path.display(), "Cannot canonicalize: {err}");
                entry.client_state = EntryState {
                    emit,
                    via_symlink: entry.path_is_symlink(),
                };
                return true;
            }
        };

        if self.ignored.contains(&canonical) {
            tracing::debug!(path = %rel, "Ignoring path");
            return false;
        }
        if emit && !self.visited.claim(canonical.clone()) {
            tracing::debug!(path = %rel, target = %canonical.display(), "Already visited");
            return false;
        }

        entry.client_state = EntryState {
            emit,
            via_symlink: canonical != path,
        };
        true
    }
}

fn walk_item(root: &Path, entry: &Entry) -> WalkItem {
    let path = entry.path();
    let file_type = entry.file_type();

    // Symlinks that survive link following have no target.
    if file_type.is_symlink() {
        return WalkItem::Warning(PackWarning::broken_symlink(path));
    }

    let kind = if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };
    let node = TraversalNode {
        rel_path: relative_path(root, &path),
        path,
        kind,
        via_symlink: entry.client_state.via_symlink,
    };

    if file_type.is_dir() {
        WalkItem::Directory(node)
    } else if entry.client_state.emit && file_type.is_file() {
        WalkItem::File(node)
    } else {
        WalkItem::Skipped(node)
    }
}

fn classify_error(err: &jwalk::Error) -> PackWarning {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();

    if let Some(ancestor) = err.loop_ancestor() {
        let message = format!("Symlink loop back to {}", ancestor.display());
        return PackWarning::new(path, message, WarningKind::SymlinkLoop);
    }

    match err.io_error() {
        Some(io) if io.kind() == std::io::ErrorKind::PermissionDenied => {
            PackWarning::permission_denied(path)
        }
        Some(io)
            if io.kind() == std::io::ErrorKind::NotFound && path.symlink_metadata().is_ok() =>
        {
            PackWarning::broken_symlink(path)
        }
        Some(io) => PackWarning::read_error(path, io),
        None => PackWarning::new(path, err.to_string(), WarningKind::MetadataError),
    }
}

/// Root-relative path with `/` separators.
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("src/pkg1")).unwrap();
        fs::create_dir_all(root.join("vendor/lib")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();

        fs::write(root.join("main.go"), "package main").unwrap();
        fs::write(root.join("notes.txt"), "notes").unwrap();
        fs::write(root.join("src/pkg1/a.go"), "package pkg1").unwrap();
        fs::write(root.join("vendor/lib/v.go"), "package lib").unwrap();
        fs::write(root.join(".hidden/h.go"), "package hidden").unwrap();

        temp
    }

    fn go_filter() -> PathFilter {
        PathFilter::new(&["**/*.go".to_string()], &["**/vendor/**".to_string()])
    }

    fn files(walker: &Walker) -> Vec<String> {
        walker
            .walk()
            .filter_map(|item| match item {
                WalkItem::File(node) => Some(node.rel_path),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_walk_filters_and_prunes() {
        let temp = create_test_tree();
        let walker = Walker::new(temp.path(), go_filter());

        let items: Vec<_> = walker.walk().collect();
        let emitted: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                WalkItem::File(node) => Some(node.rel_path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(emitted, vec![".hidden/h.go", "main.go", "src/pkg1/a.go"]);

        let skipped: Vec<_> = items
            .iter()
            .filter_map(|item| match item {
                WalkItem::Skipped(node) => Some(node.rel_path.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, vec!["notes.txt"]);

        assert!(!items.iter().any(|item| matches!(
            item,
            WalkItem::Directory(node) if node.rel_path.starts_with("vendor")
        )));
    }

    #[test]
    fn test_root_children_are_walked() {
        let temp = create_test_tree();
        let walker = Walker::new(temp.path(), PathFilter::default());

        let items: Vec<_> = walker.walk().collect();
        assert!(!items.is_empty());
        assert!(items.iter().any(|item| matches!(
            item,
            WalkItem::File(node) if node.rel_path == "main.go"
        )));
        assert!(items.iter().any(|item| matches!(
            item,
            WalkItem::Directory(node) if node.rel_path == "src"
        )));
    }

    #[test]
    fn test_directories_before_children() {
        let temp = create_test_tree();
        let walker = Walker::new(temp.path(), go_filter());

        let order: Vec<_> = walker
            .walk()
            .filter_map(|item| match item {
                WalkItem::Directory(node) | WalkItem::File(node) => Some(node.rel_path),
                _ => None,
            })
            .collect();
        let pos = |p: &str| order.iter().position(|o| o == p).unwrap();
        assert!(pos("src") < pos("src/pkg1"));
        assert!(pos("src/pkg1") < pos("src/pkg1/a.go"));
    }

    #[test]
    fn test_ignore_path() {
        let temp = create_test_tree();
        let walker = Walker::new(temp.path(), go_filter()).ignore_path(temp.path().join("main.go"));
        assert_eq!(files(&walker), vec![".hidden/h.go", "src/pkg1/a.go"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_dedup_prefers_direct_path() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("real.go"), "package real").unwrap();
        std::os::unix::fs::symlink(root.join("real.go"), root.join("alias.go")).unwrap();

        let walker = Walker::new(root, PathFilter::default());
        assert_eq!(files(&walker), vec!["real.go"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a/x.go"), "package a").unwrap();
        std::os::unix::fs::symlink(root, root.join("a/back")).unwrap();

        let walker = Walker::new(root, PathFilter::default());
        assert_eq!(files(&walker), vec!["a/x.go"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_marked() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("o.go"), "package o").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.join("linked")).unwrap();

        let walker = Walker::new(root, PathFilter::default());
        let node = walker
            .walk()
            .find_map(|item| match item {
                WalkItem::File(node) => Some(node),
                _ => None,
            })
            .unwrap();
        assert_eq!(node.rel_path, "linked/o.go");
        assert!(node.via_symlink);
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/data");
        assert_eq!(relative_path(root, Path::new("/data/a/b.go")), "a/b.go");
        assert_eq!(relative_path(root, Path::new("/data")), "");
    }
}
