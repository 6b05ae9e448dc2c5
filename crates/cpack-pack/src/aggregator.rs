//! Run orchestration: walk, transform, write, summarize.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use strum::Display;

use cpack_core::{PackConfig, PackError, PackWarning, RunSummary};
use cpack_scan::{PathFilter, TraversalNode, WalkItem, Walker};

use crate::pipeline::{EncodingChain, OutputPipeline};
use crate::transform::{CompressMode, ContentTransformer};

/// Lifecycle of one packing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum RunState {
    #[default]
    Idle,
    Validating,
    Walking,
    Finalizing,
    Closed,
    Failed,
}

/// Drives a single packing run from a resolved configuration.
#[derive(Debug)]
pub struct Aggregator {
    config: PackConfig,
    state: RunState,
}

impl Aggregator {
    pub fn new(config: PackConfig) -> Self {
        Self {
            config,
            state: RunState::Idle,
        }
    }

    /// Pack `config.input_dir` into `config.output_file`.
    pub fn run(config: PackConfig) -> Result<RunSummary, PackError> {
        Self::new(config).execute()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Execute the run. Per-file problems are recorded in the summary;
    /// only fatal errors are returned.
    pub fn execute(&mut self) -> Result<RunSummary, PackError> {
        let result = self.drive();
        if let Err(err) = &result {
            tracing::debug!(from = %self.state, "Run failed: {err}");
            self.transition(RunState::Failed);
        }
        result
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    fn drive(&mut self) -> Result<RunSummary, PackError> {
        self.transition(RunState::Validating);

        let encoding = EncodingChain::from_flags(self.config.gzip, self.config.base64)?;
        let root = resolve_input(&self.config.input_dir)?;
        let output_path = self.config.output_file.clone();
        let file = create_output(&output_path)?;

        let verbose = self.config.verbose;
        let mode = CompressMode::from_flags(self.config.compress, self.config.max_compress);
        let transformer = ContentTransformer::new(mode, verbose);
        let mut pipeline = OutputPipeline::new(BufWriter::new(file), &encoding, verbose);

        let mut summary = RunSummary::start();
        let filter = PathFilter::new(self.config.includes(), self.config.excludes());
        for warning in filter.warnings() {
            summary.record_warning(warning.clone());
        }
        let walker = Walker::new(&root, filter).ignore_path(&output_path);

        self.transition(RunState::Walking);
        tracing::info!(
            input = %root.display(),
            output = %output_path.display(),
            %mode,
            "Packing directory"
        );

        for item in walker.walk() {
            match item {
                WalkItem::Directory(node) => {
                    tracing::debug!(dir = %node.rel_path, "Entering directory");
                }
                WalkItem::File(node) => {
                    pack_file(&node, &transformer, &mut pipeline, &mut summary)?;
                }
                WalkItem::Skipped(node) => {
                    tracing::debug!(file = %node.rel_path, "Skipping file");
                    summary.record_skipped(node.rel_path);
                }
                WalkItem::Warning(warning) => {
                    tracing::warn!("{}", warning.message);
                    summary.record_warning(warning);
                }
            }
        }

        summary.finish();

        let rendered = if verbose {
            self.transition(RunState::Finalizing);
            Some(transformer.transform_summary(&summary.render()))
        } else {
            None
        };
        pipeline.finish(rendered.as_deref())?;
        self.transition(RunState::Closed);

        tracing::info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            bytes = summary.total_bytes,
            elapsed = ?summary.elapsed(),
            "Packing complete"
        );
        Ok(summary)
    }
}

fn pack_file<W: std::io::Write>(
    node: &TraversalNode,
    transformer: &ContentTransformer,
    pipeline: &mut OutputPipeline<W>,
    summary: &mut RunSummary,
) -> Result<(), PackError> {
    let content = match fs::read(&node.path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!(file = %node.rel_path, "Error reading file: {err}");
            summary.record_skipped(format!("{} (read error)", node.rel_path));
            summary.record_warning(PackWarning::read_error(&node.path, &err));
            return Ok(());
        }
    };

    tracing::debug!(file = %node.rel_path, bytes = content.len(), "Packing file");
    pipeline.write_content(&transformer.frame(&node.rel_path, &content))?;
    summary.record_processed(node.rel_path.as_str(), content.len() as u64);
    Ok(())
}

/// Resolve the input directory to a canonical absolute path.
fn resolve_input(input: &Path) -> Result<PathBuf, PackError> {
    let root = input.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PackError::InputNotFound {
            path: input.to_path_buf(),
        },
        _ => PackError::io(input, e),
    })?;
    if !root.is_dir() {
        return Err(PackError::NotADirectory { path: root });
    }
    Ok(root)
}

/// Create the output file and any missing parent directories.
fn create_output(path: &Path) -> Result<File, PackError> {
    let output_error = |source: std::io::Error| PackError::OutputCreate {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(output_error)?;
    }
    File::create(path).map_err(output_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpack_core::WarningKind;
    use cpack_scan::EntryKind;
    use tempfile::TempDir;

    fn config(input: &Path, output: &Path) -> PackConfig {
        PackConfig {
            input_dir: input.to_path_buf(),
            output_file: output.to_path_buf(),
            include_globs: Some(vec!["**/*.go".to_string()]),
            exclude_globs: Some(Vec::new()),
            ..PackConfig::empty()
        }
    }

    #[test]
    fn test_state_after_success() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(input.path().join("a.go"), "package a").unwrap();

        let mut aggregator = Aggregator::new(config(input.path(), &out.path().join("o.txt")));
        assert_eq!(aggregator.state(), RunState::Idle);
        let summary = aggregator.execute().unwrap();
        assert_eq!(aggregator.state(), RunState::Closed);
        assert_eq!(summary.processed.len(), 1);
    }

    #[test]
    fn test_state_after_failure() {
        let out = TempDir::new().unwrap();
        let missing = out.path().join("missing");

        let mut aggregator = Aggregator::new(config(&missing, &out.path().join("o.txt")));
        let err = aggregator.execute().unwrap_err();
        assert!(matches!(err, PackError::InputNotFound { .. }));
        assert_eq!(aggregator.state(), RunState::Failed);
        assert!(!out.path().join("o.txt").exists());
    }

    #[test]
    fn test_input_is_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.go");
        fs::write(&file, "x").unwrap();

        let err = Aggregator::run(config(&file, &temp.path().join("o.txt"))).unwrap_err();
        assert!(matches!(err, PackError::NotADirectory { .. }));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("dir.go")).unwrap();
        let nodes = [
            TraversalNode {
                path: temp.path().join("gone.go"),
                rel_path: "gone.go".to_string(),
                kind: EntryKind::File,
                via_symlink: false,
            },
            TraversalNode {
                path: temp.path().join("dir.go"),
                rel_path: "dir.go".to_string(),
                kind: EntryKind::File,
                via_symlink: false,
            },
        ];

        let transformer = ContentTransformer::new(CompressMode::None, false);
        let encoding = EncodingChain::from_flags(false, false).unwrap();
        let mut pipeline = OutputPipeline::new(Vec::new(), &encoding, false);
        let mut summary = RunSummary::start();

        for node in &nodes {
            pack_file(node, &transformer, &mut pipeline, &mut summary).unwrap();
        }

        assert!(summary.processed.is_empty());
        assert_eq!(summary.total_bytes, 0);
        let skipped: Vec<_> = summary.skipped.iter().map(String::as_str).collect();
        assert_eq!(skipped, vec!["gone.go (read error)", "dir.go (read error)"]);
        assert_eq!(summary.warnings.len(), 2);
        assert!(summary.warnings.iter().all(|w| w.kind == WarningKind::ReadError));

        let (written, _) = pipeline.finish(None).unwrap();
        assert!(written.is_empty());
    }

    #[test]
    fn test_output_under_regular_file_fails() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(input.path().join("a.go"), "package a").unwrap();
        let blocker = out.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let mut aggregator = Aggregator::new(config(input.path(), &blocker.join("o.txt")));
        let err = aggregator.execute().unwrap_err();
        assert!(matches!(err, PackError::OutputCreate { .. }));
        assert_eq!(aggregator.state(), RunState::Failed);
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
    }

    #[test]
    fn test_unreadable_input_is_io_error() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.go");
        fs::write(&file, "x").unwrap();

        let err = resolve_input(&file.join("child")).unwrap_err();
        assert!(matches!(err, PackError::Io { .. }));
        assert!(matches!(
            resolve_input(&temp.path().join("missing")),
            Err(PackError::InputNotFound { .. })
        ));
    }

    #[test]
    fn test_output_parent_created() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let output = out.path().join("nested/deeper/o.txt");

        Aggregator::run(config(input.path(), &output)).unwrap();
        assert!(output.exists());
    }
}
