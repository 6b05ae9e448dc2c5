//! Error types for packing operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that abort a packing run.
#[derive(Debug, Error)]
pub enum PackError {
    /// Input directory does not exist.
    #[error("input directory does not exist: {path}")]
    InputNotFound { path: PathBuf },

    /// Input path exists but is not a directory.
    #[error("input path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Output file (or its parent directory) could not be created.
    #[error("error creating output file {path}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A glob pattern could not be compiled.
    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Writing to the output chain failed.
    #[error("error writing {context}: {source}")]
    Write {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Closing one of the output stages failed.
    #[error("error closing {stage}: {source}")]
    Close {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error reading config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing YAML config {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("error parsing JSON config {path}: {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported config file format `{extension}`: {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },
}

/// Kind of pack warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Permission was denied.
    PermissionDenied,
    /// Symbolic link target does not exist.
    BrokenSymlink,
    /// A symbolic link points back at one of its ancestors.
    SymlinkLoop,
    /// Error reading file/directory.
    ReadError,
    /// Error reading metadata.
    MetadataError,
    /// A glob rule failed to compile and was disabled.
    InvalidPattern,
}

/// Non-fatal warning encountered during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackWarning {
    /// Path (or pattern) the warning refers to.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl PackWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Create a permission denied warning.
    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Permission denied: {}", path.display()),
            path,
            kind: WarningKind::PermissionDenied,
        }
    }

    /// Create a broken symlink warning.
    pub fn broken_symlink(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("Broken symlink: {}", path.display()),
            path,
            kind: WarningKind::BrokenSymlink,
        }
    }

    /// Create a read error warning.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path = path.into();
        let kind = match error.kind() {
            std::io::ErrorKind::PermissionDenied => WarningKind::PermissionDenied,
            _ => WarningKind::ReadError,
        };
        Self {
            message: format!("Read error: {error}"),
            path,
            kind,
        }
    }

    /// Create a warning for a glob rule that was disabled.
    pub fn invalid_pattern(error: &PackError) -> Self {
        let path = match error {
            PackError::InvalidPattern { pattern, .. } => PathBuf::from(pattern),
            _ => PathBuf::new(),
        };
        Self {
            message: error.to_string(),
            path,
            kind: WarningKind::InvalidPattern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_error_io() {
        let err = PackError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(matches!(err, PackError::Io { .. }));
        assert!(err.to_string().starts_with("I/O error at /test/path"));
    }

    #[test]
    fn test_read_error_kind() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let warning = PackWarning::read_error("/test/path", &denied);
        assert_eq!(warning.kind, WarningKind::PermissionDenied);
        assert!(warning.message.contains("Read error"));
    }

    #[test]
    fn test_invalid_pattern_warning() {
        let err = PackError::InvalidPattern {
            pattern: "src/{a".to_string(),
            reason: "unclosed brace".to_string(),
        };
        let warning = PackWarning::invalid_pattern(&err);
        assert_eq!(warning.kind, WarningKind::InvalidPattern);
        assert_eq!(warning.path, PathBuf::from("src/{a"));
    }
}
