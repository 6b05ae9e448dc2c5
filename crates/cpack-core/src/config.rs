//! Pack configuration types.

use std::fs;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default output file name.
pub const DEFAULT_OUTPUT_FILE: &str = "corpus-out.txt";

/// Default output file name when gzip is enabled.
pub const DEFAULT_GZIP_OUTPUT_FILE: &str = "corpus-out.txt.gz";

/// File names checked by [`PackConfig::discover`], in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["cpack.yaml", "cpack.yml", "cpack.json"];

/// Configuration for a packing run.
///
/// The glob lists are optional so that an explicitly empty list (pack
/// everything) can be told apart from an unset one (use the defaults).
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(rename_all = "camelCase")]
pub struct PackConfig {
    /// Directory to pack.
    #[builder(default = "PathBuf::from(\".\")")]
    #[serde(default)]
    pub input_dir: PathBuf,

    /// Output file path.
    #[builder(default = "PathBuf::from(DEFAULT_OUTPUT_FILE)")]
    #[serde(default)]
    pub output_file: PathBuf,

    /// Glob patterns a file must match to be packed.
    #[builder(default)]
    #[serde(default)]
    pub include_globs: Option<Vec<String>>,

    /// Glob patterns that exclude files and prune directories.
    #[builder(default)]
    #[serde(default)]
    pub exclude_globs: Option<Vec<String>>,

    /// Prepend a run summary to the output.
    #[builder(default = "false")]
    #[serde(default)]
    pub verbose: bool,

    /// Collapse whitespace in packed content.
    #[builder(default = "false")]
    #[serde(default)]
    pub compress: bool,

    /// Strip comments as well as whitespace.
    #[builder(default = "false")]
    #[serde(default)]
    pub max_compress: bool,

    /// Gzip the output stream.
    #[builder(default = "false")]
    #[serde(default)]
    pub gzip: bool,

    /// Base64 encode the gzip stream.
    #[builder(default = "false")]
    #[serde(default)]
    pub base64: bool,
}

/// Default include table.
pub fn default_include_globs() -> Vec<String> {
    [
        "**/*.go",
        "**/*.js",
        "**/*.ts",
        "**/*.css",
        "**/*.py",
        "**/*.java",
        "**/*.cpp",
        "**/*.c",
        "**/*.h",
        "**/*.hpp",
        "**/*.rb",
        "**/*.php",
        "**/*.cs",
        "**/*.swift",
        "**/*.kt",
        "**/*.md",
        "**/*.tsx",
        "**/*.jsx",
        "**/*.json",
        "**/*.{yaml,yml}",
        "**/*.toml",
        "**/*.txt",
        "**/*.xml",
        "**/*.{doc,docx}",
        "**/*.{ppt,pptx}",
        "**/*.{xls,xlsx}",
        "**/*.pdf",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Default exclude table.
pub fn default_exclude_globs() -> Vec<String> {
    [
        "**/vendor/**",
        "**/.git/**",
        "**/.github/**",
        "**/node_modules/**",
        "**/__pycache__/**",
        "**/bin/**",
        "**/obj/**",
        "**/build/**",
        "**/dist/**",
        "**/.vitepress/**",
        "**/.idea/**",
        "**/.vscode/**",
        "**/*.min.*",
        "**/*.map",
        "**/*.generated.*",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl PackConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref input) = self.input_dir {
            if input.as_os_str().is_empty() {
                return Err("Input directory cannot be empty".to_string());
            }
        }
        if let Some(ref output) = self.output_file {
            if output.as_os_str().is_empty() {
                return Err("Output file cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl PackConfig {
    /// Create a new pack config builder.
    pub fn builder() -> PackConfigBuilder {
        PackConfigBuilder::default()
    }

    /// Create a config with every field unset.
    ///
    /// This is the starting point for layering explicit values over a
    /// config file; run [`PackConfig::apply_defaults`] before packing.
    pub fn empty() -> Self {
        Self {
            input_dir: PathBuf::new(),
            output_file: PathBuf::new(),
            include_globs: None,
            exclude_globs: None,
            verbose: false,
            compress: false,
            max_compress: false,
            gzip: false,
            base64: false,
        }
    }

    /// Create a config packing `input_dir` with the default tables.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            ..Self::default()
        }
    }

    /// Load configuration from a YAML or JSON file.
    ///
    /// An empty file yields the default configuration.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        if !matches!(ext.as_str(), "yaml" | "yml" | "json") {
            return Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: ext,
            });
        }

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config = match ext.as_str() {
            "json" => serde_json::from_str(&content).map_err(|e| ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: e,
            })?,
            _ => serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source: e,
            })?,
        };

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Find the first `cpack.*` config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the config file discovered in `dir`, if any.
    pub fn load_discovered(dir: &Path) -> Result<Option<Self>, ConfigError> {
        match Self::discover(dir) {
            Some(path) => Self::from_file(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Check if the config has no explicit values besides the input dir.
    pub fn is_empty(&self) -> bool {
        self.output_file.as_os_str().is_empty()
            && self.include_globs.as_ref().is_none_or(Vec::is_empty)
            && self.exclude_globs.as_ref().is_none_or(Vec::is_empty)
            && !self.verbose
            && !self.compress
            && !self.max_compress
            && !self.gzip
            && !self.base64
    }

    /// Merge with a file config; values already set on `self` win.
    pub fn merge(self, file: Option<PackConfig>) -> Self {
        let Some(file) = file else {
            return self;
        };

        if self.is_empty() {
            let mut merged = file;
            if !self.input_dir.as_os_str().is_empty() {
                merged.input_dir = self.input_dir;
            }
            return merged;
        }

        let mut merged = self;
        if merged.input_dir.as_os_str().is_empty() {
            merged.input_dir = file.input_dir;
        }
        if merged.output_file.as_os_str().is_empty() {
            merged.output_file = file.output_file;
        }
        if merged.include_globs.as_ref().is_none_or(Vec::is_empty) {
            merged.include_globs = file.include_globs;
        }
        if merged.exclude_globs.as_ref().is_none_or(Vec::is_empty) {
            merged.exclude_globs = file.exclude_globs;
        }
        merged
    }

    /// Fill unset fields with defaults.
    pub fn apply_defaults(mut self) -> Self {
        if self.input_dir.as_os_str().is_empty() {
            self.input_dir = PathBuf::from(".");
        }

        if self.output_file.as_os_str().is_empty() {
            self.output_file = PathBuf::from(if self.gzip {
                DEFAULT_GZIP_OUTPUT_FILE
            } else {
                DEFAULT_OUTPUT_FILE
            });
        } else if self.gzip {
            let name = self.output_file.to_string_lossy();
            if !name.ends_with(".gz") && !name.contains(".gz.") {
                self.output_file = PathBuf::from(format!("{name}.gz"));
            }
        }

        if self.include_globs.is_none() {
            self.include_globs = Some(default_include_globs());
        }
        if self.exclude_globs.is_none() {
            self.exclude_globs = Some(default_exclude_globs());
        }

        if self.max_compress {
            self.compress = true;
        }
        self
    }

    /// Include patterns, empty when unset.
    pub fn includes(&self) -> &[String] {
        self.include_globs.as_deref().unwrap_or_default()
    }

    /// Exclude patterns, empty when unset.
    pub fn excludes(&self) -> &[String] {
        self.exclude_globs.as_deref().unwrap_or_default()
    }
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            include_globs: Some(default_include_globs()),
            exclude_globs: Some(default_exclude_globs()),
            ..Self::empty()
        }
    }
}
