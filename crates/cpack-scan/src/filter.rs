//! Include/exclude filtering for directories and files.

use cpack_core::PackWarning;

use crate::pattern::{GlobRule, normalize_dir, normalize_path};

/// Compiled include and exclude rules for one run.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    /// Include rules, in configuration order.
    pub include: Vec<GlobRule>,
    /// Exclude rules, in configuration order.
    pub exclude: Vec<GlobRule>,
    /// Whether any include pattern was configured, compiled or not.
    has_include_patterns: bool,
}

impl FilterSet {
    /// Compile both rule lists.
    ///
    /// A pattern that fails to compile is dropped and reported as a
    /// warning; it then matches nothing.
    pub fn compile(include: &[String], exclude: &[String]) -> (Self, Vec<PackWarning>) {
        let mut warnings = Vec::new();
        let include_rules = compile_rules(include, &mut warnings);
        let exclude_rules = compile_rules(exclude, &mut warnings);

        let set = Self {
            include: include_rules,
            exclude: exclude_rules,
            has_include_patterns: !include.is_empty(),
        };
        (set, warnings)
    }

    /// Check if include patterns restrict which files are packed.
    pub fn has_include_patterns(&self) -> bool {
        self.has_include_patterns
    }
}

fn compile_rules(patterns: &[String], warnings: &mut Vec<PackWarning>) -> Vec<GlobRule> {
    patterns
        .iter()
        .filter_map(|pattern| match GlobRule::compile(pattern) {
            Ok(rule) => Some(rule),
            Err(err) => {
                tracing::warn!("Ignoring glob rule: {err}");
                warnings.push(PackWarning::invalid_pattern(&err));
                None
            }
        })
        .collect()
}

/// Decides which directories to descend into and which files to pack.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    rules: FilterSet,
    warnings: Vec<PackWarning>,
}

impl PathFilter {
    /// Build a filter from include and exclude patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        let (rules, warnings) = FilterSet::compile(include, exclude);
        Self { rules, warnings }
    }

    /// Warnings for patterns that failed to compile.
    pub fn warnings(&self) -> &[PackWarning] {
        &self.warnings
    }

    /// The compiled rules.
    pub fn rules(&self) -> &FilterSet {
        &self.rules
    }

    /// Check if a directory (relative to the root) should be walked.
    ///
    /// Excluded directories are pruned. With include rules present a
    /// directory is kept whenever some include rule could still match a
    /// file below it; this errs on the side of descending.
    pub fn should_descend(&self, rel_dir: &str) -> bool {
        let dir = normalize_dir(rel_dir);
        if dir.is_empty() || dir == "." {
            return true;
        }

        // Exclude rules had their last extension lowered, so a rule naming
        // the directory itself is compared with the lowered form too.
        let lowered = normalize_path(rel_dir);
        let as_parent = format!("{dir}/");
        if let Some(rule) = self.rules.exclude.iter().find(|rule| {
            rule_matches(rule, &dir)
                || rule_matches(rule, &lowered)
                || rule.matches_normalized(&as_parent)
        }) {
            tracing::debug!(dir = %dir, pattern = rule.pattern(), "Pruning excluded directory");
            return false;
        }

        if !self.rules.has_include_patterns() {
            return true;
        }

        let keep = self.rules.include.iter().any(|rule| could_contain_match(rule, &dir));
        if !keep {
            tracing::debug!(dir = %dir, "Pruning directory outside include rules");
        }
        keep
    }

    /// Check if a file (relative to the root) should be packed.
    ///
    /// Exclude rules always win over include rules.
    pub fn should_emit(&self, rel_file: &str) -> bool {
        let file = normalize_path(rel_file);

        if let Some(rule) = self.rules.exclude.iter().find(|rule| rule_matches(rule, &file)) {
            tracing::debug!(file = %file, pattern = rule.pattern(), "Excluded file");
            return false;
        }

        if !self.rules.has_include_patterns() {
            return true;
        }

        self.rules.include.iter().any(|rule| rule_matches(rule, &file))
    }
}

/// Rules without a separator match the base name, others the full path.
fn rule_matches(rule: &GlobRule, path: &str) -> bool {
    if rule.has_separator() {
        rule.matches_normalized(path)
    } else {
        rule.matches_normalized(base_name(path))
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn could_contain_match(rule: &GlobRule, dir: &str) -> bool {
    if !rule.has_separator() || rule.is_unanchored() {
        return true;
    }

    let prefix = rule.static_prefix();
    if prefix.is_empty() {
        return true;
    }

    dir == prefix
        || is_ancestor(dir, prefix)
        || is_ancestor(prefix, dir)
        || dir.ends_with(&format!("/{prefix}"))
}

/// `ancestor` is a strict ancestor of `path` on segment boundaries.
fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'/'
}
