//! Glob pattern compilation.
//!
//! Patterns are translated into anchored regular expressions:
//!
//! | Glob   | Meaning                                   | Regex        |
//! |--------|-------------------------------------------|--------------|
//! | `**/`  | zero or more leading path segments        | `(?:.*/)?`   |
//! | `**`   | anything, separators included             | `.*`         |
//! | `*`    | anything within one segment               | `[^/]*`      |
//! | `?`    | one character within one segment          | `[^/]`       |
//! | `{a,b}`| either alternative                        | `(?:a\|b)`   |
//!
//! Every other character is matched literally. Both the pattern and the
//! candidate path are normalized first (see [`normalize_path`]), so
//! `./src//a.GO` and `src/a.go` are the same path to a rule.

use regex::Regex;

use cpack_core::PackError;

/// Characters that end a rule's static prefix.
const WILDCARDS: [char; 3] = ['*', '?', '{'];

/// A compiled glob rule.
#[derive(Debug, Clone)]
pub struct GlobRule {
    pattern: String,
    normalized: String,
    regex: Regex,
}

impl GlobRule {
    /// Compile a glob pattern.
    pub fn compile(pattern: &str) -> Result<Self, PackError> {
        let normalized = normalize_path(pattern);
        let body = translate(&normalized).map_err(|reason| PackError::InvalidPattern {
            pattern: pattern.to_string(),
            reason,
        })?;
        let regex =
            Regex::new(&format!("^{body}$")).map_err(|e| PackError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pattern: pattern.to_string(),
            normalized,
            regex,
        })
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The normalized pattern the regex was built from.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Check if `path` matches this rule after normalization.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(&normalize_path(path))
    }

    /// Check an already normalized path.
    pub fn matches_normalized(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Whether the rule contains a path separator.
    ///
    /// Rules without one are matched against base names only.
    pub fn has_separator(&self) -> bool {
        self.normalized.contains('/')
    }

    /// Whether the rule starts with `**`, i.e. can match at any depth.
    pub fn is_unanchored(&self) -> bool {
        self.normalized.starts_with("**")
    }

    /// Leading segments that contain no wildcard.
    ///
    /// `src/pkg/**/*.go` has the static prefix `src/pkg`; `**/*.go` has none.
    pub fn static_prefix(&self) -> &str {
        let mut end = 0;
        for (idx, segment) in segment_spans(&self.normalized) {
            if segment.contains(WILDCARDS) {
                break;
            }
            end = idx + segment.len();
        }
        &self.normalized[..end]
    }
}

/// Yield `(start, segment)` for each `/`-separated segment.
fn segment_spans(path: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut start = 0;
    path.split('/').map(move |segment| {
        let span = (start, segment);
        start += segment.len() + 1;
        span
    })
}

/// Normalize a file path for matching.
///
/// Applies [`normalize_dir`] and then lower-cases the extension of the
/// final segment.
pub fn normalize_path(path: &str) -> String {
    lowercase_extension(normalize_dir(path))
}

/// Normalize a directory path for matching.
///
/// Converts `\` to `/`, removes empty and `.` segments, resolves `..`
/// lexically and drops any trailing separator. Case is left untouched, so
/// `App.Core` stays `App.Core`.
pub fn normalize_dir(path: &str) -> String {
    let unified = path.replace('\\', "/");
    let absolute = unified.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let mut cleaned = segments.join("/");
    if absolute {
        cleaned.insert(0, '/');
    }
    cleaned
}

fn lowercase_extension(mut path: String) -> String {
    let name_start = path.rfind('/').map_or(0, |idx| idx + 1);
    if let Some(dot) = path[name_start..].rfind('.') {
        let ext_start = name_start + dot;
        let lowered = path[ext_start..].to_lowercase();
        path.replace_range(ext_start.., &lowered);
    }
    path
}

/// Translate a normalized glob into a regex body (without anchors).
fn translate(pattern: &str) -> Result<String, String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut pos = 0;

    translate_seq(&chars, &mut pos, &mut out, 0)?;
    Ok(out)
}

fn translate_seq(
    chars: &[char],
    pos: &mut usize,
    out: &mut String,
    depth: usize,
) -> Result<(), String> {
    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            ',' | '}' if depth > 0 => return Ok(()),
            '}' => return Err(format!("unmatched `}}` at offset {}", *pos)),
            '{' => {
                let open = *pos;
                *pos += 1;
                out.push_str("(?:");
                loop {
                    translate_seq(chars, pos, out, depth + 1)?;
                    match chars.get(*pos) {
                        Some(',') => {
                            out.push('|');
                            *pos += 1;
                        }
                        Some('}') => {
                            out.push(')');
                            *pos += 1;
                            break;
                        }
                        _ => return Err(format!("unclosed `{{` at offset {open}")),
                    }
                }
            }
            '*' if chars.get(*pos + 1) == Some(&'*') => {
                if chars.get(*pos + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    *pos += 3;
                } else {
                    out.push_str(".*");
                    *pos += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                *pos += 1;
            }
            '?' => {
                out.push_str("[^/]");
                *pos += 1;
            }
            other => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(other.encode_utf8(&mut buf)));
                *pos += 1;
            }
        }
    }
    Ok(())
}
