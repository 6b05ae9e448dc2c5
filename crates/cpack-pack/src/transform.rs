//! Content compression and file-block framing.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use strum::{Display, EnumIter};

/// Symbols whose surrounding spaces are removed, in application order.
const SYMBOLS: [&str; 21] = [
    ".", ",", ":", ";", ")", "(", "{", "}", "[", "]", "+", "-", "*", "/", "=", "<", ">", "&",
    "|", "!", "?",
];

const START_MARKER: &str = "--- START OF FILE:";
const END_MARKER: &str = "--- END OF FILE:";

static WORD_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u)(\w+)\s+(\d+)").expect("word/digit regex is valid"));

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//.*").expect("line comment regex is valid"));

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment regex is valid"));

/// How file contents are rewritten before they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumIter)]
pub enum CompressMode {
    /// Contents are written unchanged.
    #[default]
    #[strum(to_string = "none")]
    None,
    /// Whitespace is collapsed and spaces around punctuation removed.
    #[strum(to_string = "compress")]
    Compress,
    /// Like `Compress`, after stripping `//` and `/* */` comments.
    #[strum(to_string = "max-compress")]
    MaxCompress,
}

impl CompressMode {
    /// Pick the mode from the two configuration flags.
    pub fn from_flags(compress: bool, max_compress: bool) -> Self {
        match (compress, max_compress) {
            (_, true) => Self::MaxCompress,
            (true, false) => Self::Compress,
            (false, false) => Self::None,
        }
    }

    /// Whether contents are rewritten at all.
    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

/// Rewrites file contents and renders the delimited file blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTransformer {
    mode: CompressMode,
    verbose: bool,
}

impl ContentTransformer {
    pub fn new(mode: CompressMode, verbose: bool) -> Self {
        Self { mode, verbose }
    }

    pub fn mode(&self) -> CompressMode {
        self.mode
    }

    /// Rewrite file contents according to the mode.
    ///
    /// Comment stripping is a plain regex pass and does not know about
    /// string literals, so `"http://x"` loses everything after `//`.
    /// Invalid UTF-8 is decoded lossily in the compress modes.
    pub fn transform<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        if !self.mode.is_active() {
            return Cow::Borrowed(content);
        }
        let text = String::from_utf8_lossy(content);
        Cow::Owned(self.compress_text(&text).into_bytes())
    }

    /// Render the complete block for one file: delimiters plus contents.
    pub fn frame(&self, rel_path: &str, content: &[u8]) -> Vec<u8> {
        let body = self.transform(content);

        let (start, end) = if self.mode.is_active() {
            (
                format!("{START_MARKER} {rel_path} --- "),
                format!(" {END_MARKER} {rel_path} --- "),
            )
        } else {
            (
                format!("{START_MARKER} {rel_path} ---\n"),
                format!("\n{END_MARKER} {rel_path} ---\n\n"),
            )
        };

        let mut block = Vec::with_capacity(start.len() + body.len() + end.len());
        block.extend_from_slice(start.as_bytes());
        block.extend_from_slice(&body);
        block.extend_from_slice(end.as_bytes());

        if self.strips_markers() {
            block = strip_markers(&String::from_utf8_lossy(&block)).into_bytes();
        }
        block
    }

    /// Rewrite the rendered run summary.
    pub fn transform_summary(&self, summary: &str) -> String {
        if self.mode.is_active() {
            self.compress_text(summary)
        } else {
            summary.to_string()
        }
    }

    /// Markers are dropped when the output is compressed for a machine
    /// reader rather than a person.
    fn strips_markers(&self) -> bool {
        self.mode.is_active() && !self.verbose
    }

    fn compress_text(&self, text: &str) -> String {
        let text = match self.mode {
            CompressMode::MaxCompress => {
                let without_lines = LINE_COMMENT.replace_all(text, "");
                BLOCK_COMMENT.replace_all(&without_lines, "").into_owned()
            }
            _ => text.to_string(),
        };
        compress(&text)
    }
}

/// Collapse whitespace and tighten punctuation.
fn compress(text: &str) -> String {
    let mut out = text.split_whitespace().collect::<Vec<_>>().join(" ");

    for sym in SYMBOLS {
        out = out.replace(&format!(" {sym} "), sym);
        out = out.replace(&format!(" {sym}"), sym);
        out = out.replace(&format!("{sym} "), sym);
    }

    WORD_DIGIT.replace_all(&out, "${1}${2}").into_owned()
}

fn strip_markers(block: &str) -> String {
    block.replace(START_MARKER, "").replace(END_MARKER, "")
}
