//! Text normalization for slide text and speaker notes.
//!
//! Handles line-ending unification, Unicode NFC composition, and
//! whitespace collapsing so that length limits count what a viewer
//! actually sees.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Regex to collapse runs of spaces and tabs into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Normalizer for text destined for slides and notes.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    /// Whether to preserve original line breaks.
    preserve_line_breaks: bool,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self {
            preserve_line_breaks: true,
        }
    }
}

impl TextNormalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to preserve original line breaks.
    pub fn with_preserve_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }

    /// Normalize a block of text.
    ///
    /// - Unifies `\r\n` and `\r` line endings to `\n`
    /// - Composes to Unicode NFC
    /// - Collapses space/tab runs to single spaces
    /// - Trims each line and drops leading/trailing blank lines
    pub fn normalize_block(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n").replace('\r', "\n");
        let composed: String = unified.nfc().collect();

        if self.preserve_line_breaks {
            let lines: Vec<String> = composed
                .lines()
                .map(|line| {
                    WHITESPACE_COLLAPSE_REGEX
                        .replace_all(line, " ")
                        .trim()
                        .to_string()
                })
                .collect();

            // Drop blank lines at either end, keep interior ones.
            let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(0);
            let end = lines.iter().rposition(|l| !l.is_empty()).map_or(0, |i| i + 1);
            lines[start..end].join("\n")
        } else {
            let collapsed = composed.split_whitespace().collect::<Vec<_>>().join(" ");
            collapsed
        }
    }

    /// Normalize and count the characters a viewer would see.
    ///
    /// This is the count that length ceilings are checked against, so
    /// decomposed and precomposed input measure identically.
    pub fn normalized_char_count(&self, text: &str) -> usize {
        self.normalize_block(text).chars().count()
    }
}
