//! Planned text edits

use camino::Utf8PathBuf;
use refit_pattern::BoundImage;
use serde::Serialize;

/// One planned edit: replace `from` with `to` at a line/offset in a file.
///
/// Produced once per outdated match by the planner and consumed exactly
/// once by the executor. Replacements for the same file and line never
/// overlap; the planner guarantees it and the executor treats a violation
/// as a defect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextReplacement {
    /// Group label clustering related edits into one upgrade unit
    pub group: String,

    /// Target file, relative to the search root
    pub file: Utf8PathBuf,

    /// The exact matched substring being replaced
    pub from: String,

    /// The replacement substring
    pub to: String,

    /// Zero-based line number
    pub line: usize,

    /// Zero-based byte offset of the match start within the line
    pub start: usize,

    /// The matched reference bound to its pattern
    #[serde(skip_serializing)]
    pub source: BoundImage,

    /// The upgraded reference bound to its pattern
    #[serde(skip_serializing)]
    pub target: BoundImage,
}

impl TextReplacement {
    /// Byte offset one past the end of the replaced span
    pub fn end(&self) -> usize {
        self.start + self.from.len()
    }

    /// Whether two replacements on the same file and line intersect
    pub fn overlaps(&self, other: &TextReplacement) -> bool {
        self.file == other.file
            && self.line == other.line
            && self.start < other.end()
            && other.start < self.end()
    }
}
