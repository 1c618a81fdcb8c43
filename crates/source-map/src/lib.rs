//! Source position tracking and Source Map v3 support for vue-jest-rs.
//!
//! Maps themselves are [`sourcemap::SourceMap`] values. This crate adds the
//! position types shared by the parser and the transform pipeline, lookups
//! with the semantics the pipeline needs, and a builder that concatenates
//! independently mapped code fragments into one output.

pub mod builder;
pub mod lookup;
pub mod serde_map;

use std::ops::Range;

pub use builder::CodeBuilder;
pub use lookup::{parse_map, OriginalPosition, SourceMapExt};
pub use sourcemap::{SourceMap, SourceMapBuilder};
pub use text_size::{TextRange, TextSize};

/// Errors raised while reading or writing a source map.
#[derive(Debug, thiserror::Error)]
pub enum SourceMapError {
    /// The map could not be decoded or encoded.
    #[error("invalid source map: {0}")]
    Invalid(#[from] sourcemap::Error),
}

/// A span in the source code, representing a half-open range [start, end).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start offset (inclusive)
    pub start: u32,
    /// End offset (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span from start and end offsets.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create an empty span at the given offset.
    #[inline]
    pub const fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Get the length of the span.
    #[inline]
    pub const fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Check if the span is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Convert to a TextRange.
    #[inline]
    pub fn to_text_range(self) -> TextRange {
        TextRange::new(TextSize::new(self.start), TextSize::new(self.end))
    }

    /// Convert to a Range<usize>.
    #[inline]
    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self {
            start: range.start as u32,
            end: range.end as u32,
        }
    }
}

/// A line index for converting between byte offsets and line/column positions.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets of the start of each line.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Create a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Get the line and column for a byte offset.
    /// Line and column are 0-indexed.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        LineCol {
            line: line as u32,
            col: offset - line_start,
        }
    }

    /// Get the number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// A line and column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number.
    pub line: u32,
    /// 0-indexed column.
    pub col: u32,
}

impl LineCol {
    /// Create a new line/column position.
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Convert to 1-indexed lines for display; columns stay 0-indexed, as in
    /// JavaScript source map tooling.
    #[inline]
    pub const fn to_display(self) -> (u32, u32) {
        (self.line + 1, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span() {
        let span = Span::new(10, 20);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert_eq!(span.to_range(), 10..20);
        assert!(Span::empty(4).is_empty());
    }

    #[test]
    fn test_line_index() {
        let text = "hello\nworld\nfoo";
        let index = LineIndex::new(text);

        assert_eq!(index.line_count(), 3);

        // First line
        assert_eq!(index.line_col(0), LineCol::new(0, 0));
        assert_eq!(index.line_col(5), LineCol::new(0, 5));

        // Second line (after newline)
        assert_eq!(index.line_col(6), LineCol::new(1, 0));
        assert_eq!(index.line_col(11), LineCol::new(1, 5));

        // Third line
        assert_eq!(index.line_col(12), LineCol::new(2, 0));
    }

    #[test]
    fn test_line_col_ordering() {
        assert!(LineCol::new(0, 9) < LineCol::new(1, 0));
        assert!(LineCol::new(2, 3) < LineCol::new(2, 4));
        assert_eq!(LineCol::new(4, 2).to_display(), (5, 2));
    }
}
