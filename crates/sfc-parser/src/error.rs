//! Error types for component parsing.

use source_map::Span;
use std::fmt;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// A problem found while splitting a component into blocks.
///
/// These are recoverable: the descriptor still holds every block that
/// could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The span where the error occurred.
    pub span: Span,
    /// The error code.
    pub code: ErrorCode,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, span: Span, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            span,
            code,
        }
    }

    /// Create an unclosed tag error.
    pub fn unclosed_tag(tag: &str, span: Span) -> Self {
        Self::new(
            format!("Element <{}> is missing end tag.", tag),
            span,
            ErrorCode::UnclosedTag,
        )
    }

    /// Create a duplicate block error.
    pub fn duplicate_block(block: &str, span: Span) -> Self {
        Self::new(
            format!("Single file component can contain only one <{}> element", block),
            span,
            ErrorCode::DuplicateBlock,
        )
    }

    /// Create an error for a `src` attribute combined with inline content.
    pub fn src_with_content(block: &str, span: Span) -> Self {
        Self::new(
            format!("<{}> cannot have both a src attribute and inline content", block),
            span,
            ErrorCode::InvalidContent,
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error codes for categorizing parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Unclosed tag.
    UnclosedTag,
    /// Duplicate block (e.g., two <template> blocks).
    DuplicateBlock,
    /// Invalid block content.
    InvalidContent,
}

impl ErrorCode {
    /// Get the error code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::UnclosedTag => "unclosed-tag",
            ErrorCode::DuplicateBlock => "duplicate-block",
            ErrorCode::InvalidContent => "invalid-content",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
