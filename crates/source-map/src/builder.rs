//! Concatenating generated code fragments while keeping their mappings.

use rustc_hash::FxHashMap;
use sourcemap::{SourceMap, SourceMapBuilder};

use crate::LineCol;

/// A mapping held by the builder, with its source stored by name.
#[derive(Debug, Clone)]
struct BuilderMapping {
    generated: LineCol,
    source: String,
    original: LineCol,
    name: Option<String>,
}

/// Builder for generated code with source mappings.
///
/// Each fragment appended with [`CodeBuilder::push_fragment`] keeps its own
/// mappings, shifted to where the fragment lands in the output. Columns are
/// counted in UTF-16 code units, as JavaScript tooling expects.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    /// The generated code.
    code: String,
    /// Current end-of-code position.
    end: LineCol,
    mappings: Vec<BuilderMapping>,
    sources_content: FxHashMap<String, String>,
}

impl CodeBuilder {
    /// Create a new code builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append code without mapping.
    pub fn push_str(&mut self, code: &str) {
        self.end = advance(self.end, code);
        self.code.push_str(code);
    }

    /// Append a newline.
    pub fn newline(&mut self) {
        self.push_str("\n");
    }

    /// Whether the code so far ends with a line break (or is empty).
    pub fn at_line_start(&self) -> bool {
        self.code.is_empty() || self.code.ends_with('\n')
    }

    /// Append a fragment produced by another tool, together with its map.
    ///
    /// Without a map the fragment is appended unmapped.
    pub fn push_fragment(&mut self, code: &str, map: Option<&SourceMap>) {
        if let Some(map) = map {
            for token in map.tokens() {
                let Some(source) = token.get_source() else {
                    continue;
                };
                let (line, col) = (token.get_dst_line(), token.get_dst_col());
                let generated = if line == 0 {
                    LineCol::new(self.end.line, self.end.col + col)
                } else {
                    LineCol::new(self.end.line + line, col)
                };
                self.mappings.push(BuilderMapping {
                    generated,
                    source: source.to_string(),
                    original: LineCol::new(token.get_src_line(), token.get_src_col()),
                    name: token.get_name().map(String::from),
                });
            }
            for (idx, source) in map.sources().enumerate() {
                if let Some(content) = map.get_source_contents(idx as u32) {
                    self.sources_content
                        .entry(source.to_string())
                        .or_insert_with(|| content.to_string());
                }
            }
        }
        self.push_str(code);
    }

    /// Insert `text` right before the last occurrence of `pattern`.
    ///
    /// Mappings at or after the insertion point move with the code they
    /// describe. Returns `false` when `pattern` does not occur.
    pub fn insert_before_last(&mut self, pattern: &str, text: &str) -> bool {
        let Some(offset) = self.code.rfind(pattern) else {
            return false;
        };
        let at = advance(LineCol::default(), &self.code[..offset]);
        let inserted = advance(LineCol::default(), text);

        let shift = |pos: LineCol| -> LineCol {
            if pos < at {
                pos
            } else if pos.line == at.line {
                if inserted.line == 0 {
                    LineCol::new(pos.line, pos.col + inserted.col)
                } else {
                    LineCol::new(pos.line + inserted.line, inserted.col + (pos.col - at.col))
                }
            } else {
                LineCol::new(pos.line + inserted.line, pos.col)
            }
        };

        for mapping in &mut self.mappings {
            mapping.generated = shift(mapping.generated);
        }
        self.end = shift(self.end);
        self.code.insert_str(offset, text);
        true
    }

    /// Get the generated code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Consume the builder and return the code and its source map.
    ///
    /// Only sources that some mapping points into are listed.
    pub fn finish(mut self, file: Option<&str>) -> (String, SourceMap) {
        self.mappings.sort_by_key(|m| m.generated);

        let mut builder = SourceMapBuilder::new(file);
        for mapping in &self.mappings {
            builder.add(
                mapping.generated.line,
                mapping.generated.col,
                mapping.original.line,
                mapping.original.col,
                Some(mapping.source.as_str()),
                mapping.name.as_deref(),
                false,
            );
        }
        for mapping in &self.mappings {
            if let Some(content) = self.sources_content.remove(&mapping.source) {
                let id = builder.add_source(&mapping.source);
                builder.set_source_contents(id, Some(content.as_str()));
            }
        }
        (self.code, builder.into_sourcemap())
    }
}

/// Position reached after appending `text` at `from`.
fn advance(from: LineCol, text: &str) -> LineCol {
    match text.rfind('\n') {
        Some(last) => {
            let lines = text.bytes().filter(|&b| b == b'\n').count() as u32;
            let col = text[last + 1..].encode_utf16().count() as u32;
            LineCol::new(from.line + lines, col)
        }
        None => LineCol::new(from.line, from.col + text.encode_utf16().count() as u32),
    }
}
