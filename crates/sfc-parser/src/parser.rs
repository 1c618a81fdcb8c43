//! Parser for Vue Single File Components.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::SfcLexer;
use source_map::{LineIndex, SourceMap, SourceMapBuilder, Span};

/// Split a component file into its blocks.
///
/// Parsing never fails outright: problems such as duplicate blocks or a
/// missing end tag are collected in [`ComponentDescriptor::errors`].
pub fn parse_sfc(source: &str, filename: &str) -> ComponentDescriptor {
    let mut parser = SfcParser::new(source, filename);
    parser.parse()
}

/// Parser for Vue SFC files.
struct SfcParser<'a> {
    lexer: SfcLexer<'a>,
    source: &'a str,
    filename: &'a str,
    line_index: LineIndex,
}

impl<'a> SfcParser<'a> {
    /// Create a new parser for the given source.
    fn new(source: &'a str, filename: &'a str) -> Self {
        Self {
            lexer: SfcLexer::new(source),
            source,
            filename,
            line_index: LineIndex::new(source),
        }
    }

    /// Parse the SFC.
    fn parse(&mut self) -> ComponentDescriptor {
        let mut sfc = ComponentDescriptor::new(self.filename, self.source);

        while !self.lexer.is_eof() {
            self.lexer.skip_whitespace();

            if self.lexer.is_eof() {
                break;
            }

            if self.lexer.starts_with("<!--") {
                self.lexer.read_comment();
                continue;
            }

            if self.lexer.starts_with("<") && !self.lexer.starts_with("</") {
                self.parse_block(&mut sfc);
                continue;
            }

            // Skip any other content
            self.lexer.next_char();
        }

        sfc
    }

    /// Parse a block (template, script, style, or custom).
    fn parse_block(&mut self, sfc: &mut ComponentDescriptor) {
        let start = self.lexer.pos();

        if !self.lexer.consume("<") {
            return;
        }

        self.lexer.skip_whitespace();

        let tag_name = match self.lexer.read_tag_name() {
            Some(name) => name.to_lowercase(),
            // Not a valid tag, skip
            None => return,
        };

        let attrs = self.parse_attributes();

        self.lexer.skip_whitespace();

        let is_self_closing = self.lexer.consume("/>");
        if !is_self_closing {
            self.lexer.consume(">");
        }

        let tag_end = self.lexer.pos();

        let (content, content_span) = if is_self_closing {
            (String::new(), Span::empty(tag_end as u32))
        } else {
            let content_start = self.lexer.pos();
            let (content, closed) = self.lexer.read_block_content(&tag_name);
            let content_span = self.lexer.span_from(content_start);
            if !closed {
                sfc.errors
                    .push(ParseError::unclosed_tag(&tag_name, self.lexer.span_from(start)));
            }
            (content.to_string(), content_span)
        };

        if !is_self_closing && self.lexer.consume_ignore_case(&format!("</{}", tag_name)) {
            self.lexer.consume_until(">");
            self.lexer.consume(">");
        }

        let span = self.lexer.span_from(start);

        let lang = get_attr_value(&attrs, "lang").map(String::from);
        let src = get_attr_value(&attrs, "src")
            .filter(|s| !s.is_empty())
            .map(String::from);
        if src.is_some() && !content.trim().is_empty() {
            sfc.errors
                .push(ParseError::src_with_content(&tag_name, span));
        }

        let mut block = SfcBlock {
            span,
            content_span,
            content,
            attrs,
            lang,
            src,
            map: None,
        };

        match tag_name.as_str() {
            "template" => {
                if sfc.template.is_some() {
                    sfc.errors.push(ParseError::duplicate_block("template", span));
                } else {
                    let functional = has_attr(&block.attrs, "functional");
                    sfc.template = Some(TemplateBlock { block, functional });
                }
            }
            "script" => {
                let setup = has_attr(&block.attrs, "setup");
                let slot = if setup {
                    &mut sfc.script_setup
                } else {
                    &mut sfc.script
                };
                if slot.is_some() {
                    let name = if setup { "script setup" } else { "script" };
                    sfc.errors.push(ParseError::duplicate_block(name, span));
                } else {
                    block.map = Some(self.block_map(&block));
                    *slot = Some(ScriptBlock { block, setup });
                }
            }
            "style" => {
                let scoped = has_attr(&block.attrs, "scoped");
                let module = if has_attr(&block.attrs, "module") {
                    Some(
                        get_attr_value(&block.attrs, "module")
                            .filter(|m| !m.is_empty())
                            .unwrap_or("$style")
                            .to_string(),
                    )
                } else {
                    None
                };
                sfc.styles.push(StyleBlock {
                    block,
                    scoped,
                    module,
                });
            }
            _ => {
                sfc.custom_blocks.push(CustomBlock {
                    block,
                    block_type: tag_name.into(),
                });
            }
        }
    }

    /// Parse attributes of a tag.
    fn parse_attributes(&mut self) -> Vec<BlockAttr> {
        let mut attrs = Vec::new();

        loop {
            self.lexer.skip_whitespace();

            if self.lexer.starts_with(">") || self.lexer.starts_with("/>") || self.lexer.is_eof() {
                break;
            }

            let name = match self.lexer.read_attr_name() {
                Some(n) => n,
                None => {
                    // Skip invalid character
                    self.lexer.next_char();
                    continue;
                }
            };

            self.lexer.skip_whitespace();

            if self.lexer.consume("=") {
                self.lexer.skip_whitespace();

                let value = if self.lexer.starts_with("\"") || self.lexer.starts_with("'") {
                    match self.lexer.read_quoted_string() {
                        Some((v, _quote)) => v,
                        None => continue,
                    }
                } else {
                    self.lexer.read_unquoted_value()
                };

                attrs.push(BlockAttr::with_value(name, value));
            } else {
                attrs.push(BlockAttr::boolean(name));
            }
        }

        attrs
    }

    /// Map each non-whitespace character of a block back to the component file.
    ///
    /// Generated line `i` maps to the line the content started on plus `i`;
    /// columns are kept as-is. Blank lines and bare `//` lines get no mappings.
    fn block_map(&self, block: &SfcBlock) -> SourceMap {
        let line_offset = self.line_index.line_col(block.content_span.start).line;

        let mut builder = SourceMapBuilder::new(Some(self.filename));
        let id = builder.add_source(self.filename);
        builder.set_source_contents(id, Some(self.source));

        for (i, line) in block.content.split('\n').enumerate() {
            if is_empty_line(line) {
                continue;
            }
            let mut col = 0u32;
            for c in line.chars() {
                if !c.is_whitespace() {
                    let row = i as u32;
                    builder.add(row, col, line_offset + row, col, Some(self.filename), None, false);
                }
                col += c.len_utf16() as u32;
            }
        }

        builder.into_sourcemap()
    }
}

fn is_empty_line(line: &str) -> bool {
    line.strip_prefix("//").unwrap_or(line).trim().is_empty()
}

fn get_attr_value<'a>(attrs: &'a [BlockAttr], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| a.name.eq_ignore_ascii_case(name))
        .and_then(|a| a.value.as_deref())
}

fn has_attr(attrs: &[BlockAttr], name: &str) -> bool {
    attrs.iter().any(|a| a.name.eq_ignore_ascii_case(name))
}
