//! Queries against a decoded map.

use sourcemap::SourceMap;

use crate::{LineCol, SourceMapError};

/// Decode a map from its JSON text.
///
/// Malformed mappings are reported as errors, never as panics.
pub fn parse_map(json: &str) -> Result<SourceMap, SourceMapError> {
    Ok(SourceMap::from_slice(json.as_bytes())?)
}

/// An original position resolved through a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition<'a> {
    /// Source name as listed in the map (without `sourceRoot`).
    pub source: &'a str,
    /// 0-indexed position in that source.
    pub position: LineCol,
    /// Symbol name, when the mapping carries one.
    pub name: Option<&'a str>,
}

/// Lookups on [`SourceMap`] used by the pipeline.
pub trait SourceMapExt {
    /// Look up the original position of a generated position.
    ///
    /// Picks the closest mapping on the same generated line whose column is
    /// not greater than the requested one. Returns `None` when no such mapping
    /// exists or when it does not point into a source.
    fn original_position_for(&self, generated: LineCol) -> Option<OriginalPosition<'_>>;

    /// Embedded content for a source.
    fn source_content(&self, source: &str) -> Option<&str>;

    /// Serialize to compact JSON.
    fn to_json(&self) -> Result<String, SourceMapError>;
}

impl SourceMapExt for SourceMap {
    fn original_position_for(&self, generated: LineCol) -> Option<OriginalPosition<'_>> {
        let token = self.lookup_token(generated.line, generated.col)?;
        if token.get_dst_line() != generated.line {
            return None;
        }
        Some(OriginalPosition {
            source: token.get_source()?,
            position: LineCol::new(token.get_src_line(), token.get_src_col()),
            name: token.get_name(),
        })
    }

    fn source_content(&self, source: &str) -> Option<&str> {
        let idx = self.sources().position(|s| s == source)?;
        self.get_source_contents(idx as u32)
    }

    fn to_json(&self) -> Result<String, SourceMapError> {
        let mut buf = Vec::new();
        self.to_writer(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
