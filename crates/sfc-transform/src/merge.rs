//! Composing the maps of two successive compilation stages.

use source_map::{LineCol, SourceMap, SourceMapBuilder, SourceMapExt};

/// Compose `old` (first stage) with `new` (second stage, applied to the
/// output of the first).
///
/// A missing map means the stage did not move anything, so the other map is
/// returned unchanged.
pub fn merge_maps(old: Option<SourceMap>, new: Option<SourceMap>) -> Option<SourceMap> {
    match (old, new) {
        (None, new) => new,
        (old, None) => old,
        (Some(old), Some(new)) => Some(merge(&old, &new)),
    }
}

/// Compose two maps.
///
/// Every mapping of `new` with an original position is looked up in `old`;
/// mappings that do not trace back to a source are dropped. A merged mapping
/// keeps `new`'s generated position, takes the line from `old` and the column
/// from `new`. Both stages must therefore agree on columns for the result to
/// be exact. Embedded source contents, `file` and `sourceRoot` come from
/// `old`.
pub fn merge(old: &SourceMap, new: &SourceMap) -> SourceMap {
    let mut builder = SourceMapBuilder::new(old.get_file());
    builder.set_source_root(old.get_source_root());
    let mut used: Vec<&str> = Vec::new();

    for token in new.tokens() {
        if token.get_source().is_none() {
            continue;
        }
        let position = LineCol::new(token.get_src_line(), token.get_src_col());
        let Some(traced) = old.original_position_for(position) else {
            continue;
        };
        builder.add(
            token.get_dst_line(),
            token.get_dst_col(),
            traced.position.line,
            position.col,
            Some(traced.source),
            traced.name,
            false,
        );
        if !used.contains(&traced.source) {
            used.push(traced.source);
        }
    }

    for source in used {
        if let Some(content) = old.source_content(source) {
            let id = builder.add_source(source);
            builder.set_source_contents(id, Some(content));
        }
    }
    builder.into_sourcemap()
}

/// Point a single-source map at a loaded external file.
pub fn retarget(map: SourceMap, path: &str, content: &str) -> SourceMap {
    if map.get_source_count() != 1 {
        return map;
    }
    let mut builder = SourceMapBuilder::new(map.get_file());
    for token in map.tokens() {
        let source = token.get_source().map(|_| path);
        builder.add(
            token.get_dst_line(),
            token.get_dst_col(),
            token.get_src_line(),
            token.get_src_col(),
            source,
            token.get_name(),
            false,
        );
    }
    let id = builder.add_source(path);
    builder.set_source_contents(id, Some(content));
    builder.into_sourcemap()
}
