//! Custom block processing.

use indexmap::IndexMap;
use sfc_parser::CustomBlock;

use crate::assemble::NAMESPACE_ALIAS;
use crate::error::TransformResult;
use crate::pipeline::Context;
use crate::transformer::ProcessInput;

/// Run the registered transformer of each custom block type.
///
/// Blocks are grouped by type in first-seen order and each group is handed
/// to its transformer at once. Types without a transformer are skipped.
/// Returns `None` when nothing produced code.
pub(crate) async fn process_custom_blocks(
    cx: &Context<'_>,
    blocks: &[CustomBlock],
) -> TransformResult<Option<String>> {
    let mut by_type: IndexMap<&str, Vec<&CustomBlock>> = IndexMap::new();
    for block in blocks {
        by_type.entry(block.block_type.as_str()).or_default().push(block);
    }

    let mut code = Vec::new();
    for (block_type, group) in &by_type {
        let Some(transformer) = cx.registry.find(block_type) else {
            tracing::debug!(file = cx.filename, block_type, "no transformer for custom block");
            continue;
        };
        let input = ProcessInput::CustomBlocks {
            blocks: group,
            namespace: NAMESPACE_ALIAS,
            filename: cx.filename,
            config: cx.config,
        };
        code.push(cx.strategy.process(transformer.as_ref(), input).await?.into_code());
    }

    Ok((!code.is_empty()).then(|| code.join("\n")))
}
