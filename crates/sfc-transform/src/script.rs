//! Script and script setup processing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sfc_parser::{ComponentDescriptor, ScriptBlock};
use std::sync::Arc;

use crate::assemble::Fragment;
use crate::compilers::{CompiledScript, ScriptCompiler, ScriptRequest, ScriptSetupOptions};
use crate::error::{TransformError, TransformResult};
use crate::merge::{merge_maps, retarget};
use crate::pipeline::{Context, Strategy};
use crate::resolve::{load_src, relative_to};
use crate::transformer::ProcessInput;
use crate::util::strip_inline_source_map;

static TYPESCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^typescript$|tsx?$").unwrap());

/// Language assumed for scripts without a `lang` attribute.
const DEFAULT_LANG: &str = "js";

/// Compile a plain `<script>` block.
pub(crate) async fn process_script(cx: &Context<'_>, block: &ScriptBlock) -> TransformResult<Fragment> {
    let external = match &block.src {
        Some(src) => Some((src.as_str(), load_src(src, cx.filename)?)),
        None => None,
    };
    let content = external
        .as_ref()
        .map_or(block.content.as_str(), |(_, content)| content.as_str());

    let compiled = compile_script(cx, content, block.lang.as_deref()).await?;
    let code = strip_inline_source_map(&compiled.code).to_string();

    let map = match &external {
        Some((src, content)) => compiled
            .map
            .map(|map| retarget(map, &relative_to(cx.filename, src).to_string_lossy(), content)),
        None => merge_maps(block.map.clone(), compiled.map),
    };

    Ok(Fragment {
        code,
        map,
        external_src: external.map(|(_, content)| content),
    })
}

/// Compile `<script setup>` and hand its output to the script compiler.
///
/// Returns the fragment and the template bindings found by the setup
/// compiler.
pub(crate) async fn process_script_setup(
    cx: &Context<'_>,
    descriptor: &ComponentDescriptor,
) -> TransformResult<(Fragment, Option<Map<String, Value>>)> {
    let Some(block) = &descriptor.script_setup else {
        return Err(TransformError::config("component has no <script setup> block"));
    };
    let compiler = cx.compilers.script_setup.as_ref().ok_or_else(|| {
        TransformError::config(format!(
            "No script setup compiler is configured; cannot compile <script setup> in {}",
            cx.filename
        ))
    })?;

    let options = ScriptSetupOptions {
        id: cx.filename.to_string(),
        reactivity_transform: true,
        extra: cx.options.compiler_options.clone(),
    };
    let output = match cx.strategy {
        Strategy::Blocking => compiler.compile(descriptor, &options),
        Strategy::Suspending => compiler.compile_async(descriptor, &options).await,
    }
    .map_err(TransformError::upstream)?;
    let content_map = merge_maps(block.map.clone(), output.map);

    let compiled = compile_script(cx, &output.content, block.lang.as_deref()).await?;
    let fragment = Fragment {
        code: strip_inline_source_map(&compiled.code).to_string(),
        map: merge_maps(content_map, compiled.map),
        external_src: None,
    };
    Ok((fragment, output.bindings))
}

/// Compile script text with the compiler chosen for `lang`.
///
/// A registered transformer matching the language wins; TypeScript-family
/// languages go to the TypeScript compiler; everything else goes to the
/// default script compiler.
pub(crate) async fn compile_script(
    cx: &Context<'_>,
    source: &str,
    lang: Option<&str>,
) -> TransformResult<CompiledScript> {
    let tag = lang.unwrap_or(DEFAULT_LANG);

    if let Some(transformer) = cx.registry.find(tag) {
        tracing::debug!(file = cx.filename, lang = tag, "compiling script with custom transformer");
        let input = ProcessInput::Script {
            source,
            filename: cx.filename,
            config: cx.config,
        };
        let output = cx.strategy.process(transformer.as_ref(), input).await?;
        return Ok(output.into_script());
    }

    let compiler = select_compiler(cx, tag)?;
    let request = ScriptRequest {
        source,
        filename: cx.filename,
        lang,
        config: cx.config,
    };
    match cx.strategy {
        Strategy::Blocking => compiler.compile(request),
        Strategy::Suspending => compiler.compile_async(request).await,
    }
    .map_err(TransformError::upstream)
}

fn select_compiler<'c>(cx: &'c Context<'_>, tag: &str) -> TransformResult<&'c Arc<dyn ScriptCompiler>> {
    if !TYPESCRIPT.is_match(tag) {
        return Ok(&cx.compilers.script);
    }
    tracing::debug!(file = cx.filename, lang = tag, "compiling script as TypeScript");
    cx.compilers.typescript.as_ref().ok_or_else(|| {
        TransformError::config(format!(
            "No TypeScript compiler is configured; cannot compile lang=\"{}\" in {}",
            tag, cx.filename
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typescript_family() {
        for lang in ["ts", "tsx", "typescript"] {
            assert!(TYPESCRIPT.is_match(lang), "{lang}");
        }
        for lang in ["js", "jsx", "coffee"] {
            assert!(!TYPESCRIPT.is_match(lang), "{lang}");
        }
    }
}
