//! Template processing.

use serde_json::{json, Map, Value};
use sfc_parser::TemplateBlock;

use crate::assemble::Fragment;
use crate::compilers::TemplateRequest;
use crate::error::{TransformError, TransformResult};
use crate::pipeline::{Context, Strategy};
use crate::resolve::load_src;
use crate::util::{deep_merge, strip_inline_source_map};

/// Key of `templateCompiler` that is merged into the compiler options.
const COMPILER_OPTIONS: &str = "compilerOptions";

/// Compile the template into render function code.
///
/// `bindings` are passed on only when the component has `<script setup>`.
/// Any diagnostic fails the whole transform.
pub(crate) async fn process_template(
    cx: &Context<'_>,
    template: &TemplateBlock,
    bindings: Option<&Map<String, Value>>,
) -> TransformResult<Fragment> {
    let content = match &template.src {
        Some(src) => load_src(src, cx.filename)?,
        None => template.content.clone(),
    };
    let compiler = cx.compilers.template.as_ref().ok_or_else(|| {
        TransformError::config(format!(
            "No template compiler is configured; cannot compile the template of {}",
            cx.filename
        ))
    })?;

    let mut overrides = cx.options.template_compiler.clone();
    let mut compiler_options = json!({ "optimize": false });
    if let Some(user) = overrides.remove(COMPILER_OPTIONS) {
        deep_merge(&mut compiler_options, &user);
    }

    let lang = template.lang.as_deref();
    let request = TemplateRequest {
        source: &content,
        filename: cx.filename,
        is_functional: template.functional,
        preprocess_lang: lang,
        preprocess_options: lang.and_then(|lang| cx.options.preprocess_options(lang)),
        compiler_options,
        bindings,
        overrides,
    };
    let output = match cx.strategy {
        Strategy::Blocking => compiler.compile(&request),
        Strategy::Suspending => compiler.compile_async(&request).await,
    }
    .map_err(TransformError::upstream)?;

    TransformError::check_diagnostics(&output.errors)?;

    Ok(Fragment {
        code: strip_inline_source_map(&output.code).to_string(),
        map: output.map,
        external_src: None,
    })
}
