//! CSS module processing.

use serde_json::{json, Map, Value};
use sfc_parser::StyleBlock;
use std::path::Path;

use crate::class_map::class_map_json;
use crate::compilers::StyleRequest;
use crate::error::{TransformError, TransformResult};
use crate::pipeline::{Context, Strategy};
use crate::resolve::{global_resources, ImportResolver};
use crate::transformer::{Hooks, ProcessInput};

/// Language assumed for styles without a `lang` attribute.
const DEFAULT_LANG: &str = "css";

/// The processed form of one CSS module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleResult {
    /// Instance property the class map is exposed under.
    pub module_name: String,
    /// A JavaScript expression, normally a JSON object literal.
    pub code: String,
}

/// Process every module style, preserving source order.
///
/// The blocking strategy handles one block at a time; the suspending one
/// runs them concurrently.
pub(crate) async fn process_styles(
    cx: &Context<'_>,
    styles: &[&StyleBlock],
) -> TransformResult<Vec<StyleResult>> {
    match cx.strategy {
        Strategy::Blocking => {
            let mut results = Vec::with_capacity(styles.len());
            for style in styles {
                results.push(module_result(cx, style).await?);
            }
            Ok(results)
        }
        Strategy::Suspending => {
            futures::future::try_join_all(styles.iter().map(|style| module_result(cx, style))).await
        }
    }
}

async fn module_result(cx: &Context<'_>, style: &StyleBlock) -> TransformResult<StyleResult> {
    let code = process_style(cx, style).await?;
    Ok(StyleResult {
        module_name: style.module.clone().unwrap_or_else(|| "$style".to_string()),
        code,
    })
}

/// Turn one style block into the code of its class map.
pub(crate) async fn process_style(cx: &Context<'_>, style: &StyleBlock) -> TransformResult<String> {
    let lang = style.lang.as_deref();
    let mut file_path = cx.filename.to_string();
    let mut content = style.content.clone();

    if let Some(src) = style.src.as_deref().filter(|_| content.trim().is_empty()) {
        let path = cx.mapper.resolve(src, cx.filename, lang);
        tracing::debug!(src, path = %path.display(), "loading style src");
        content = std::fs::read_to_string(&path).map_err(|source| TransformError::Load {
            src: src.to_string(),
            file: cx.filename.to_string(),
            source,
        })?;
        file_path = path.to_string_lossy().into_owned();
    }

    if !cx.options.css_compile_enabled() || content.is_empty() {
        return Ok("{}".to_string());
    }

    if let Some(lang) = lang {
        content.insert_str(0, &global_resources(&cx.options.resources, lang, &cx.cwd));
    }

    let transformer = cx.registry.find(lang.unwrap_or(DEFAULT_LANG)).cloned();
    let hooks = transformer.as_ref().map_or(Hooks::empty(), |t| t.hooks());

    if let Some(transformer) = transformer.as_ref().filter(|_| hooks.contains(Hooks::PREPROCESS)) {
        match transformer.preprocess(&content, &file_path, cx.config, &style.attrs) {
            Ok(preprocessed) => content = preprocessed,
            Err(e) => tracing::warn!("There was an error while compiling {} {}", file_path, e),
        }
    }

    let css = match transformer.as_ref().filter(|_| hooks.can_process()) {
        Some(transformer) => {
            let input = ProcessInput::Style {
                source: &content,
                filename: &file_path,
                config: cx.config,
                attrs: &style.attrs,
            };
            cx.strategy
                .process(transformer.as_ref(), input)
                .await?
                .into_code()
        }
        None => compile_style(cx, &content, &file_path, lang).await?,
    };

    match transformer.filter(|_| hooks.contains(Hooks::POSTPROCESS)) {
        Some(transformer) => transformer
            .postprocess(&css, &file_path, cx.config, &style.attrs)
            .map_err(TransformError::upstream),
        None => class_map_json(&css),
    }
}

async fn compile_style(
    cx: &Context<'_>,
    content: &str,
    file_path: &str,
    lang: Option<&str>,
) -> TransformResult<String> {
    let mut preprocess_options = preprocess_options(lang, file_path, &cx.cwd);
    for (key, value) in &cx.options.style_options {
        preprocess_options.insert(key.clone(), value.clone());
    }
    let importer = matches!(lang, Some("scss" | "sass"))
        .then(|| ImportResolver::new(cx.mapper.clone(), file_path, lang));

    let request = StyleRequest {
        source: content,
        file_path,
        preprocess_lang: lang,
        preprocess_options,
        scoped: false,
        importer,
    };
    let output = match cx.strategy {
        Strategy::Blocking => cx.compilers.style.compile(&request),
        Strategy::Suspending => cx.compilers.style.compile_async(&request).await,
    }
    .map_err(TransformError::upstream)?;

    TransformError::check_diagnostics(&output.errors)?;
    Ok(output.code)
}

/// Language-specific options handed to the style preprocessor.
fn preprocess_options(lang: Option<&str>, file_path: &str, cwd: &Path) -> Map<String, Value> {
    let options = match lang {
        Some("scss" | "sass") => json!({ "filename": file_path }),
        Some("styl" | "stylus" | "less") => {
            let dir = Path::new(file_path).parent().unwrap_or_else(|| Path::new(""));
            json!({ "paths": [dir.to_string_lossy(), cwd.to_string_lossy()] })
        }
        _ => json!({}),
    };
    match options {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
