//! Seams to the external compilers the pipeline drives.
//!
//! Each compiler exposes a blocking method and a `*_async` counterpart. The
//! async default simply runs the blocking method, so an implementation only
//! needs to override it when it can actually suspend.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sfc_parser::ComponentDescriptor;
use source_map::SourceMap;
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::CompileResult;
use crate::resolve::ImportResolver;

/// Code produced by a script compiler, with the map back to its input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompiledScript {
    pub code: String,
    #[serde(default, with = "source_map::serde_map")]
    pub map: Option<SourceMap>,
}

/// Input for a script compiler.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptRequest<'a> {
    /// The script text.
    pub source: &'a str,
    /// The component file the script belongs to.
    pub filename: &'a str,
    /// The block's `lang` attribute.
    pub lang: Option<&'a str>,
    pub config: &'a PipelineConfig,
}

/// Turns ECMAScript or TypeScript into runnable module code.
pub trait ScriptCompiler: Send + Sync {
    /// Compile one script.
    fn compile(&self, request: ScriptRequest<'_>) -> CompileResult<CompiledScript>;

    /// Compile one script without blocking the caller.
    fn compile_async<'a>(
        &'a self,
        request: ScriptRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<CompiledScript>> {
        Box::pin(async move { self.compile(request) })
    }
}

/// Options for the script setup compiler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSetupOptions {
    /// Scope id, the component file path.
    pub id: String,
    pub reactivity_transform: bool,
    /// User `compilerOptions`, applied last.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of compiling `<script setup>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptSetupOutput {
    /// The generated script content.
    pub content: String,
    #[serde(default, with = "source_map::serde_map")]
    pub map: Option<SourceMap>,
    /// Template bindings discovered in the setup block.
    #[serde(default)]
    pub bindings: Option<Map<String, Value>>,
}

/// Resolves `<script setup>` (and any plain script next to it) into one script.
pub trait ScriptSetupCompiler: Send + Sync {
    /// Compile the setup block of a component.
    fn compile(
        &self,
        descriptor: &ComponentDescriptor,
        options: &ScriptSetupOptions,
    ) -> CompileResult<ScriptSetupOutput>;

    /// Compile the setup block without blocking the caller.
    fn compile_async<'a>(
        &'a self,
        descriptor: &'a ComponentDescriptor,
        options: &'a ScriptSetupOptions,
    ) -> BoxFuture<'a, CompileResult<ScriptSetupOutput>> {
        Box::pin(async move { self.compile(descriptor, options) })
    }
}

/// Input for the template compiler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRequest<'a> {
    pub source: &'a str,
    pub filename: &'a str,
    pub is_functional: bool,
    pub preprocess_lang: Option<&'a str>,
    pub preprocess_options: Option<&'a Value>,
    /// Always contains `optimize: false` unless overridden by the user.
    pub compiler_options: Value,
    /// Present only when the component has `<script setup>`.
    pub bindings: Option<&'a Map<String, Value>>,
    /// Remaining `templateCompiler` settings.
    #[serde(flatten)]
    pub overrides: Map<String, Value>,
}

/// Render function code produced from a template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateOutput {
    pub code: String,
    #[serde(default, with = "source_map::serde_map")]
    pub map: Option<SourceMap>,
    /// Diagnostics; any entry fails the transform.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Compiles templates to `render` / `staticRenderFns`.
pub trait TemplateCompiler: Send + Sync {
    /// Compile one template.
    fn compile(&self, request: &TemplateRequest<'_>) -> CompileResult<TemplateOutput>;

    /// Compile one template without blocking the caller.
    fn compile_async<'a>(
        &'a self,
        request: &'a TemplateRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<TemplateOutput>> {
        Box::pin(async move { self.compile(request) })
    }
}

/// Input for the style compiler.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRequest<'a> {
    pub source: &'a str,
    pub file_path: &'a str,
    pub preprocess_lang: Option<&'a str>,
    pub preprocess_options: Map<String, Value>,
    pub scoped: bool,
    /// Import resolution for Sass and SCSS, not serializable.
    #[serde(skip)]
    pub importer: Option<ImportResolver>,
}

/// CSS produced by the style compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleOutput {
    pub code: String,
    /// Diagnostics; any entry fails the transform.
    #[serde(default)]
    pub errors: Vec<String>,
}

/// Preprocesses and compiles style blocks to plain CSS.
pub trait StyleCompiler: Send + Sync {
    /// Compile one style block.
    fn compile(&self, request: &StyleRequest<'_>) -> CompileResult<StyleOutput>;

    /// Compile one style block without blocking the caller.
    fn compile_async<'a>(
        &'a self,
        request: &'a StyleRequest<'a>,
    ) -> BoxFuture<'a, CompileResult<StyleOutput>> {
        Box::pin(async move { self.compile(request) })
    }
}

/// The compilers available to one pipeline.
#[derive(Clone)]
pub struct Compilers {
    /// Default ECMAScript compiler.
    pub script: Arc<dyn ScriptCompiler>,
    /// Compiler for `ts`/`tsx` blocks; without one such blocks are rejected.
    pub typescript: Option<Arc<dyn ScriptCompiler>>,
    pub script_setup: Option<Arc<dyn ScriptSetupCompiler>>,
    pub template: Option<Arc<dyn TemplateCompiler>>,
    pub style: Arc<dyn StyleCompiler>,
}

impl Compilers {
    /// The built-in compilers: module interop for scripts and lightningcss
    /// for plain CSS. Template and script setup compilers must be supplied.
    pub fn builtin() -> Self {
        Self {
            script: Arc::new(crate::interop::ModuleInteropCompiler),
            typescript: None,
            script_setup: None,
            template: None,
            style: Arc::new(crate::css::LightningCssCompiler),
        }
    }

    /// Set the TypeScript compiler.
    pub fn with_typescript(mut self, compiler: Arc<dyn ScriptCompiler>) -> Self {
        self.typescript = Some(compiler);
        self
    }

    /// Set the script setup compiler.
    pub fn with_script_setup(mut self, compiler: Arc<dyn ScriptSetupCompiler>) -> Self {
        self.script_setup = Some(compiler);
        self
    }

    /// Set the template compiler.
    pub fn with_template(mut self, compiler: Arc<dyn TemplateCompiler>) -> Self {
        self.template = Some(compiler);
        self
    }

    /// Replace the style compiler.
    pub fn with_style(mut self, compiler: Arc<dyn StyleCompiler>) -> Self {
        self.style = compiler;
        self
    }

    /// Replace the default script compiler.
    pub fn with_script(mut self, compiler: Arc<dyn ScriptCompiler>) -> Self {
        self.script = compiler;
        self
    }
}

impl Default for Compilers {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Compilers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compilers")
            .field("typescript", &self.typescript.is_some())
            .field("script_setup", &self.script_setup.is_some())
            .field("template", &self.template.is_some())
            .finish_non_exhaustive()
    }
}
