//! The transform entry points.
//!
//! Both entry points run the same core. [`Strategy`] decides whether
//! compilers are called through their blocking or their suspending methods
//! and whether style blocks run one after another or concurrently.

use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::assemble::{Assembly, TransformOutput};
use crate::cache_key;
use crate::compilers::Compilers;
use crate::config::{JestVueOptions, PipelineConfig};
use crate::custom_blocks::process_custom_blocks;
use crate::error::{TransformError, TransformResult};
use crate::resolve::ModuleNameMapper;
use crate::router::{BlockPlan, ScriptRoute};
use crate::script::{process_script, process_script_setup};
use crate::style::process_styles;
use crate::template::process_template;
use crate::transformer::{
    Hooks, ProcessInput, ProcessOutput, Transformer, TransformerCatalog, TransformerRegistry,
};

/// How compilers are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Call blocking compiler methods; never suspend.
    Blocking,
    /// Await the `*_async` compiler methods; run style blocks concurrently.
    Suspending,
}

impl Strategy {
    /// Run a transformer's process hook.
    ///
    /// When the preferred flavor is not implemented the other one is used.
    pub(crate) async fn process(
        self,
        transformer: &dyn Transformer,
        input: ProcessInput<'_>,
    ) -> TransformResult<ProcessOutput> {
        let hooks = transformer.hooks();
        let suspend = match self {
            Strategy::Blocking => !hooks.contains(Hooks::PROCESS),
            Strategy::Suspending => hooks.contains(Hooks::PROCESS_ASYNC),
        };
        let output = if suspend {
            transformer.process_async(input).await
        } else {
            transformer.process(input)
        };
        output.map_err(TransformError::upstream)
    }
}

/// Everything the processors share during one transform call.
pub(crate) struct Context<'a> {
    pub filename: &'a str,
    pub config: &'a PipelineConfig,
    pub options: JestVueOptions,
    pub registry: TransformerRegistry,
    pub mapper: Arc<ModuleNameMapper>,
    /// Working directory global resources are resolved against.
    pub cwd: PathBuf,
    pub compilers: &'a Compilers,
    pub strategy: Strategy,
}

/// Transforms Vue single-file components for a test runner.
///
/// # Example
///
/// ```no_run
/// use sfc_transform::{Compilers, PipelineConfig, SfcTransformer};
///
/// let transformer = SfcTransformer::new(Compilers::builtin());
/// let config = PipelineConfig::default();
/// let output = transformer
///     .process("<script>export default {}</script>", "/app/Comp.vue", &config)
///     .unwrap();
/// println!("{}", output.code);
/// ```
#[derive(Clone)]
pub struct SfcTransformer {
    compilers: Compilers,
    catalog: Arc<dyn TransformerCatalog>,
    inline: Vec<(String, Arc<dyn Transformer>)>,
}

impl SfcTransformer {
    /// Create a transformer using `compilers`.
    pub fn new(compilers: Compilers) -> Self {
        Self {
            compilers,
            catalog: Arc::new(FxHashMap::<String, Arc<dyn Transformer>>::default()),
            inline: Vec::new(),
        }
    }

    /// Set the catalog that transformer names in configuration resolve against.
    pub fn with_catalog(mut self, catalog: Arc<dyn TransformerCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// Register a transformer for languages matching `pattern`.
    ///
    /// Transformers named in configuration take priority.
    pub fn with_transformer(mut self, pattern: impl Into<String>, transformer: Arc<dyn Transformer>) -> Self {
        self.inline.push((pattern.into(), transformer));
        self
    }

    /// The compilers in use.
    pub fn compilers(&self) -> &Compilers {
        &self.compilers
    }

    /// Transform one component, blocking until done.
    pub fn process(
        &self,
        source: &str,
        filename: &str,
        config: &PipelineConfig,
    ) -> TransformResult<TransformOutput> {
        futures::executor::block_on(self.run(source, filename, config, Strategy::Blocking))
    }

    /// Transform one component.
    pub async fn process_async(
        &self,
        source: &str,
        filename: &str,
        config: &PipelineConfig,
    ) -> TransformResult<TransformOutput> {
        self.run(source, filename, config, Strategy::Suspending).await
    }

    /// The cache key for one component under `config`.
    pub fn get_cache_key(&self, file_data: &str, filename: &str, config: &PipelineConfig) -> String {
        cache_key::cache_key(file_data, filename, config)
    }

    async fn run(
        &self,
        source: &str,
        filename: &str,
        config: &PipelineConfig,
        strategy: Strategy,
    ) -> TransformResult<TransformOutput> {
        let options = config.vue_jest()?;
        let registry = TransformerRegistry::from_config(&options, self.catalog.as_ref(), &self.inline)?;
        let cx = Context {
            filename,
            config,
            registry,
            mapper: Arc::new(ModuleNameMapper::from_config(&config.config)?),
            cwd: std::env::current_dir()?,
            compilers: &self.compilers,
            strategy,
            options,
        };

        let descriptor = sfc_parser::parse(source, filename);
        let plan = BlockPlan::new(&descriptor);

        let (script, bindings) = match (plan.script, &descriptor.script) {
            (ScriptRoute::Setup, _) => {
                let (fragment, bindings) = process_script_setup(&cx, &descriptor).await?;
                (Some(fragment), bindings)
            }
            (ScriptRoute::Plain, Some(block)) => (Some(process_script(&cx, block).await?), None),
            _ => (None, None),
        };

        let template = match plan.template {
            Some(template) => Some(process_template(&cx, template, bindings.as_ref()).await?),
            None => None,
        };
        let styles = process_styles(&cx, &plan.module_styles).await?;
        let custom_blocks = process_custom_blocks(&cx, plan.custom_blocks).await?;

        Assembly {
            filename,
            esm: config.supports_static_esm,
            is_functional: plan.is_functional,
            script,
            template,
            styles,
            custom_blocks,
        }
        .assemble()
    }
}

impl Default for SfcTransformer {
    fn default() -> Self {
        Self::new(Compilers::default())
    }
}

impl std::fmt::Debug for SfcTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SfcTransformer")
            .field("compilers", &self.compilers)
            .field(
                "inline",
                &self.inline.iter().map(|(pattern, _)| pattern).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
