//! User-registered transformers and their lookup table.

use bitflags::bitflags;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use regex::Regex;
use rustc_hash::FxHashMap;
use sfc_parser::{BlockAttr, CustomBlock};
use std::sync::Arc;

use crate::compilers::CompiledScript;
use crate::config::{JestVueOptions, PipelineConfig};
use crate::error::{CompileResult, TransformError, TransformResult};

bitflags! {
    /// The hooks a transformer implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Hooks: u8 {
        const PREPROCESS = 1;
        const PROCESS = 1 << 1;
        const PROCESS_ASYNC = 1 << 2;
        const POSTPROCESS = 1 << 3;
        const CREATE_TRANSFORMER = 1 << 4;
    }
}

impl Hooks {
    /// Whether either process hook is present.
    pub fn can_process(self) -> bool {
        self.intersects(Hooks::PROCESS | Hooks::PROCESS_ASYNC)
    }
}

/// What a transformer is asked to process.
#[derive(Debug, Clone, Copy)]
pub enum ProcessInput<'a> {
    /// A script or script setup block.
    Script {
        source: &'a str,
        filename: &'a str,
        config: &'a PipelineConfig,
    },
    /// A style block, after resources and preprocessing.
    Style {
        source: &'a str,
        filename: &'a str,
        config: &'a PipelineConfig,
        attrs: &'a [BlockAttr],
    },
    /// Every custom block of one type.
    CustomBlocks {
        blocks: &'a [&'a CustomBlock],
        /// Runtime name of the component options object.
        namespace: &'a str,
        filename: &'a str,
        config: &'a PipelineConfig,
    },
}

/// What a transformer's process hook returns.
#[derive(Debug, Clone)]
pub enum ProcessOutput {
    /// Script code with an optional map.
    Script(CompiledScript),
    /// Plain text (style code or custom block code).
    Text(String),
}

impl ProcessOutput {
    /// The produced code, dropping any map.
    pub fn into_code(self) -> String {
        match self {
            ProcessOutput::Script(script) => script.code,
            ProcessOutput::Text(text) => text,
        }
    }

    /// The produced code as a script result.
    pub fn into_script(self) -> CompiledScript {
        match self {
            ProcessOutput::Script(script) => script,
            ProcessOutput::Text(code) => CompiledScript { code, map: None },
        }
    }
}

/// A custom per-language transformer.
///
/// Implementations advertise the hooks they provide through [`Transformer::hooks`];
/// the pipeline only calls advertised hooks.
pub trait Transformer: Send + Sync {
    /// The hooks this transformer implements.
    fn hooks(&self) -> Hooks;

    /// Rewrite style content before compilation.
    fn preprocess(
        &self,
        content: &str,
        _filename: &str,
        _config: &PipelineConfig,
        _attrs: &[BlockAttr],
    ) -> CompileResult<String> {
        Ok(content.to_string())
    }

    /// Process a block.
    fn process(&self, _input: ProcessInput<'_>) -> CompileResult<ProcessOutput> {
        Err("transformer does not implement process()".into())
    }

    /// Process a block without blocking the caller.
    fn process_async<'a>(
        &'a self,
        input: ProcessInput<'a>,
    ) -> BoxFuture<'a, CompileResult<ProcessOutput>> {
        Box::pin(async move { self.process(input) })
    }

    /// Produce the final style result, skipping class map extraction.
    fn postprocess(
        &self,
        content: &str,
        _filename: &str,
        _config: &PipelineConfig,
        _attrs: &[BlockAttr],
    ) -> CompileResult<String> {
        Ok(content.to_string())
    }

    /// Build the transformer that is actually used.
    fn create_transformer(&self) -> CompileResult<Arc<dyn Transformer>> {
        Err("transformer does not implement createTransformer()".into())
    }
}

/// Named transformers a configuration can refer to.
pub trait TransformerCatalog: Send + Sync {
    /// Look up a transformer by the name used in configuration.
    fn get(&self, name: &str) -> Option<Arc<dyn Transformer>>;
}

impl TransformerCatalog for FxHashMap<String, Arc<dyn Transformer>> {
    fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        FxHashMap::get(self, name).cloned()
    }
}

impl TransformerCatalog for IndexMap<String, Arc<dyn Transformer>> {
    fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        IndexMap::get(self, name).cloned()
    }
}

/// Ordered table of (language pattern, transformer); the first match wins.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    entries: Vec<(Regex, Arc<dyn Transformer>)>,
}

impl TransformerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for one configuration.
    ///
    /// Entries named in `options.transform` come first, in configuration
    /// order, followed by `inline` entries.
    pub fn from_config(
        options: &JestVueOptions,
        catalog: &dyn TransformerCatalog,
        inline: &[(String, Arc<dyn Transformer>)],
    ) -> TransformResult<Self> {
        let mut registry = Self::new();
        for (pattern, name) in &options.transform {
            let transformer = catalog.get(name).ok_or_else(|| {
                TransformError::config(format!(
                    "Could not find transformer \"{}\" registered for \"{}\"",
                    name, pattern
                ))
            })?;
            registry.register(pattern, transformer)?;
        }
        for (pattern, transformer) in inline {
            registry.register(pattern, Arc::clone(transformer))?;
        }
        Ok(registry)
    }

    /// Add a transformer after the existing entries.
    ///
    /// A transformer with `createTransformer` is replaced by the one it
    /// creates.
    pub fn register(&mut self, pattern: &str, transformer: Arc<dyn Transformer>) -> TransformResult<()> {
        let regex = Regex::new(pattern).map_err(|e| {
            TransformError::config(format!("invalid transform pattern \"{}\": {}", pattern, e))
        })?;
        let hooks = transformer.hooks();
        if hooks.is_empty() {
            return Err(TransformError::config(
                "transformer must contain at least one createTransformer(), process(), preprocess(), or postprocess() method",
            ));
        }
        let transformer = if hooks.contains(Hooks::CREATE_TRANSFORMER) {
            transformer
                .create_transformer()
                .map_err(TransformError::upstream)?
        } else {
            transformer
        };
        self.entries.push((regex, transformer));
        Ok(())
    }

    /// Find the transformer for a language tag.
    pub fn find(&self, lang: &str) -> Option<&Arc<dyn Transformer>> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.is_match(lang))
            .map(|(_, transformer)| transformer)
    }

    /// Number of registered transformers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no transformer is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(pattern, _)| pattern.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, Hooks);

    impl Transformer for Named {
        fn hooks(&self) -> Hooks {
            self.1
        }

        fn process(&self, _input: ProcessInput<'_>) -> CompileResult<ProcessOutput> {
            Ok(ProcessOutput::Text(self.0.to_string()))
        }

        fn create_transformer(&self) -> CompileResult<Arc<dyn Transformer>> {
            Ok(Arc::new(Named("created", Hooks::PROCESS)))
        }
    }

    fn run(transformer: &Arc<dyn Transformer>) -> String {
        let config = PipelineConfig::default();
        let input = ProcessInput::Script {
            source: "",
            filename: "A.vue",
            config: &config,
        };
        transformer.process(input).unwrap().into_code()
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry = TransformerRegistry::new();
        registry.register("^scss$", Arc::new(Named("first", Hooks::PROCESS))).unwrap();
        registry.register("css$", Arc::new(Named("second", Hooks::PROCESS))).unwrap();

        assert_eq!(run(registry.find("scss").unwrap()), "first");
        assert_eq!(run(registry.find("postcss").unwrap()), "second");
        assert!(registry.find("less").is_none());
    }

    #[test]
    fn test_transformer_without_hooks_is_rejected() {
        let mut registry = TransformerRegistry::new();
        let err = registry
            .register("^js$", Arc::new(Named("none", Hooks::empty())))
            .unwrap_err();
        assert!(matches!(err, TransformError::Configuration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_create_transformer_is_applied_once() {
        let mut registry = TransformerRegistry::new();
        registry
            .register("^i18n$", Arc::new(Named("factory", Hooks::CREATE_TRANSFORMER)))
            .unwrap();
        assert_eq!(run(registry.find("i18n").unwrap()), "created");
    }

    #[test]
    fn test_from_config_resolves_names() {
        let mut catalog: FxHashMap<String, Arc<dyn Transformer>> = FxHashMap::default();
        catalog.insert("loader".into(), Arc::new(Named("loader", Hooks::PROCESS)));

        let mut options = JestVueOptions::default();
        options.transform.insert("^docs$".into(), "loader".into());
        let inline: Vec<(String, Arc<dyn Transformer>)> =
            vec![("^docs$".into(), Arc::new(Named("inline", Hooks::PROCESS)))];

        let registry = TransformerRegistry::from_config(&options, &catalog, &inline).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(run(registry.find("docs").unwrap()), "loader");

        options.transform.insert("^x$".into(), "missing".into());
        let err = TransformerRegistry::from_config(&options, &catalog, &[]).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
