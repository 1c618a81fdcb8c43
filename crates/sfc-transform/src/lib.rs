//! Vue single-file component transform for JavaScript test runners.
//!
//! A component file is split into blocks, each block is handed to its
//! compiler, and the results are stitched into one module whose default
//! export is the component options object. The source maps of every stage
//! are composed so the final map points back into the component file.
//!
//! Compilers are reached through the traits in [`compilers`]. The crate
//! ships a module-interop script compiler and a plain CSS compiler, and
//! [`CommandBridge`] forwards requests to an external process for
//! everything else.

pub mod assemble;
pub mod bridge;
pub mod cache_key;
pub mod class_map;
pub mod compilers;
pub mod config;
pub mod css;
mod custom_blocks;
pub mod error;
pub mod interop;
pub mod merge;
pub mod pipeline;
pub mod resolve;
pub mod router;
mod script;
pub mod style;
mod template;
pub mod transformer;
pub mod util;

pub use assemble::{Assembly, Fragment, TransformOutput, NAMESPACE_ALIAS};
pub use bridge::CommandBridge;
pub use compilers::{
    CompiledScript, Compilers, ScriptCompiler, ScriptRequest, ScriptSetupCompiler,
    ScriptSetupOptions, ScriptSetupOutput, StyleCompiler, StyleOutput, StyleRequest,
    TemplateCompiler, TemplateOutput, TemplateRequest,
};
pub use config::{HostConfig, JestVueOptions, PipelineConfig, NAMESPACE, SWC_NAMESPACE};
pub use error::{BoxError, CompileResult, TransformError, TransformResult};
pub use merge::merge_maps;
pub use pipeline::{SfcTransformer, Strategy};
pub use transformer::{
    Hooks, ProcessInput, ProcessOutput, Transformer, TransformerCatalog, TransformerRegistry,
};

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use source_map::{parse_map, LineCol, SourceMapExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const RENDER: &str = "var render = function () {\n  var _vm = this\n  var _h = _vm.$createElement\n  var _c = _vm._self._c || _h\n  return _c('div')\n}\nvar staticRenderFns = []\n";

    #[derive(Default)]
    struct FakeTemplate {
        errors: Vec<String>,
        requests: Mutex<Vec<Value>>,
    }

    impl TemplateCompiler for FakeTemplate {
        fn compile(&self, request: &TemplateRequest<'_>) -> CompileResult<TemplateOutput> {
            self.requests.lock().unwrap().push(serde_json::to_value(request)?);
            Ok(TemplateOutput {
                code: RENDER.to_string(),
                map: None,
                errors: self.errors.clone(),
            })
        }
    }

    struct FakeSetup;

    impl ScriptSetupCompiler for FakeSetup {
        fn compile(
            &self,
            descriptor: &sfc_parser::ComponentDescriptor,
            options: &ScriptSetupOptions,
        ) -> CompileResult<ScriptSetupOutput> {
            assert!(options.reactivity_transform);
            assert_eq!(options.id, descriptor.filename);
            Ok(ScriptSetupOutput {
                content: "export default {\n  setup() { return { msg } }\n}\n".to_string(),
                map: None,
                bindings: json!({ "msg": "setup-const" }).as_object().cloned(),
            })
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl ScriptCompiler for Counting {
        fn compile(&self, request: ScriptRequest<'_>) -> CompileResult<CompiledScript> {
            self.0.fetch_add(1, Ordering::SeqCst);
            interop::ModuleInteropCompiler.compile(request)
        }
    }

    struct I18n;

    impl Transformer for I18n {
        fn hooks(&self) -> Hooks {
            Hooks::PROCESS_ASYNC
        }

        fn process_async<'a>(
            &'a self,
            input: ProcessInput<'a>,
        ) -> BoxFuture<'a, CompileResult<ProcessOutput>> {
            Box::pin(async move {
                match input {
                    ProcessInput::CustomBlocks { blocks, namespace, .. } => Ok(ProcessOutput::Text(
                        format!("{}.__i18n = {}", namespace, blocks.len()),
                    )),
                    _ => Err("unexpected input".into()),
                }
            })
        }
    }

    struct Postprocess;

    impl Transformer for Postprocess {
        fn hooks(&self) -> Hooks {
            Hooks::POSTPROCESS
        }

        fn postprocess(
            &self,
            _content: &str,
            _filename: &str,
            _config: &PipelineConfig,
            _attrs: &[sfc_parser::BlockAttr],
        ) -> CompileResult<String> {
            Ok("{\"post\":true}".to_string())
        }
    }

    struct FailingPreprocess;

    impl Transformer for FailingPreprocess {
        fn hooks(&self) -> Hooks {
            Hooks::PREPROCESS
        }

        fn preprocess(
            &self,
            _content: &str,
            _filename: &str,
            _config: &PipelineConfig,
            _attrs: &[sfc_parser::BlockAttr],
        ) -> CompileResult<String> {
            Err("broken preprocessor".into())
        }
    }

    /// Finishes blocks in reverse order: the first block sleeps longest.
    #[derive(Default)]
    struct SlowFirst(AtomicUsize);

    impl StyleCompiler for SlowFirst {
        fn compile(&self, request: &StyleRequest<'_>) -> CompileResult<StyleOutput> {
            css::LightningCssCompiler.compile(request)
        }

        fn compile_async<'a>(
            &'a self,
            request: &'a StyleRequest<'a>,
        ) -> BoxFuture<'a, CompileResult<StyleOutput>> {
            let delay = match self.0.fetch_add(1, Ordering::SeqCst) {
                0 => 60,
                _ => 5,
            };
            Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
                self.compile(request)
            })
        }
    }

    fn transformer(template: Arc<FakeTemplate>) -> SfcTransformer {
        SfcTransformer::new(
            Compilers::builtin()
                .with_template(template)
                .with_script_setup(Arc::new(FakeSetup)),
        )
    }

    fn config_with(options: Value) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.config.globals.insert(NAMESPACE.to_string(), options);
        config
    }

    #[test]
    fn test_commonjs_component_with_template() {
        let source = "<template><div id=\"app\">{{msg}}</div></template>\n<script>export default { data(){return {msg:'hi'}} }</script>\n";
        let output = transformer(Arc::default())
            .process(source, "/app/App.vue", &PipelineConfig::default())
            .unwrap();

        assert!(output
            .code
            .contains("exports.default = { data(){return {msg:'hi'}} }"));
        assert!(output.code.contains("__options__.render = render\n"));
        assert!(output.code.contains("__options__.staticRenderFns = staticRenderFns\n"));
        assert!(output.code.contains("/* istanbul ignore next */\nvar _c = _vm._self._c || _h"));
        assert!(!output.code.contains("functional"));
        assert!(!output.code.contains("_compiled"));
    }

    #[test]
    fn test_functional_component() {
        let by_script = "<template><div /></template><script>export default { functional:   true }</script>";
        let by_template = "<template functional=\"true\"><div /></template>";
        for source in [by_script, by_template] {
            let output = transformer(Arc::default())
                .process(source, "/app/Fn.vue", &PipelineConfig::default())
                .unwrap();
            assert!(output.code.contains("__options__.functional = true\n__options__._compiled = true\n"));
        }
    }

    #[test]
    fn test_css_module_class_map() {
        let source = "<style module>.foo { color: red; }</style>";
        let output = transformer(Arc::default())
            .process(source, "/app/Styled.vue", &PipelineConfig::default())
            .unwrap();
        assert!(output
            .code
            .contains("this['$style'] = Object.assign(\nthis['$style'], {\"foo\":\"foo\"});\n"));
    }

    #[test]
    fn test_css_compile_disabled() {
        let source = "<style module>.foo { color: red; }</style>";
        let config = config_with(json!({ "experimentalCSSCompile": false }));
        let output = transformer(Arc::default())
            .process(source, "/app/Styled.vue", &config)
            .unwrap();
        assert!(output.code.contains("this['$style'] = Object.assign(\nthis['$style'], {});\n"));
    }

    #[test]
    fn test_named_modules_do_not_clobber() {
        let source = "<style module=\"a\">.x { color: red }</style>\n<style module=\"b\">.y { color: blue }</style>\n<style>.plain { color: green }</style>";
        let output = transformer(Arc::default())
            .process(source, "/app/Two.vue", &PipelineConfig::default())
            .unwrap();
        assert!(output.code.contains("this['a'] = Object.assign(\nthis['a'], {\"x\":\"x\"});"));
        assert!(output.code.contains("this['b'] = Object.assign(\nthis['b'], {\"y\":\"y\"});"));
        assert!(!output.code.contains("plain"));
        assert!(output.code.starts_with("Object.defineProperty(exports, \"__esModule\""));
    }

    #[test]
    fn test_missing_src_fails_before_compiling() {
        let counting = Arc::new(Counting::default());
        let transformer =
            SfcTransformer::new(Compilers::builtin().with_typescript(counting.clone()));
        let source = "<script lang=\"ts\" src=\"./external.ts\"></script>";

        let err = transformer
            .process(source, "/nowhere/Comp.vue", &PipelineConfig::default())
            .unwrap_err();
        match &err {
            TransformError::Load { src, file, .. } => {
                assert_eq!(src, "./external.ts");
                assert_eq!(file, "/nowhere/Comp.vue");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().starts_with("\n[vue-jest] Error: "));
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_external_script_map_points_at_loaded_file() {
        let dir = tempfile::tempdir().unwrap();
        let external = dir.path().join("external.js");
        std::fs::write(&external, "export default { name: 'ext' }\n").unwrap();
        let filename = dir.path().join("Comp.vue");

        let output = SfcTransformer::default()
            .process(
                "<script src=\"./external.js\"></script>",
                filename.to_str().unwrap(),
                &PipelineConfig::default(),
            )
            .unwrap();
        assert!(output.code.contains("exports.default = { name: 'ext' }"));
        let map = parse_map(&output.map).unwrap();
        assert_eq!(
            map.sources().collect::<Vec<_>>(),
            vec![external.to_string_lossy().as_ref()]
        );
    }

    #[test]
    fn test_typescript_requires_compiler() {
        let err = SfcTransformer::default()
            .process(
                "<script lang=\"ts\">export default {}</script>",
                "/app/Ts.vue",
                &PipelineConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::Configuration(_)));
    }

    #[test]
    fn test_typescript_compiler_is_used_for_ts() {
        let counting = Arc::new(Counting::default());
        let transformer =
            SfcTransformer::new(Compilers::builtin().with_typescript(counting.clone()));
        transformer
            .process(
                "<script lang=\"tsx\">export default {}</script>",
                "/app/Ts.vue",
                &PipelineConfig::default(),
            )
            .unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_template_diagnostics_fail() {
        let template = Arc::new(FakeTemplate {
            errors: vec!["tag <div> has no matching end tag.".to_string()],
            ..Default::default()
        });
        let err = transformer(template)
            .process("<template><div></template>", "/app/Bad.vue", &PipelineConfig::default())
            .unwrap_err();
        match err {
            TransformError::Compilation { diagnostics, .. } => assert_eq!(diagnostics.len(), 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_template_request_options() {
        let template = Arc::new(FakeTemplate::default());
        let config = config_with(json!({
            "templateCompiler": {
                "compilerOptions": { "whitespace": "condense" },
                "transpileOptions": { "transforms": { "asyncAwait": false } }
            },
            "pug": { "doctype": "html" }
        }));
        transformer(template.clone())
            .process("<template lang=\"pug\">div</template>", "/app/Pug.vue", &config)
            .unwrap();

        let requests = template.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!(
            request["compilerOptions"],
            json!({ "optimize": false, "whitespace": "condense" })
        );
        assert_eq!(request["transpileOptions"], json!({ "transforms": { "asyncAwait": false } }));
        assert_eq!(request["preprocessLang"], json!("pug"));
        assert_eq!(request["preprocessOptions"], json!({ "doctype": "html" }));
        assert_eq!(request["bindings"], Value::Null);
        assert_eq!(request["isFunctional"], json!(false));
    }

    #[test]
    fn test_script_setup_bindings_reach_template() {
        let template = Arc::new(FakeTemplate::default());
        let source = "<template><div>{{ msg }}</div></template>\n<script setup>\nconst msg = 'hi'\n</script>\n";
        let output = transformer(template.clone())
            .process(source, "/app/Setup.vue", &PipelineConfig::default())
            .unwrap();

        assert!(output.code.contains("exports.default = {\n  setup() { return { msg } }\n}"));
        let requests = template.requests.lock().unwrap();
        assert_eq!(requests[0]["bindings"], json!({ "msg": "setup-const" }));
    }

    #[test]
    fn test_custom_blocks_with_async_only_transformer() {
        let source = "<script>export default {}</script>\n<i18n>{}</i18n>\n<docs>skipped</docs>\n<i18n>{}</i18n>";
        let output = SfcTransformer::default()
            .with_transformer("^i18n$", Arc::new(I18n))
            .process(source, "/app/I18n.vue", &PipelineConfig::default())
            .unwrap();
        assert!(output.code.ends_with(";\n __options__.__i18n = 2"));
        assert!(!output.code.contains("skipped"));
    }

    #[test]
    fn test_postprocess_replaces_class_map() {
        let source = "<style module>.foo { color: red; }</style>";
        let output = SfcTransformer::default()
            .with_transformer("^css$", Arc::new(Postprocess))
            .process(source, "/app/Post.vue", &PipelineConfig::default())
            .unwrap();
        assert!(output.code.contains("this['$style'], {\"post\":true});"));
    }

    #[test]
    fn test_failing_preprocess_keeps_content() {
        let source = "<style module>.foo { color: red; }</style>";
        let output = SfcTransformer::default()
            .with_transformer("^css$", Arc::new(FailingPreprocess))
            .process(source, "/app/Pre.vue", &PipelineConfig::default())
            .unwrap();
        assert!(output.code.contains("this['$style'], {\"foo\":\"foo\"});"));
    }

    #[test]
    fn test_unknown_configured_transformer() {
        let config = config_with(json!({ "transform": { "^i18n$": "missing-loader" } }));
        let err = SfcTransformer::default()
            .process("<i18n>{}</i18n>", "/app/X.vue", &config)
            .unwrap_err();
        assert!(matches!(err, TransformError::Configuration(_)));
    }

    #[test]
    fn test_style_without_preprocessor_fails() {
        let source = "<style module lang=\"scss\">$c: red; .a { color: $c; }</style>";
        let err = SfcTransformer::default()
            .process(source, "/app/Scss.vue", &PipelineConfig::default())
            .unwrap_err();
        assert!(matches!(err, TransformError::Compilation { .. }));
    }

    #[test]
    fn test_final_map_points_into_component() {
        let source = "<template><div /></template>\n<script>\nexport default {\n  data() {}\n}\n</script>\n";
        let output = transformer(Arc::default())
            .process(source, "/app/Map.vue", &PipelineConfig::default())
            .unwrap();
        let map = parse_map(&output.map).unwrap();
        assert_eq!(map.get_file(), Some("/app/Map.vue"));
        assert_eq!(map.source_content("/app/Map.vue"), Some(source));

        // two interop header lines, then the blank first line of the block
        let pos = map.original_position_for(LineCol::new(3, 0)).unwrap();
        assert_eq!(pos.source, "/app/Map.vue");
        assert_eq!(pos.position, LineCol::new(2, 0));
        let pos = map.original_position_for(LineCol::new(4, 2)).unwrap();
        assert_eq!(pos.position, LineCol::new(3, 2));
    }

    #[test]
    fn test_esm_output() {
        let mut config = PipelineConfig::default();
        config.supports_static_esm = true;
        let output = SfcTransformer::default()
            .process("<script>export default {}</script>", "/app/Esm.vue", &config)
            .unwrap();
        assert_eq!(
            output.code,
            "const _sfc_main = {}\nexport { _sfc_main as default }\nconst __options__ = _sfc_main.options\n"
        );
    }

    #[test]
    fn test_cache_key_delegates() {
        let config = PipelineConfig::default();
        assert_eq!(
            SfcTransformer::default().get_cache_key("a", "/app/A.vue", &config),
            cache_key::cache_key("a", "/app/A.vue", &config)
        );
    }

    #[tokio::test]
    async fn test_concurrent_styles_keep_block_order() {
        let source = "<style module=\"a\">.x { color: red }</style>\n<style module=\"b\">.y { color: blue }</style>\n";
        let transformer = SfcTransformer::new(
            Compilers::builtin().with_style(Arc::new(SlowFirst::default())),
        );
        let output = transformer
            .process_async(source, "/app/Slow.vue", &PipelineConfig::default())
            .await
            .unwrap();

        let a = output
            .code
            .find("this['a'] = Object.assign(\nthis['a'], {\"x\":\"x\"});")
            .unwrap();
        let b = output
            .code
            .find("this['b'] = Object.assign(\nthis['b'], {\"y\":\"y\"});")
            .unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn test_suspending_matches_blocking() {
        let source = "<template><div /></template>\n<script>\nexport default { name: 'same' }\n</script>\n<style module=\"a\">.x { color: red }</style>\n<style module=\"b\">.y { color: blue }</style>\n<i18n>{}</i18n>\n";
        let transformer = transformer(Arc::default()).with_transformer("^i18n$", Arc::new(I18n));
        let config = PipelineConfig::default();

        let blocking = transformer.process(source, "/app/Same.vue", &config).unwrap();
        let suspending = transformer
            .process_async(source, "/app/Same.vue", &config)
            .await
            .unwrap();
        assert_eq!(blocking, suspending);
        let a = suspending.code.find("this['a']").unwrap();
        let b = suspending.code.find("this['b']").unwrap();
        assert!(a < b);
    }
}
