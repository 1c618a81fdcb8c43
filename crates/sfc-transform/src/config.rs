//! Host transform configuration.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::{TransformError, TransformResult};

/// Key under `globals` that holds this transformer's options.
pub const NAMESPACE: &str = "vue-jest";

/// Also accepted under `globals`, read when [`NAMESPACE`] is absent.
pub const SWC_NAMESPACE: &str = "vue2-swc-jest";

/// Options handed over by the host test runner for one transform call.
///
/// Only a small subset is interpreted; everything else is carried through to
/// compilers untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Emit ES module syntax instead of CommonJS.
    #[serde(rename = "supportsStaticESM")]
    pub supports_static_esm: bool,
    /// Whether the host instruments code for coverage.
    pub instrument: bool,
    /// The host's serialized project configuration.
    pub config_string: String,
    /// The host's project configuration.
    pub config: HostConfig,
}

/// The subset of the host project configuration this pipeline reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    pub root_dir: Option<PathBuf>,
    /// Ordered rewrite rules applied to `src` and style import paths.
    #[serde(deserialize_with = "deserialize_mapper")]
    pub module_name_mapper: Vec<(String, String)>,
    pub globals: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapperRepr {
    Object(IndexMap<String, String>),
    Pairs(Vec<(String, String)>),
}

/// Accept both the authored object form and the normalized pair list.
fn deserialize_mapper<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<MapperRepr>::deserialize(deserializer)? {
        Some(MapperRepr::Object(map)) => map.into_iter().collect(),
        Some(MapperRepr::Pairs(pairs)) => pairs,
        None => Vec::new(),
    })
}

impl PipelineConfig {
    /// Parse a configuration document.
    pub fn from_json(json: &str) -> TransformResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TransformError::config(format!("invalid transform options: {}", e)))
    }

    /// Read the options stored under the namespace key.
    ///
    /// A missing entry yields the defaults.
    pub fn vue_jest(&self) -> TransformResult<JestVueOptions> {
        let globals = &self.config.globals;
        let entry = [NAMESPACE, SWC_NAMESPACE]
            .into_iter()
            .find_map(|key| globals.get(key).map(|value| (key, value)));
        match entry {
            Some((key, value)) => serde_json::from_value(value.clone()).map_err(|e| {
                TransformError::config(format!("invalid `globals.{}` options: {}", key, e))
            }),
            None => Ok(JestVueOptions::default()),
        }
    }
}

/// User settings under `globals["vue-jest"]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JestVueOptions {
    /// Language-tag pattern to transformer name.
    pub transform: IndexMap<String, String>,
    /// Style language to stylesheets prepended to every block of that language.
    pub resources: IndexMap<String, Vec<String>>,
    #[serde(rename = "experimentalCSSCompile")]
    pub experimental_css_compile: Option<bool>,
    /// Merged into every style compiler invocation.
    pub style_options: Map<String, Value>,
    /// Merged into every template compiler invocation.
    pub template_compiler: Map<String, Value>,
    /// Forwarded to the script setup compiler.
    pub compiler_options: Map<String, Value>,
    /// Per-language preprocessing options for templates, e.g. `pug`.
    #[serde(flatten)]
    pub preprocess: Map<String, Value>,
}

impl JestVueOptions {
    /// Whether style blocks are compiled at all.
    pub fn css_compile_enabled(&self) -> bool {
        self.experimental_css_compile != Some(false)
    }

    /// Preprocessing options for a template language.
    pub fn preprocess_options(&self, lang: &str) -> Option<&Value> {
        self.preprocess.get(lang)
    }
}
