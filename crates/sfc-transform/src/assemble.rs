//! Assembling processed fragments into the final module.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use source_map::{CodeBuilder, SourceMap, SourceMapExt};

use crate::error::TransformResult;
use crate::style::StyleResult;

/// Runtime name of the component options object in generated code.
pub const NAMESPACE_ALIAS: &str = "__options__";

const ES_PLACEHOLDER: &str = "const _comp = {} \nexport { _comp as default }";

const CJS_PLACEHOLDER: &str = "Object.defineProperty(exports, \"__esModule\", {\n  value: true\n});\nmodule.exports.default = {};\n";

/// The render helper line excluded from coverage.
const RENDER_HELPER: &str = "var _c = _vm._self._c || _h";

const COVERAGE_IGNORE: &str = "/* istanbul ignore next */\n";

static DEFAULT_EXPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"export \{ (.*) as default \}").unwrap());

/// The normalized output of one block processor.
#[derive(Debug, Clone, Default)]
pub struct Fragment {
    /// Generated code, free of inline source map comments.
    pub code: String,
    /// Map from `code` back to the component or its external source.
    pub map: Option<SourceMap>,
    /// Content loaded from a `src` reference, if any.
    pub external_src: Option<String>,
}

/// The result handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOutput {
    pub code: String,
    /// The serialized source map.
    pub map: String,
}

/// Everything the assembler combines for one component.
#[derive(Debug, Clone, Default)]
pub struct Assembly<'a> {
    pub filename: &'a str,
    /// Emit ES module glue instead of CommonJS.
    pub esm: bool,
    pub is_functional: bool,
    pub script: Option<Fragment>,
    pub template: Option<Fragment>,
    pub styles: Vec<StyleResult>,
    pub custom_blocks: Option<String>,
}

impl Assembly<'_> {
    /// Build the module text and its map.
    pub fn assemble(self) -> TransformResult<TransformOutput> {
        let mut builder = CodeBuilder::new();

        match &self.script {
            Some(script) => push_fragment(&mut builder, script),
            None if self.esm => builder.push_str(ES_PLACEHOLDER),
            None => builder.push_str(CJS_PLACEHOLDER),
        }

        let alias = if self.esm {
            es_alias(builder.code())
        } else {
            format!(
                "var {ns} = typeof exports.default === 'function' ? exports.default.options : exports.default\n",
                ns = NAMESPACE_ALIAS
            )
        };
        push_line(&mut builder, &alias);

        if let Some(template) = &self.template {
            push_fragment(&mut builder, template);
            builder.insert_before_last(RENDER_HELPER, COVERAGE_IGNORE);
            builder.push_str(&format!(
                "\n{ns}.render = render\n{ns}.staticRenderFns = staticRenderFns\n",
                ns = NAMESPACE_ALIAS
            ));
            if self.is_functional {
                builder.push_str(&format!("{}.functional = true\n", NAMESPACE_ALIAS));
                builder.push_str(&format!("{}._compiled = true\n", NAMESPACE_ALIAS));
            }
        }

        if !self.styles.is_empty() {
            let styles = style_registrations(&self.styles);
            let block = if self.is_functional {
                format!(
                    ";(function() {{\n  var originalRender = {ns}.render\n  var styleFn = function () {{ {styles} }}\n  {ns}.render = function renderWithStyleInjection (h, context) {{\n    styleFn.call(context)\n    return originalRender(h, context)\n  }}\n}})()\n",
                    ns = NAMESPACE_ALIAS,
                    styles = styles
                )
            } else {
                format!(
                    ";(function() {{\n  var beforeCreate = {ns}.beforeCreate\n  var styleFn = function () {{ {styles} }}\n  {ns}.beforeCreate = beforeCreate ? [].concat(beforeCreate, styleFn) : [styleFn]\n}})()\n",
                    ns = NAMESPACE_ALIAS,
                    styles = styles
                )
            };
            push_line(&mut builder, &block);
        }

        if let Some(custom) = &self.custom_blocks {
            push_line(&mut builder, &format!(";\n {}", custom));
        }

        let (code, map) = builder.finish(Some(self.filename));
        Ok(TransformOutput {
            code,
            map: map.to_json()?,
        })
    }
}

/// Bind the alias to the options of the exported default component.
fn es_alias(code: &str) -> String {
    match DEFAULT_EXPORT.captures(code).and_then(|caps| caps.get(1)) {
        Some(name) => format!("const {} = {}.options\n", NAMESPACE_ALIAS, name.as_str()),
        None => {
            tracing::error!("Could not parse component name from template!");
            format!("const {} = {{}}\n", NAMESPACE_ALIAS)
        }
    }
}

fn style_registrations(styles: &[StyleResult]) -> String {
    styles
        .iter()
        .map(|style| {
            format!(
                "if(!this['{name}']) {{\n  this['{name}'] = {{}};\n}}\nthis['{name}'] = Object.assign(\nthis['{name}'], {code});\n",
                name = style.module_name,
                code = style.code
            )
        })
        .collect()
}

fn separate(builder: &mut CodeBuilder) {
    if !builder.at_line_start() {
        builder.newline();
    }
}

fn push_line(builder: &mut CodeBuilder, code: &str) {
    separate(builder);
    builder.push_str(code);
}

fn push_fragment(builder: &mut CodeBuilder, fragment: &Fragment) {
    separate(builder);
    builder.push_fragment(&fragment.code, fragment.map.as_ref());
}
