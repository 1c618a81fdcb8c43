//! Built-in style compiler for plain CSS.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

use crate::compilers::{StyleCompiler, StyleOutput, StyleRequest};
use crate::error::CompileResult;

/// Compiles plain CSS with lightningcss.
///
/// Parse failures become diagnostics. Preprocessor languages are not
/// supported and are reported the same way; configure a process bridge or a
/// transformer for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightningCssCompiler;

impl StyleCompiler for LightningCssCompiler {
    fn compile(&self, request: &StyleRequest<'_>) -> CompileResult<StyleOutput> {
        if let Some(lang) = request.preprocess_lang.filter(|lang| *lang != "css") {
            return Ok(StyleOutput {
                code: request.source.to_string(),
                errors: vec![format!(
                    "No preprocessor available for lang=\"{}\" in {}",
                    lang, request.file_path
                )],
            });
        }

        let parser_options = ParserOptions {
            filename: request.file_path.to_string(),
            ..Default::default()
        };
        let stylesheet = match StyleSheet::parse(request.source, parser_options) {
            Ok(stylesheet) => stylesheet,
            Err(e) => {
                return Ok(StyleOutput {
                    code: request.source.to_string(),
                    errors: vec![format!("CSS parse error: {}", e)],
                })
            }
        };

        match stylesheet.to_css(PrinterOptions::default()) {
            Ok(result) => Ok(StyleOutput {
                code: result.code,
                errors: Vec::new(),
            }),
            Err(e) => Ok(StyleOutput {
                code: request.source.to_string(),
                errors: vec![format!("CSS print error: {}", e)],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn request<'a>(source: &'a str, lang: Option<&'a str>) -> StyleRequest<'a> {
        StyleRequest {
            source,
            file_path: "/app/Comp.vue",
            preprocess_lang: lang,
            preprocess_options: Map::new(),
            scoped: false,
            importer: None,
        }
    }

    #[test]
    fn test_compiles_plain_css() {
        let output = LightningCssCompiler
            .compile(&request(".foo { color: red; }", None))
            .unwrap();
        assert!(output.errors.is_empty());
        assert!(output.code.contains(".foo"));
    }

    #[test]
    fn test_reports_missing_preprocessor() {
        let output = LightningCssCompiler
            .compile(&request("$c: red; .a { color: $c }", Some("scss")))
            .unwrap();
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].contains("lang=\"scss\""));
    }
}
