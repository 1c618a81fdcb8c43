//! Vue Single File Component parser.
//!
//! This crate splits a `.vue` file into its template, script, script setup,
//! style, and custom blocks. Script blocks carry a source map pointing back
//! into the component file.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use error::{ErrorCode, ParseError};
pub use parser::parse_sfc;

/// Parse a component file, logging any recoverable problems.
pub fn parse(source: &str, filename: &str) -> ComponentDescriptor {
    let descriptor = parse_sfc(source, filename);
    for error in &descriptor.errors {
        tracing::warn!(file = filename, code = %error.code, "{}", error);
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_sfc() {
        let source = r#"<template>
  <div :class="$style.red">Hello {{ name }}</div>
</template>

<script>
export default {
  data: () => ({ name: 'World' })
}
</script>

<style module>
.red { color: red; }
</style>

<docs>
# Hello
</docs>
"#;
        let result = parse(source, "Hello.vue");
        assert!(result.template.is_some());
        assert!(result.script.is_some());
        assert!(result.script_setup.is_none());
        assert_eq!(result.styles.len(), 1);
        assert_eq!(result.styles[0].module.as_deref(), Some("$style"));
        assert_eq!(result.custom_blocks.len(), 1);
        assert_eq!(result.custom_blocks[0].content, "\n# Hello\n");
    }

    #[test]
    fn test_parse_script_and_script_setup() {
        let source = r#"<script>
export default { inheritAttrs: false }
</script>

<script setup>
const count = ref(0)
</script>"#;
        let result = parse(source, "Both.vue");
        assert!(!result.script.as_ref().unwrap().setup);
        assert!(result.script_setup.as_ref().unwrap().setup);
        assert_eq!(result.filename, "Both.vue");
    }

    #[test]
    fn test_descriptor_serializes_for_external_compilers() {
        let source = "<script setup lang=\"ts\">\nconst a = 1\n</script>";
        let result = parse(source, "Ts.vue");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["filename"], "Ts.vue");
        assert_eq!(json["scriptSetup"]["lang"], "ts");
        assert_eq!(json["scriptSetup"]["attrs"]["setup"], true);
        assert!(json["template"].is_null());
    }
}
