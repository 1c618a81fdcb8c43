//! Deciding which blocks of a component flow through which processor.

use once_cell::sync::Lazy;
use regex::Regex;
use sfc_parser::{ComponentDescriptor, CustomBlock, StyleBlock, TemplateBlock};

static FUNCTIONAL_OPTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"functional:\s*true").unwrap());

/// Where the module body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptRoute {
    /// `<script setup>`, which supersedes a plain script.
    Setup,
    /// The plain `<script>` block.
    Plain,
    /// No script at all; an empty component is synthesized.
    Placeholder,
}

/// The processors one component needs.
#[derive(Debug, Clone)]
pub struct BlockPlan<'a> {
    pub script: ScriptRoute,
    pub template: Option<&'a TemplateBlock>,
    /// Style blocks exposing a CSS module, in source order.
    pub module_styles: Vec<&'a StyleBlock>,
    pub custom_blocks: &'a [CustomBlock],
    pub is_functional: bool,
}

impl<'a> BlockPlan<'a> {
    /// Route the blocks of `descriptor`.
    pub fn new(descriptor: &'a ComponentDescriptor) -> Self {
        let script = if descriptor.script_setup.is_some() {
            ScriptRoute::Setup
        } else if descriptor.script.is_some() {
            ScriptRoute::Plain
        } else {
            ScriptRoute::Placeholder
        };

        let (module_styles, plain): (Vec<_>, Vec<_>) =
            descriptor.styles.iter().partition(|style| style.module.is_some());
        if !plain.is_empty() {
            tracing::debug!(
                file = %descriptor.filename,
                count = plain.len(),
                "dropping styles without a module"
            );
        }

        let plan = Self {
            script,
            template: descriptor.template.as_ref(),
            module_styles,
            custom_blocks: &descriptor.custom_blocks,
            is_functional: is_functional(descriptor),
        };
        tracing::debug!(
            file = %descriptor.filename,
            script = ?plan.script,
            template = plan.template.is_some(),
            styles = plan.module_styles.len(),
            custom_blocks = plan.custom_blocks.len(),
            functional = plan.is_functional,
            "routed component blocks"
        );
        plan
    }
}

/// Whether the component is functional.
///
/// True when the template carries a `functional` attribute or the plain
/// script's text contains `functional: true`. The script check is textual.
pub fn is_functional(descriptor: &ComponentDescriptor) -> bool {
    let template = descriptor
        .template
        .as_ref()
        .is_some_and(|template| template.functional);
    let script = descriptor
        .script
        .as_ref()
        .is_some_and(|script| FUNCTIONAL_OPTION.is_match(&script.content));
    template || script
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> ComponentDescriptor {
        sfc_parser::parse(source, "/app/Comp.vue")
    }

    #[test]
    fn test_functional_from_template_attribute() {
        let sfc = parse("<template functional=\"true\"><div /></template>");
        assert!(is_functional(&sfc));
    }

    #[test]
    fn test_functional_from_script_text() {
        for script in [
            "export default { functional: true }",
            "export default { functional:true }",
            "export default {\n  functional:\n    true\n}",
        ] {
            let sfc = parse(&format!("<template><div /></template><script>{}</script>", script));
            assert!(is_functional(&sfc), "{script}");
        }
    }

    #[test]
    fn test_not_functional() {
        let sfc = parse(
            "<template><div /></template><script>export default { functional: false }</script>",
        );
        assert!(!is_functional(&sfc));
    }

    #[test]
    fn test_script_setup_supersedes_script() {
        let sfc = parse("<script>export default {}</script><script setup>const a = 1</script>");
        assert_eq!(BlockPlan::new(&sfc).script, ScriptRoute::Setup);
        let sfc = parse("<script>export default {}</script>");
        assert_eq!(BlockPlan::new(&sfc).script, ScriptRoute::Plain);
        let sfc = parse("<template><div /></template>");
        assert_eq!(BlockPlan::new(&sfc).script, ScriptRoute::Placeholder);
    }

    #[test]
    fn test_only_module_styles_are_routed() {
        let sfc = parse(
            "<style>.a {}</style><style module>.b {}</style><style module=\"named\">.c {}</style>",
        );
        let plan = BlockPlan::new(&sfc);
        let modules: Vec<_> = plan
            .module_styles
            .iter()
            .map(|style| style.module.as_deref().unwrap())
            .collect();
        assert_eq!(modules, vec!["$style", "named"]);
    }
}
