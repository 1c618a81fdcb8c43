//! Class-name maps for CSS modules under test.

use indexmap::IndexMap;
use lightningcss::rules::CssRule;
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::{ParserOptions, StyleSheet};

use crate::error::{TransformError, TransformResult};

/// Collect every class selector of a stylesheet, mapped to itself.
///
/// Classes keep first-seen order, so the same input always yields the same
/// map.
pub fn extract_class_map(css: &str) -> TransformResult<IndexMap<String, String>> {
    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| TransformError::Parse(format!("failed to parse compiled CSS: {}", e)))?;

    let mut classes = IndexMap::new();
    for rule in &stylesheet.rules.0 {
        collect_rule(rule, &mut classes);
    }
    Ok(classes)
}

/// The class map serialized as a JSON object literal.
pub fn class_map_json(css: &str) -> TransformResult<String> {
    let classes = extract_class_map(css)?;
    serde_json::to_string(&classes).map_err(|e| TransformError::Parse(e.to_string()))
}

fn collect_rule(rule: &CssRule<'_>, classes: &mut IndexMap<String, String>) {
    match rule {
        CssRule::Style(style) => {
            for selector in &style.selectors.0 {
                collect_selector(selector, classes);
            }
            for nested in &style.rules.0 {
                collect_rule(nested, classes);
            }
        }
        CssRule::Media(media) => {
            for rule in &media.rules.0 {
                collect_rule(rule, classes);
            }
        }
        CssRule::Supports(supports) => {
            for rule in &supports.rules.0 {
                collect_rule(rule, classes);
            }
        }
        CssRule::LayerBlock(layer) => {
            for rule in &layer.rules.0 {
                collect_rule(rule, classes);
            }
        }
        CssRule::Container(container) => {
            for rule in &container.rules.0 {
                collect_rule(rule, classes);
            }
        }
        _ => {}
    }
}

fn collect_selector(selector: &Selector<'_>, classes: &mut IndexMap<String, String>) {
    for component in selector.iter_raw_match_order() {
        match component {
            Component::Class(name) => {
                let name = name.0.to_string();
                classes.entry(name.clone()).or_insert(name);
            }
            Component::Negation(inner)
            | Component::Is(inner)
            | Component::Where(inner)
            | Component::Has(inner) => {
                for selector in inner.iter() {
                    collect_selector(selector, classes);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extracts_classes() {
        let map = extract_class_map(".foo { color: red; } .bar .baz > a { color: blue }").unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert!(keys.contains(&"foo".to_string()));
        assert!(keys.contains(&"bar".to_string()));
        assert!(keys.contains(&"baz".to_string()));
        assert_eq!(map["foo"], "foo");
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_single_module_scenario() {
        let json = class_map_json(".foo { color: red; }").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "foo": "foo" }));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let css = ".foo { color: red } .bar { color: blue }";
        let first = class_map_json(css).unwrap();
        let second = class_map_json(css).unwrap();
        assert_eq!(first, second);
        let value: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(value, serde_json::json!({ "foo": "foo", "bar": "bar" }));
    }

    #[test]
    fn test_nested_rules_and_pseudo_classes() {
        let css = "@media (min-width: 100px) { .wide { margin: 0 } }\n.a:not(.b) { color: red }";
        let map = extract_class_map(css).unwrap();
        assert!(map.contains_key("wide"));
        assert!(map.contains_key("a"));
        assert!(map.contains_key("b"));
    }

    #[test]
    fn test_no_classes() {
        assert_eq!(class_map_json("div { color: red }").unwrap(), "{}");
    }
}
