//! Small helpers shared by the processors.

use serde_json::{Map, Value};

/// Marker that starts an inline source map annotation.
const SOURCE_MAPPING_URL: &str = "//# sourceMappingURL";

/// Drop an inline source map annotation and everything after it.
pub fn strip_inline_source_map(code: &str) -> &str {
    match code.find(SOURCE_MAPPING_URL) {
        Some(idx) => &code[..idx],
        None => code,
    }
}

/// Merge `overlay` into `base`; nested objects merge, everything else replaces.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => merge_objects(base, overlay),
        (base, overlay) => *base = overlay.clone(),
    }
}

fn merge_objects(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        match base.get_mut(key) {
            Some(existing) => deep_merge(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_inline_source_map() {
        let code = "exports.default = {}\n//# sourceMappingURL=data:application/json;base64,e30=";
        assert_eq!(strip_inline_source_map(code), "exports.default = {}\n");
        assert_eq!(strip_inline_source_map("var a = 1\n"), "var a = 1\n");
    }

    #[test]
    fn test_deep_merge() {
        let mut base = json!({ "optimize": false, "modules": [1], "nested": { "a": 1 } });
        deep_merge(
            &mut base,
            &json!({ "whitespace": "condense", "modules": [2], "nested": { "b": 2 } }),
        );
        assert_eq!(
            base,
            json!({
                "optimize": false,
                "whitespace": "condense",
                "modules": [2],
                "nested": { "a": 1, "b": 2 }
            })
        );
    }

    #[test]
    fn test_deep_merge_overrides_defaults() {
        let mut base = json!({ "optimize": false });
        deep_merge(&mut base, &json!({ "optimize": true }));
        assert_eq!(base, json!({ "optimize": true }));
    }
}
