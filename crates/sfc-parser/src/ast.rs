//! Descriptor types for Vue Single File Components.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use smol_str::SmolStr;
use source_map::{SourceMap, Span};

use crate::error::ParseError;

/// A parsed component file, split into its logical blocks.
///
/// Produced once per transform invocation; the pipeline only reads it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// Path of the component file.
    pub filename: String,
    /// The full source content.
    pub source: String,
    /// The template block, if present.
    pub template: Option<TemplateBlock>,
    /// The plain script block, if present.
    pub script: Option<ScriptBlock>,
    /// The `<script setup>` block, if present.
    pub script_setup: Option<ScriptBlock>,
    /// All style blocks, in source order.
    pub styles: Vec<StyleBlock>,
    /// Any other top-level blocks (e.g., `<i18n>`, `<docs>`), in source order.
    pub custom_blocks: Vec<CustomBlock>,
    /// Recoverable problems found while parsing.
    #[serde(skip)]
    pub errors: Vec<ParseError>,
}

impl ComponentDescriptor {
    /// Create an empty descriptor for a file.
    pub fn new(filename: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            source: source.into(),
            ..Default::default()
        }
    }
}

/// A block in the SFC with common properties.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SfcBlock {
    /// The span of the entire block including tags.
    #[serde(skip)]
    pub span: Span,
    /// The span of the content only (excluding tags).
    #[serde(skip)]
    pub content_span: Span,
    /// The raw content of the block.
    pub content: String,
    /// Block attributes, in authoring order.
    #[serde(serialize_with = "serialize_attrs")]
    pub attrs: Vec<BlockAttr>,
    /// The `lang` attribute.
    pub lang: Option<String>,
    /// The `src` attribute, referencing external content.
    pub src: Option<String>,
    /// Map from block content back to the component file.
    #[serde(with = "source_map::serde_map")]
    pub map: Option<SourceMap>,
}

impl SfcBlock {
    /// Get an attribute value by name.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    /// Check if an attribute exists (for boolean attributes).
    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }
}

/// An attribute on a block tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAttr {
    /// The attribute name.
    pub name: SmolStr,
    /// The attribute value (None for boolean attributes).
    pub value: Option<String>,
}

impl BlockAttr {
    /// Create a new boolean attribute.
    pub fn boolean(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Create a new attribute with a value.
    pub fn with_value(name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Attributes serialize as an object; boolean (and empty) attributes become `true`.
fn serialize_attrs<S: Serializer>(attrs: &[BlockAttr], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(attrs.len()))?;
    for attr in attrs {
        match attr.value.as_deref() {
            Some(value) if !value.is_empty() => map.serialize_entry(attr.name.as_str(), value)?,
            _ => map.serialize_entry(attr.name.as_str(), &true)?,
        }
    }
    map.end()
}

/// The template block.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateBlock {
    /// Common block properties.
    #[serde(flatten)]
    pub block: SfcBlock,
    /// Whether the template declares a `functional` attribute.
    pub functional: bool,
}

impl std::ops::Deref for TemplateBlock {
    type Target = SfcBlock;
    fn deref(&self) -> &Self::Target {
        &self.block
    }
}

/// A script block, plain or `setup`.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptBlock {
    /// Common block properties.
    #[serde(flatten)]
    pub block: SfcBlock,
    /// Whether this is a `<script setup>` block.
    pub setup: bool,
}

impl std::ops::Deref for ScriptBlock {
    type Target = SfcBlock;
    fn deref(&self) -> &Self::Target {
        &self.block
    }
}

/// A style block.
#[derive(Debug, Clone, Serialize)]
pub struct StyleBlock {
    /// Common block properties.
    #[serde(flatten)]
    pub block: SfcBlock,
    /// Whether this is a scoped style.
    pub scoped: bool,
    /// Exposed CSS module name: `$style` for a bare `module`, or the alias given.
    pub module: Option<String>,
}

impl std::ops::Deref for StyleBlock {
    type Target = SfcBlock;
    fn deref(&self) -> &Self::Target {
        &self.block
    }
}

/// A custom block (e.g., `<i18n>`, `<docs>`).
#[derive(Debug, Clone, Serialize)]
pub struct CustomBlock {
    /// Common block properties.
    #[serde(flatten)]
    pub block: SfcBlock,
    /// The block type (tag name).
    #[serde(rename = "type")]
    pub block_type: SmolStr,
}

impl std::ops::Deref for CustomBlock {
    type Target = SfcBlock;
    fn deref(&self) -> &Self::Target {
        &self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrs_serialize_as_object() {
        let block = SfcBlock {
            content: "x".to_string(),
            attrs: vec![
                BlockAttr::with_value("lang", "json"),
                BlockAttr::boolean("global"),
                BlockAttr::with_value("locale", ""),
            ],
            ..Default::default()
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["attrs"]["lang"], "json");
        assert_eq!(json["attrs"]["global"], true);
        assert_eq!(json["attrs"]["locale"], true);
    }

    #[test]
    fn test_custom_block_serializes_type() {
        let block = CustomBlock {
            block: SfcBlock::default(),
            block_type: "i18n".into(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "i18n");
        assert!(json.get("content").is_some());
    }
}
