//! Engine configuration
//!
//! Names the markup vocabulary the engine operates on. Defaults describe
//! MJML; every field can be overridden from JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::EditorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Elements whose source attribute may hold an image marker
    pub image_tags: Vec<String>,

    /// Elements whose whole content may be a content marker
    pub text_tags: Vec<String>,

    /// Elements content blocks may be dropped into
    pub container_tags: Vec<String>,

    /// Elements that attach at the top level only
    pub structure_tags: Vec<String>,

    /// Column elements; a content block rooted at one attaches to a
    /// column container instead
    pub column_tags: Vec<String>,

    /// Elements columns may be dropped into
    pub column_container_tags: Vec<String>,

    /// Element whose children form the document's top level
    pub root_tag: String,

    pub source_attribute: String,
    pub link_attribute: String,

    /// Class-list attribute carrying tracking tokens
    pub tracking_attribute: String,

    /// Class names marking header/footer regions
    pub reserved_regions: Vec<String>,

    /// Attributes recovered when rebuilding a corrupted image node
    pub image_attributes: Vec<String>,

    /// Extra slot id → dummy text entries
    pub placeholder_text: BTreeMap<String, String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            image_tags: strings(&["mj-image"]),
            text_tags: strings(&["mj-text", "mj-button"]),
            container_tags: strings(&["mj-column", "mj-hero"]),
            structure_tags: strings(&["mj-section", "mj-wrapper", "mj-hero"]),
            column_tags: strings(&["mj-column"]),
            column_container_tags: strings(&["mj-section", "mj-group"]),
            root_tag: "mj-body".to_string(),
            source_attribute: "src".to_string(),
            link_attribute: "href".to_string(),
            tracking_attribute: "css-class".to_string(),
            reserved_regions: strings(&["header", "footer"]),
            image_attributes: strings(&[
                "alt",
                "width",
                "height",
                "href",
                "rel",
                "target",
                "title",
                "align",
                "padding",
                "border",
                "border-radius",
                "container-background-color",
                "fluid-on-mobile",
                "css-class",
            ]),
            placeholder_text: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, EditorError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn is_image_tag(&self, tag: &str) -> bool {
        self.image_tags.iter().any(|t| t == tag)
    }

    pub fn is_text_tag(&self, tag: &str) -> bool {
        self.text_tags.iter().any(|t| t == tag)
    }

    pub fn is_container_tag(&self, tag: &str) -> bool {
        self.container_tags.iter().any(|t| t == tag)
    }

    pub fn is_structure_tag(&self, tag: &str) -> bool {
        self.structure_tags.iter().any(|t| t == tag)
    }

    pub fn is_column_tag(&self, tag: &str) -> bool {
        self.column_tags.iter().any(|t| t == tag)
    }

    pub fn is_column_container_tag(&self, tag: &str) -> bool {
        self.column_container_tags.iter().any(|t| t == tag)
    }

    pub fn is_reserved_region(&self, class: &str) -> bool {
        self.reserved_regions.iter().any(|r| r == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_mjml() {
        let config = EngineConfig::default();
        assert!(config.is_image_tag("mj-image"));
        assert!(config.is_text_tag("mj-button"));
        assert!(config.is_container_tag("mj-column"));
        assert!(config.is_column_container_tag("mj-section"));
        assert!(!config.is_container_tag("mj-section"));
        assert_eq!(config.tracking_attribute, "css-class");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "textTags": ["mj-text", "mj-button", "mj-navbar-link"],
            "placeholderText": { "promo-code": "SPRING25" }
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert!(config.is_text_tag("mj-navbar-link"));
        assert_eq!(config.source_attribute, "src");
        assert_eq!(
            config.placeholder_text.get("promo-code").map(String::as_str),
            Some("SPRING25")
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = EngineConfig::load(Path::new("/definitely/not/here.json")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
