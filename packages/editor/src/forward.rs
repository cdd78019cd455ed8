//! # Forward Transform (persisted → editable)
//!
//! Swaps markers for readable stand-ins and tags each affected node with
//! the marker identity it replaced.
//!
//! - Image nodes: `{{logo}}`, `{{image:ID}}` and `{{product:C:I:image}}`
//!   sources become dummy SVGs.
//! - Text/button nodes whose whole trimmed content is `{{content:ID}}` or
//!   `{{footer}}` get the dummy sentence for that slot.
//! - Product name/price/url markers stay literal until products are
//!   resolved.
//!
//! A node that already carries an identity token is never re-matched,
//! which makes the transform idempotent.

use mailslot_parser::visitor::walk_node_mut;
use mailslot_parser::{serialize_children, Child, Markup, Node, VisitorMut};

use crate::config::EngineConfig;
use crate::grammar::{dummy_image_for, Marker, PlaceholderTable, ProductField};
use crate::tracking::{add_token, has_identity};

pub struct ForwardTransform<'a> {
    config: &'a EngineConfig,
    placeholders: PlaceholderTable,
    tagged: usize,
}

impl<'a> ForwardTransform<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            placeholders: PlaceholderTable::new(&config.placeholder_text),
            tagged: 0,
        }
    }

    /// Transform a whole document. Returns the number of nodes tagged.
    pub fn apply(mut self, markup: &mut Markup) -> usize {
        self.visit_markup_mut(markup);
        self.tagged
    }

    /// Transform a detached subtree. Returns the number of nodes tagged.
    pub fn apply_node(mut self, node: &mut Node) -> usize {
        self.visit_node_mut(node);
        self.tagged
    }

    fn transform(&mut self, node: &mut Node) {
        if has_identity(node, self.config) {
            return;
        }

        if self.config.is_image_tag(&node.tag) {
            self.transform_image(node);
        } else if self.config.is_text_tag(&node.tag) {
            self.transform_text(node);
        }
    }

    fn transform_image(&mut self, node: &mut Node) {
        let Some(marker) = node
            .attributes
            .get(&self.config.source_attribute)
            .and_then(Marker::parse)
        else {
            return;
        };

        match marker {
            Marker::Image { .. }
            | Marker::Product {
                field: ProductField::Image,
                ..
            } => {
                node.attributes
                    .set(self.config.source_attribute.clone(), dummy_image_for(&marker));
                add_token(node, self.config, &marker.tracking_token());
                self.tagged += 1;
            }
            _ => {}
        }
    }

    fn transform_text(&mut self, node: &mut Node) {
        let inner = serialize_children(&node.children);
        let Some(marker @ Marker::Content { .. }) = Marker::parse(&inner) else {
            return;
        };
        let Marker::Content { slot_id } = &marker else {
            return;
        };

        let dummy = self.placeholders.text_for(slot_id).to_string();
        replace_core_text(&mut node.children, &dummy);
        add_token(node, self.config, &marker.tracking_token());
        self.tagged += 1;
    }
}

impl VisitorMut for ForwardTransform<'_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        self.transform(node);
        walk_node_mut(self, node);
    }
}

/// Replace a node's content with `replacement`. When the content is a single
/// text run, its leading and trailing whitespace is kept.
pub(crate) fn replace_core_text(children: &mut Vec<Child>, replacement: &str) {
    if let [Child::Text { content }] = children.as_mut_slice() {
        let leading = content.len() - content.trim_start().len();
        let trailing = content.len() - content.trim_end().len();
        if leading + trailing < content.len() {
            let mut updated = String::with_capacity(leading + replacement.len() + trailing);
            updated.push_str(&content[..leading]);
            updated.push_str(replacement);
            updated.push_str(&content[content.len() - trailing..]);
            *content = updated;
            return;
        }
    }
    *children = vec![Child::text(replacement)];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{DUMMY_IMAGE, DUMMY_LOGO, DUMMY_PRODUCT_IMAGE};
    use mailslot_parser::{parse, serialize};

    fn forward(source: &str) -> (Markup, usize) {
        let config = EngineConfig::default();
        let mut markup = parse(source).unwrap();
        let tagged = ForwardTransform::new(&config).apply(&mut markup);
        (markup, tagged)
    }

    #[test]
    fn test_image_marker_gets_dummy_and_token() {
        let (markup, tagged) = forward(r#"<mj-image src="{{image:hero-banner}}" />"#);
        let image = markup.find_by_tag("mj-image").unwrap();

        assert_eq!(tagged, 1);
        assert_eq!(image.attributes.get("src"), Some(DUMMY_IMAGE));
        assert_eq!(image.attributes.get("css-class"), Some("img-slot--hero-banner"));
    }

    #[test]
    fn test_logo_uses_logo_dummy() {
        let (markup, _) = forward(r#"<mj-image src="{{logo}}" />"#);
        let image = markup.find_by_tag("mj-image").unwrap();
        assert_eq!(image.attributes.get("src"), Some(DUMMY_LOGO));
        assert_eq!(image.attributes.get("css-class"), Some("img-slot--logo"));
    }

    #[test]
    fn test_product_image_is_tagged_by_component_and_index() {
        let (markup, _) = forward(
            r#"<mj-image src="{{product:spotlight:2:image}}" href="{{product:spotlight:2:url}}" />"#,
        );
        let image = markup.find_by_tag("mj-image").unwrap();
        assert_eq!(image.attributes.get("src"), Some(DUMMY_PRODUCT_IMAGE));
        assert_eq!(image.attributes.get("href"), Some("{{product:spotlight:2:url}}"));
        assert_eq!(
            image.attributes.get("css-class"),
            Some("product-img-slot--spotlight--2")
        );
    }

    #[test]
    fn test_existing_classes_are_appended_to() {
        let (markup, _) = forward(r#"<mj-image css-class="rounded" src="{{image:hero}}" />"#);
        let image = markup.find_by_tag("mj-image").unwrap();
        assert_eq!(image.attributes.get("css-class"), Some("rounded img-slot--hero"));
    }

    #[test]
    fn test_content_marker_becomes_dummy_text() {
        let (markup, _) = forward("<mj-text>\n  {{content:headline}}\n</mj-text>");
        let text = markup.find_by_tag("mj-text").unwrap();
        assert_eq!(text.text_content(), "\n  Your Headline Goes Here\n");
        assert_eq!(text.attributes.get("css-class"), Some("content-slot--headline"));
    }

    #[test]
    fn test_footer_alias() {
        let (markup, _) = forward("<mj-text>{{footer}}</mj-text>");
        let text = markup.find_by_tag("mj-text").unwrap();
        assert_eq!(text.attributes.get("css-class"), Some("content-slot--footer"));
    }

    #[test]
    fn test_unknown_slot_falls_back_to_id() {
        let (markup, _) = forward("<mj-button>{{content:promo-code}}</mj-button>");
        let button = markup.find_by_tag("mj-button").unwrap();
        assert_eq!(button.text_content(), "promo-code");
    }

    #[test]
    fn test_near_markers_pass_through() {
        let source = "<mj-text>Hi {{content:name}}</mj-text><mj-text><p>{{content:x}}</p></mj-text><mj-text>{{image:hero}}</mj-text>";
        let (markup, tagged) = forward(source);
        assert_eq!(tagged, 0);
        assert_eq!(serialize(&markup), source);
    }

    #[test]
    fn test_product_text_fields_stay_literal() {
        let source = "<mj-text>{{product:spotlight:0:name}}</mj-text>";
        let (markup, tagged) = forward(source);
        assert_eq!(tagged, 0);
        assert_eq!(serialize(&markup), source);
    }

    #[test]
    fn test_forward_is_idempotent() {
        let config = EngineConfig::default();
        let (mut markup, _) = forward(
            r#"<mj-column><mj-image src="{{logo}}" /><mj-text>{{content:headline}}</mj-text></mj-column>"#,
        );
        let once = serialize(&markup);

        let tagged = ForwardTransform::new(&config).apply(&mut markup);
        assert_eq!(tagged, 0);
        assert_eq!(serialize(&markup), once);
    }

    #[test]
    fn test_tagged_node_with_marker_text_is_not_rematched() {
        let source = r#"<mj-text css-class="content-slot--headline">{{content:other}}</mj-text>"#;
        let (markup, tagged) = forward(source);
        assert_eq!(tagged, 0);
        assert_eq!(serialize(&markup), source);
    }
}
