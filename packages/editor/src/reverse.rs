//! # Reverse Transform (editable → persisted)
//!
//! Tracking tokens are the only channel back to the original markers: the
//! text and attributes around them may have been rewritten freely by the
//! user, so nothing here looks at dummy text.
//!
//! Tracked image nodes keep only their source and the reconstructor's
//! allow-listed attributes, so fragments of leaked vector data never reach
//! the persisted form.

use mailslot_parser::visitor::walk_node_mut;
use mailslot_parser::{parse, serialize, Markup, Node, ParseResult, VisitorMut};

use crate::config::EngineConfig;
use crate::forward::replace_core_text;
use crate::grammar::{Marker, ProductField, TrackingToken, LOCKED_SECTION};
use crate::reconstructor::AttributeReconstructor;
use crate::tracking::{node_tokens, strip_tokens};

pub struct ReverseTransform<'a> {
    config: &'a EngineConfig,
    reconstructor: AttributeReconstructor,
}

impl<'a> ReverseTransform<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            reconstructor: AttributeReconstructor::new(config),
        }
    }

    /// Restore markers in place. Returns the number of nodes restored.
    pub fn apply(&self, markup: &mut Markup) -> usize {
        let mut pass = RestorePass {
            config: self.config,
            allowed: self.reconstructor.allowed_attributes(),
            restored: 0,
        };
        pass.visit_markup_mut(markup);
        pass.restored
    }

    /// Persisted text for an editable document. The document itself is
    /// left as it is.
    pub fn to_persisted(&self, markup: &Markup) -> String {
        let mut persisted = markup.clone();
        let restored = self.apply(&mut persisted);
        let text = serialize(&persisted);

        let corrupted = self.reconstructor.corrupted_count(&text);
        if corrupted > 0 {
            tracing::debug!(
                "[ReverseTransform] safety net rebuilding {} image node(s)",
                corrupted
            );
        }
        tracing::debug!("[ReverseTransform] restored {} marker(s)", restored);
        self.reconstructor.repair(&text)
    }

    /// Reverse serialized editable markup. Image tags with leaked vector
    /// data are rebuilt before parsing; their tracking tokens survive the
    /// rebuild through the attribute allow-list.
    pub fn reverse_markup(&self, source: &str) -> ParseResult<String> {
        let repaired = self.reconstructor.repair_leaked(source);
        let markup = parse(&repaired)?;
        Ok(self.to_persisted(&markup))
    }
}

struct RestorePass<'a> {
    config: &'a EngineConfig,
    /// Attributes a rebuilt image node keeps besides its source
    allowed: &'a [String],
    restored: usize,
}

impl RestorePass<'_> {
    fn restore(&mut self, node: &mut Node) {
        let tokens = node_tokens(node, self.config);
        if tokens.is_empty() {
            return;
        }

        let mut consumed: Vec<String> = vec![LOCKED_SECTION.to_string()];
        for token in tokens {
            if let Some(marker) = self.marker_for(node, &token) {
                self.write_marker(node, &marker);
                consumed.push(token.to_string());
                self.restored += 1;
            }
        }

        strip_tokens(node, self.config, |t| consumed.iter().any(|c| c == t));
    }

    fn marker_for(&self, node: &Node, token: &TrackingToken) -> Option<Marker> {
        let is_image = self.config.is_image_tag(&node.tag);
        let is_text = self.config.is_text_tag(&node.tag);
        match token {
            TrackingToken::ImageSlot(id) if is_image => Some(Marker::image(id.clone())),
            TrackingToken::ProductImageSlot {
                component_id,
                index,
            } if is_image => Some(Marker::Product {
                component_id: component_id.clone(),
                index: *index,
                field: ProductField::Image,
            }),
            TrackingToken::ContentSlot(id) if is_text => Some(Marker::content(id.clone())),
            _ => None,
        }
    }

    fn write_marker(&self, node: &mut Node, marker: &Marker) {
        match marker {
            Marker::Content { .. } => replace_core_text(&mut node.children, &marker.to_string()),
            // rebuilt from the allow-list; order of the kept attributes is unchanged
            _ => {
                let source = &self.config.source_attribute;
                node.attributes
                    .retain(|attr| attr.name == *source || self.allowed.contains(&attr.name));
                node.attributes.set(source.clone(), marker.to_string());
            }
        }
    }
}

impl VisitorMut for RestorePass<'_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        self.restore(node);
        walk_node_mut(self, node);
    }
}

/// Convenience wrapper over [`ReverseTransform::reverse_markup`]
pub fn reverse_markup(source: &str, config: &EngineConfig) -> ParseResult<String> {
    ReverseTransform::new(config).reverse_markup(source)
}
