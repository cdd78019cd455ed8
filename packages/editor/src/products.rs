//! # Product Resolution
//!
//! Product markers stay literal in the editable document until the user
//! picks real catalog products. Resolution then swaps each selected slot's
//! markers for the product's values.

use std::collections::BTreeMap;

use mailslot_parser::visitor::walk_node_mut;
use mailslot_parser::{Markup, Node, VisitorMut};
use serde::{Deserialize, Serialize};

use crate::collaborators::Product;
use crate::config::EngineConfig;
use crate::grammar::{find_product_markers, ProductField, TrackingToken};
use crate::tracking::{node_tokens, strip_tokens};
use crate::EditorError;

/// Position of one product inside a product component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSlot {
    pub component_id: String,
    pub index: usize,
}

impl ProductSlot {
    pub fn new(component_id: impl Into<String>, index: usize) -> Self {
        Self {
            component_id: component_id.into(),
            index,
        }
    }
}

/// `(component, index) → product id`
pub type ProductSelection = BTreeMap<ProductSlot, String>;

fn field_value<'p>(product: &'p Product, field: ProductField) -> &'p str {
    match field {
        ProductField::Name => &product.name,
        ProductField::Price => &product.price,
        ProductField::Url => &product.url,
        ProductField::Image => &product.image_url,
    }
}

/// Replace the markers of every selected slot. Returns the number of
/// markers and tracked images resolved.
pub fn resolve_products(
    markup: &mut Markup,
    config: &EngineConfig,
    products: &[Product],
    selection: &ProductSelection,
) -> Result<usize, EditorError> {
    let mut chosen = BTreeMap::new();
    for (slot, product_id) in selection {
        let product = products
            .iter()
            .find(|p| &p.id == product_id)
            .ok_or_else(|| EditorError::UnknownProduct {
                component_id: slot.component_id.clone(),
                index: slot.index,
                product_id: product_id.clone(),
            })?;
        chosen.insert(slot.clone(), product);
    }

    let mut resolver = Resolver {
        config,
        chosen,
        resolved: 0,
    };
    resolver.visit_markup_mut(markup);

    tracing::info!("[Products] resolved {} product reference(s)", resolver.resolved);
    Ok(resolver.resolved)
}

struct Resolver<'a> {
    config: &'a EngineConfig,
    chosen: BTreeMap<ProductSlot, &'a Product>,
    resolved: usize,
}

impl Resolver<'_> {
    fn substitute(&mut self, text: &str, allowed: &[ProductField]) -> Option<String> {
        let found = find_product_markers(text);
        let mut output = String::with_capacity(text.len());
        let mut last = 0;
        let mut changed = false;

        for marker in found {
            if !allowed.contains(&marker.field) {
                continue;
            }
            let slot = ProductSlot::new(marker.component_id, marker.index);
            let Some(product) = self.chosen.get(&slot) else {
                continue;
            };
            output.push_str(&text[last..marker.range.start]);
            output.push_str(field_value(product, marker.field));
            last = marker.range.end;
            changed = true;
            self.resolved += 1;
        }

        if !changed {
            return None;
        }
        output.push_str(&text[last..]);
        Some(output)
    }

    fn resolve_tracked_image(&mut self, node: &mut Node) {
        if !self.config.is_image_tag(&node.tag) {
            return;
        }
        for token in node_tokens(node, self.config) {
            let TrackingToken::ProductImageSlot {
                component_id,
                index,
            } = &token
            else {
                continue;
            };
            let Some(product) = self.chosen.get(&ProductSlot::new(component_id.clone(), *index)) else {
                continue;
            };
            node.attributes
                .set(self.config.source_attribute.clone(), product.image_url.as_str());
            let token = token.to_string();
            strip_tokens(node, self.config, |t| t == token);
            self.resolved += 1;
        }
    }
}

impl VisitorMut for Resolver<'_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        self.resolve_tracked_image(node);

        let source = self.config.source_attribute.clone();
        let link = self.config.link_attribute.clone();
        for name in [source, link] {
            let allowed: &[ProductField] = if name == self.config.source_attribute {
                &[ProductField::Image]
            } else {
                &[ProductField::Url]
            };
            let updated = node
                .attributes
                .get(&name)
                .and_then(|value| self.substitute(value, allowed));
            if let Some(updated) = updated {
                node.attributes.set(name, updated);
            }
        }

        walk_node_mut(self, node);
    }

    fn visit_text_mut(&mut self, text: &mut String) {
        if let Some(updated) = self.substitute(text, &[ProductField::Name, ProductField::Price]) {
            *text = updated;
        }
    }
}
