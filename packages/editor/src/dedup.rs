//! # Slot Deduplication
//!
//! Runs after a node has been inserted and the document has settled. Every
//! identity carried inside the inserted subtree that already exists elsewhere
//! is renamed with an append-ordinal (`headline` → `headline-1`). Only the
//! inserted subtree is touched; the pre-existing copy keeps its identity.
//!
//! Occurrences are counted on the serialized document text, which is what
//! gets persisted:
//!
//! - content identities count every `content-slot--X` substring with no
//!   boundary check, so `content-slot--X-1` also counts towards `X`
//! - image identities count `img-slot--X` only when it is followed by a
//!   quote or whitespace
//!
//! Product markers are deduplicated by component id alone; positional
//! indexes are never renamed.

use std::collections::{BTreeMap, BTreeSet};

use mailslot_parser::visitor::{walk_node, walk_node_mut};
use mailslot_parser::{serialize, Markup, Node, NodeId, Visitor, VisitorMut};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::grammar::{find_product_markers, Marker, TrackingToken, PRODUCT_IMAGE_SLOT_PREFIX};
use crate::tracking::{identity_tokens, replace_token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKind {
    Content,
    Image,
    ProductComponent,
}

/// One identity renamed during deduplication
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotRename {
    pub kind: SlotKind,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOutcome {
    pub renames: Vec<SlotRename>,
    /// Highest product index seen per component across the whole document
    pub product_slots: BTreeMap<String, usize>,
}

pub struct SlotDeduplicator<'a> {
    config: &'a EngineConfig,
}

impl<'a> SlotDeduplicator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Make every identity inside the subtree rooted at `inserted_id` unique
    /// across `markup`
    pub fn deduplicate(&self, markup: &mut Markup, inserted_id: &str) -> DedupOutcome {
        let mut renames = Vec::new();

        match markup.find_node(inserted_id) {
            Some(inserted) => {
                let tracked = TrackedNodes::collect(inserted, self.config);
                for (position, (node_id, tokens)) in tracked.iter().enumerate() {
                    for token in tokens {
                        if let Some(rename) =
                            self.dedupe_slot(markup, inserted_id, node_id, token, &tracked[position..])
                        {
                            renames.push(rename);
                        }
                    }
                }
                renames.extend(self.dedupe_components(markup, inserted_id));
            }
            None => {
                tracing::debug!(
                    "[SlotDeduplicator] inserted node {} is no longer in the document",
                    inserted_id
                );
            }
        }

        for rename in &renames {
            tracing::debug!(
                "[SlotDeduplicator] renamed {:?} {} -> {}",
                rename.kind,
                rename.from,
                rename.to
            );
        }

        DedupOutcome {
            renames,
            product_slots: product_slots(markup, self.config),
        }
    }

    fn dedupe_slot(
        &self,
        markup: &mut Markup,
        inserted_id: &str,
        node_id: &str,
        token: &TrackingToken,
        pending: &[(NodeId, Vec<TrackingToken>)],
    ) -> Option<SlotRename> {
        let (kind, slot_id) = match token {
            TrackingToken::ContentSlot(id) => (SlotKind::Content, id.as_str()),
            TrackingToken::ImageSlot(id) => (SlotKind::Image, id.as_str()),
            _ => return None,
        };

        // The current node and the subtree nodes after it have not been
        // processed yet, so they do not count as existing copies.
        let document_text = serialize(markup);
        let pending_text = self.pending_tracking_text(markup, pending);
        let others = occurrences(&document_text, token)
            .saturating_sub(occurrences(&pending_text, token));
        if others == 0 {
            return None;
        }

        let taken = all_identities(markup, self.config);
        let mut ordinal = others;
        let renamed = loop {
            let candidate = format!("{}-{}", slot_id, ordinal);
            let candidate_token = match kind {
                SlotKind::Content => TrackingToken::ContentSlot(candidate.clone()),
                _ => TrackingToken::ImageSlot(candidate.clone()),
            };
            if !taken.contains(&candidate_token.to_string()) {
                break candidate;
            }
            ordinal += 1;
        };

        let (from_marker, to_marker, to_token) = match kind {
            SlotKind::Content => (
                Marker::content(slot_id),
                Marker::content(renamed.clone()),
                TrackingToken::ContentSlot(renamed.clone()),
            ),
            _ => (
                Marker::image(slot_id),
                Marker::image(renamed.clone()),
                TrackingToken::ImageSlot(renamed.clone()),
            ),
        };

        if let Some(node) = markup.find_node_mut(node_id) {
            replace_token(node, self.config, token, &to_token);
        }
        if let Some(inserted) = markup.find_node_mut(inserted_id) {
            ReferenceRewriter::new(
                vec![
                    self.config.source_attribute.clone(),
                    self.config.link_attribute.clone(),
                ],
                vec![(from_marker.to_string(), to_marker.to_string())],
            )
            .visit_node_mut(inserted);
        }

        Some(SlotRename {
            kind,
            from: slot_id.to_string(),
            to: renamed,
        })
    }

    fn pending_tracking_text(&self, markup: &Markup, pending: &[(NodeId, Vec<TrackingToken>)]) -> String {
        pending
            .iter()
            .filter_map(|(id, _)| markup.find_node(id))
            .filter_map(|node| node.attributes.get(&self.config.tracking_attribute))
            .map(|value| format!("\"{}\"", value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn dedupe_components(&self, markup: &mut Markup, inserted_id: &str) -> Vec<SlotRename> {
        let Some(inserted) = markup.find_node(inserted_id) else {
            return Vec::new();
        };

        let mut inside = ComponentCollector::new(self.config, None);
        inside.visit_node(inserted);

        let mut outside = ComponentCollector::new(self.config, Some(inserted_id));
        outside.visit_markup(markup);
        let outside: BTreeSet<String> = outside.components.into_iter().collect();

        let mut everywhere = ComponentCollector::new(self.config, None);
        everywhere.visit_markup(markup);
        let mut known: BTreeSet<String> = everywhere.components.into_iter().collect();

        let mut renames = Vec::new();
        for component in inside.components {
            if !outside.contains(&component) {
                continue;
            }

            let renamed = (1..)
                .map(|n| format!("{}-{}", component, n))
                .find(|candidate| !known.contains(candidate))
                .unwrap_or_else(|| component.clone());
            known.insert(renamed.clone());

            if let Some(inserted) = markup.find_node_mut(inserted_id) {
                ReferenceRewriter::new(
                    vec![
                        self.config.source_attribute.clone(),
                        self.config.link_attribute.clone(),
                        self.config.tracking_attribute.clone(),
                    ],
                    vec![
                        (
                            format!("{{{{product:{}:", component),
                            format!("{{{{product:{}:", renamed),
                        ),
                        (
                            format!("{}{}--", PRODUCT_IMAGE_SLOT_PREFIX, component),
                            format!("{}{}--", PRODUCT_IMAGE_SLOT_PREFIX, renamed),
                        ),
                    ],
                )
                .visit_node_mut(inserted);
            }

            renames.push(SlotRename {
                kind: SlotKind::ProductComponent,
                from: component,
                to: renamed,
            });
        }
        renames
    }
}

/// Surface-text occurrence count of a tracking token
fn occurrences(text: &str, token: &TrackingToken) -> usize {
    let needle = token.to_string();
    match token {
        TrackingToken::ImageSlot(_) => text
            .match_indices(&needle)
            .filter(|(start, _)| {
                let before = text[..*start].chars().next_back();
                let after = text[start + needle.len()..].chars().next();
                before.map_or(true, is_boundary) && after.map_or(false, is_boundary)
            })
            .count(),
        _ => text.matches(&needle).count(),
    }
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || c == '"' || c == '\''
}

/// Every identity token string present anywhere in the document
fn all_identities(markup: &Markup, config: &EngineConfig) -> BTreeSet<String> {
    struct Collector<'a> {
        config: &'a EngineConfig,
        seen: BTreeSet<String>,
    }

    impl Visitor for Collector<'_> {
        fn visit_node(&mut self, node: &Node) {
            self.seen.extend(
                identity_tokens(node, self.config)
                    .iter()
                    .map(ToString::to_string),
            );
            walk_node(self, node);
        }
    }

    let mut collector = Collector {
        config,
        seen: BTreeSet::new(),
    };
    collector.visit_markup(markup);
    collector.seen
}

/// Highest product index per component id across the document
pub fn product_slots(markup: &Markup, config: &EngineConfig) -> BTreeMap<String, usize> {
    let mut collector = ComponentCollector::new(config, None);
    collector.visit_markup(markup);
    collector.max_index
}

/// Tracking-token nodes of a subtree in document order
struct TrackedNodes<'a> {
    config: &'a EngineConfig,
    nodes: Vec<(NodeId, Vec<TrackingToken>)>,
}

impl<'a> TrackedNodes<'a> {
    fn collect(root: &Node, config: &'a EngineConfig) -> Vec<(NodeId, Vec<TrackingToken>)> {
        let mut collector = Self {
            config,
            nodes: Vec::new(),
        };
        collector.visit_node(root);
        collector.nodes
    }
}

impl Visitor for TrackedNodes<'_> {
    fn visit_node(&mut self, node: &Node) {
        let tokens = identity_tokens(node, self.config);
        if !tokens.is_empty() {
            self.nodes.push((node.id.clone(), tokens));
        }
        walk_node(self, node);
    }
}

/// Product component references: markers in text, source and link values,
/// plus product image tracking tokens
struct ComponentCollector<'a> {
    config: &'a EngineConfig,
    skip: Option<&'a str>,
    components: Vec<String>,
    max_index: BTreeMap<String, usize>,
}

impl<'a> ComponentCollector<'a> {
    fn new(config: &'a EngineConfig, skip: Option<&'a str>) -> Self {
        Self {
            config,
            skip,
            components: Vec::new(),
            max_index: BTreeMap::new(),
        }
    }

    fn record(&mut self, component_id: &str, index: usize) {
        if !self.components.iter().any(|c| c == component_id) {
            self.components.push(component_id.to_string());
        }
        let max = self.max_index.entry(component_id.to_string()).or_insert(index);
        *max = (*max).max(index);
    }

    fn record_text(&mut self, text: &str) {
        for found in find_product_markers(text) {
            self.record(&found.component_id, found.index);
        }
    }
}

impl Visitor for ComponentCollector<'_> {
    fn visit_node(&mut self, node: &Node) {
        if self.skip == Some(node.id.as_str()) {
            return;
        }

        for token in identity_tokens(node, self.config) {
            if let TrackingToken::ProductImageSlot {
                component_id,
                index,
            } = token
            {
                self.record(&component_id, index);
            }
        }
        let config = self.config;
        for name in [&config.source_attribute, &config.link_attribute] {
            if let Some(value) = node.attributes.get(name) {
                self.record_text(value);
            }
        }
        walk_node(self, node);
    }

    fn visit_text(&mut self, text: &str) {
        self.record_text(text);
    }
}

/// Literal substring replacement over text children and selected attributes
/// of a subtree
struct ReferenceRewriter {
    attributes: Vec<String>,
    replacements: Vec<(String, String)>,
}

impl ReferenceRewriter {
    fn new(attributes: Vec<String>, replacements: Vec<(String, String)>) -> Self {
        Self {
            attributes,
            replacements,
        }
    }

    fn rewrite(&self, value: &str) -> Option<String> {
        let mut updated = value.to_string();
        for (from, to) in &self.replacements {
            updated = updated.replace(from.as_str(), to);
        }
        (updated != value).then_some(updated)
    }
}

impl VisitorMut for ReferenceRewriter {
    fn visit_node_mut(&mut self, node: &mut Node) {
        for attr in node.attributes.iter_mut() {
            if !self.attributes.contains(&attr.name) {
                continue;
            }
            if let Some(updated) = attr.value.as_deref().and_then(|v| self.rewrite(v)) {
                attr.value = Some(updated);
            }
        }
        walk_node_mut(self, node);
    }

    fn visit_text_mut(&mut self, text: &mut String) {
        if let Some(updated) = self.rewrite(text) {
            *text = updated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::ForwardTransform;
    use mailslot_parser::{parse_fragment, parse_with_ids, IdGenerator};

    struct Fixture {
        config: EngineConfig,
        ids: IdGenerator,
        markup: Markup,
    }

    impl Fixture {
        fn new(source: &str) -> Self {
            let config = EngineConfig::default();
            let mut ids = IdGenerator::new("dedup");
            let mut markup = parse_with_ids(source, &mut ids).unwrap();
            ForwardTransform::new(&config).apply(&mut markup);
            Self { config, ids, markup }
        }

        /// Append a forward-transformed block under the first element with
        /// `parent_tag` and deduplicate it
        fn insert(&mut self, parent_tag: &str, block: &str) -> (NodeId, DedupOutcome) {
            let mut node = parse_fragment(block, &mut self.ids).unwrap();
            ForwardTransform::new(&self.config).apply_node(&mut node);
            let id = node.id.clone();
            let parent = self.markup.find_by_tag(parent_tag).unwrap().id.clone();
            self.markup.insert_node(&parent, usize::MAX, node).unwrap();
            let outcome = SlotDeduplicator::new(&self.config).deduplicate(&mut self.markup, &id);
            (id, outcome)
        }

        fn tracking(&self, id: &str) -> Option<&str> {
            self.markup.find_node(id)?.attributes.get("css-class")
        }
    }

    #[test]
    fn test_second_headline_gets_first_ordinal() {
        let mut fx = Fixture::new("<mj-column><mj-text>{{content:headline}}</mj-text></mj-column>");
        let (id, outcome) = fx.insert("mj-column", "<mj-text>{{content:headline}}</mj-text>");

        assert_eq!(fx.tracking(&id), Some("content-slot--headline-1"));
        assert_eq!(
            outcome.renames,
            vec![SlotRename {
                kind: SlotKind::Content,
                from: "headline".to_string(),
                to: "headline-1".to_string(),
            }]
        );
    }

    #[test]
    fn test_third_copy_skips_taken_ordinals() {
        let mut fx = Fixture::new("<mj-column><mj-text>{{content:headline}}</mj-text></mj-column>");
        fx.insert("mj-column", "<mj-text>{{content:headline}}</mj-text>");
        let (id, _) = fx.insert("mj-column", "<mj-text>{{content:headline}}</mj-text>");
        assert_eq!(fx.tracking(&id), Some("content-slot--headline-2"));

        let mut fx = Fixture::new(r#"<mj-column><mj-image src="{{image:hero}}" /></mj-column>"#);
        fx.insert("mj-column", r#"<mj-image src="{{image:hero}}" />"#);
        let (id, _) = fx.insert("mj-column", r#"<mj-image src="{{image:hero}}" />"#);
        assert_eq!(fx.tracking(&id), Some("img-slot--hero-2"));
    }

    #[test]
    fn test_unique_insert_is_untouched() {
        let mut fx = Fixture::new("<mj-column><mj-text>{{content:headline}}</mj-text></mj-column>");
        let (id, outcome) = fx.insert("mj-column", "<mj-text>{{content:body-text}}</mj-text>");
        assert!(outcome.renames.is_empty());
        assert_eq!(fx.tracking(&id), Some("content-slot--body-text"));
    }

    #[test]
    fn test_image_count_requires_trailing_boundary() {
        // `img-slot--hero-banner` does not count towards `hero`
        let mut fx = Fixture::new(r#"<mj-column><mj-image src="{{image:hero-banner}}" /></mj-column>"#);
        let (id, outcome) = fx.insert("mj-column", r#"<mj-image src="{{image:hero}}" />"#);
        assert!(outcome.renames.is_empty());
        assert_eq!(fx.tracking(&id), Some("img-slot--hero"));
    }

    #[test]
    fn test_content_count_has_no_boundary() {
        // `content-slot--headline-x` counts towards `headline`
        let mut fx = Fixture::new("<mj-column><mj-text>{{content:headline-x}}</mj-text></mj-column>");
        let (id, _) = fx.insert("mj-column", "<mj-text>{{content:headline}}</mj-text>");
        assert_eq!(fx.tracking(&id), Some("content-slot--headline-1"));
    }

    #[test]
    fn test_rename_propagates_inside_subtree_only() {
        let mut fx = Fixture::new(
            r#"<mj-column><mj-button href="{{content:cta-text}}">{{content:cta-text}}</mj-button></mj-column><mj-hero></mj-hero>"#,
        );
        let (id, _) = fx.insert(
            "mj-hero",
            r#"<mj-button href="{{content:cta-text}}">{{content:cta-text}}</mj-button>"#,
        );

        let copy = fx.markup.find_node(&id).unwrap();
        assert_eq!(copy.attributes.get("href"), Some("{{content:cta-text-1}}"));
        assert_eq!(copy.attributes.get("css-class"), Some("content-slot--cta-text-1"));

        let original = fx.markup.find_by_tag("mj-button").unwrap();
        assert_eq!(original.attributes.get("href"), Some("{{content:cta-text}}"));
        assert_eq!(original.attributes.get("css-class"), Some("content-slot--cta-text"));
    }

    #[test]
    fn test_block_with_repeated_identity_is_made_unique() {
        let mut fx = Fixture::new("<mj-column></mj-column>");
        let (id, _) = fx.insert(
            "mj-column",
            "<mj-section><mj-text>{{content:body-text}}</mj-text><mj-text>{{content:body-text}}</mj-text></mj-section>",
        );
        let section = fx.markup.find_node(&id).unwrap();
        let classes: Vec<_> = section
            .elements()
            .map(|n| n.attributes.get("css-class").unwrap())
            .collect();
        assert_eq!(classes, vec!["content-slot--body-text", "content-slot--body-text-1"]);
    }

    #[test]
    fn test_product_component_renamed_index_kept() {
        let block = r#"<mj-column><mj-image src="{{product:spotlight:0:image}}" href="{{product:spotlight:0:url}}" /><mj-text>{{product:spotlight:0:name}}</mj-text></mj-column>"#;
        let mut fx = Fixture::new(&format!("<mj-section>{}</mj-section>", block));
        let (id, outcome) = fx.insert("mj-section", block);

        let copy = fx.markup.find_node(&id).unwrap();
        let image = copy.elements().next().unwrap();
        assert_eq!(image.attributes.get("href"), Some("{{product:spotlight-1:0:url}}"));
        assert_eq!(
            image.attributes.get("css-class"),
            Some("product-img-slot--spotlight-1--0")
        );
        assert_eq!(copy.elements().nth(1).unwrap().text_content(), "{{product:spotlight-1:0:name}}");

        assert_eq!(outcome.renames[0].kind, SlotKind::ProductComponent);
        assert_eq!(outcome.product_slots.get("spotlight"), Some(&0));
        assert_eq!(outcome.product_slots.get("spotlight-1"), Some(&0));
    }

    #[test]
    fn test_product_slots_track_max_index() {
        let fx = Fixture::new(
            "<mj-text>{{product:grid:0:name}}</mj-text><mj-text>{{product:grid:3:price}}</mj-text>",
        );
        let slots = product_slots(&fx.markup, &fx.config);
        assert_eq!(slots.get("grid"), Some(&3));
    }

    #[test]
    fn test_missing_node_is_a_no_op() {
        let mut fx = Fixture::new("<mj-column></mj-column>");
        let outcome = SlotDeduplicator::new(&fx.config).deduplicate(&mut fx.markup, "nope");
        assert!(outcome.renames.is_empty());
    }
}
