//! # Document Session
//!
//! One editable document per session, owned exclusively and mutated only
//! through this type.
//!
//! ## Lifecycle
//!
//! ```text
//! persisted markup → parse → forward + lock → edit/insert → settle → reverse → save
//! ```
//!
//! Insertions are recorded as pending and deduplicated in an explicit
//! settle phase ([`DocumentSession::flush_pending`]) once the inserted node
//! is part of the tree.

use std::collections::BTreeMap;

use mailslot_parser::visitor::{walk_node, walk_node_mut};
use mailslot_parser::{parse_with_ids, serialize, IdGenerator, Markup, Node, NodeId, Visitor, VisitorMut};

use crate::blocks::Block;
use crate::collaborators::{PreviewCompiler, ProductCatalog, TemplateStore};
use crate::config::EngineConfig;
use crate::dedup::{SlotDeduplicator, SlotRename};
use crate::drop_zone::{validate_drop, LockPolicy};
use crate::forward::ForwardTransform;
use crate::mutations::Mutation;
use crate::products::{resolve_products, ProductSelection};
use crate::reverse::ReverseTransform;
use crate::tracking::identity_tokens;
use crate::EditorError;

/// Skeleton used for a brand new template
pub const BLANK_TEMPLATE: &str = r#"<mjml><mj-body><mj-section css-class="header"><mj-column><mj-image src="{{logo}}" /></mj-column></mj-section><mj-section><mj-column><mj-text>{{content:headline}}</mj-text></mj-column></mj-section><mj-section css-class="footer"><mj-column><mj-text>{{footer}}</mj-text></mj-column></mj-section></mj-body></mjml>"#;

const UNTITLED: &str = "untitled";

/// A node the visual editor added to the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInsertedEvent {
    pub parent_id: NodeId,
    pub index: usize,
    pub node: Node,
}

impl NodeInsertedEvent {
    pub fn new(parent_id: impl Into<NodeId>, index: usize, node: Node) -> Self {
        Self {
            parent_id: parent_id.into(),
            index,
            node,
        }
    }
}

/// Result of a successful save
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub markup: String,
    /// Preview HTML, absent when the compiler failed or none was given
    pub thumbnail: Option<String>,
}

pub struct DocumentSession {
    template_id: String,
    config: EngineConfig,
    ids: IdGenerator,
    markup: Markup,
    pending: Vec<NodeId>,
    product_slots: BTreeMap<String, usize>,
    selected: Option<NodeId>,
}

impl DocumentSession {
    /// Session over the blank skeleton
    pub fn new(config: EngineConfig) -> Result<Self, EditorError> {
        Self::from_markup(UNTITLED, BLANK_TEMPLATE, config)
    }

    /// Session over persisted markup
    pub fn from_markup(template_id: &str, persisted: &str, config: EngineConfig) -> Result<Self, EditorError> {
        let mut session = Self {
            template_id: template_id.to_string(),
            ids: IdGenerator::new(template_id),
            config,
            markup: Markup::default(),
            pending: Vec::new(),
            product_slots: BTreeMap::new(),
            selected: None,
        };
        session.load(persisted)?;
        Ok(session)
    }

    /// Session over a template fetched from `store`
    pub fn open(store: &dyn TemplateStore, template_id: &str, config: EngineConfig) -> Result<Self, EditorError> {
        let persisted = store.load_template(template_id).map_err(EditorError::Load)?;
        Self::from_markup(template_id, &persisted, config)
    }

    /// Replace the document with freshly loaded persisted markup
    pub fn load(&mut self, persisted: &str) -> Result<(), EditorError> {
        let mut markup = parse_with_ids(persisted, &mut self.ids)?;
        let tagged = ForwardTransform::new(&self.config).apply(&mut markup);
        let locked = LockPolicy::new(&self.config).apply(&mut markup);

        self.product_slots = crate::dedup::product_slots(&markup, &self.config);
        self.markup = markup;
        self.pending.clear();
        self.selected = None;

        tracing::info!(
            "[DocumentSession] loaded {} ({} nodes, {} tagged, {} locked)",
            self.template_id,
            self.markup.node_count(),
            tagged,
            locked
        );
        Ok(())
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn document(&self) -> &Markup {
        &self.markup
    }

    /// The editable form, as the visual editor sees it
    pub fn editable_markup(&self) -> String {
        serialize(&self.markup)
    }

    /// Persisted form of the current document
    pub fn serialize(&self) -> String {
        ReverseTransform::new(&self.config).to_persisted(&self.markup)
    }

    /// Id of the document root (`mj-body`), where structure blocks attach
    pub fn root_id(&self) -> Option<&str> {
        self.markup
            .find_by_tag(&self.config.root_tag)
            .map(|n| n.id.as_str())
    }

    /// Instantiate a catalog block with this session's id generator
    pub fn instantiate(&mut self, block: &Block) -> Result<Node, EditorError> {
        block.instantiate(&mut self.ids, &self.config)
    }

    /// Add a node to the tree. The drop target is validated first; a
    /// rejected drop leaves the document untouched. Deduplication runs on
    /// the next [`flush_pending`](Self::flush_pending).
    pub fn insert_node(&mut self, event: NodeInsertedEvent) -> Result<NodeId, EditorError> {
        let NodeInsertedEvent {
            parent_id,
            index,
            mut node,
        } = event;

        validate_drop(&self.markup, &parent_id, &node, &self.config).map_err(EditorError::Drop)?;

        IdAssigner { ids: &mut self.ids }.visit_node_mut(&mut node);
        ForwardTransform::new(&self.config).apply_node(&mut node);
        LockPolicy::new(&self.config).apply_node(&mut node);

        let id = node.id.clone();
        self.markup
            .insert_node(&parent_id, index, node)
            .map_err(|_| EditorError::ParentNotFound(parent_id.clone()))?;
        self.pending.push(id.clone());

        tracing::debug!("[DocumentSession] inserted {} under {}", id, parent_id);
        Ok(id)
    }

    /// Settle phase: deduplicate every insertion recorded since the last
    /// flush, in insertion order
    pub fn flush_pending(&mut self) -> Vec<SlotRename> {
        let mut renames = Vec::new();
        if self.pending.is_empty() {
            return renames;
        }

        let dedup = SlotDeduplicator::new(&self.config);
        for id in std::mem::take(&mut self.pending) {
            let outcome = dedup.deduplicate(&mut self.markup, &id);
            renames.extend(outcome.renames);
            self.product_slots = outcome.product_slots;
        }
        renames
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn apply(&mut self, mutation: Mutation) -> Result<(), EditorError> {
        mutation.validate(&self.markup, &self.config)?;
        if let Mutation::MoveNode {
            node_id,
            new_parent_id,
            ..
        } = &mutation
        {
            let node = self
                .markup
                .find_node(node_id)
                .ok_or_else(|| EditorError::NodeNotFound(node_id.clone()))?;
            validate_drop(&self.markup, new_parent_id, node, &self.config).map_err(EditorError::Drop)?;
        }

        mutation.apply(&mut self.markup, &self.config)?;

        // edits can add or drop product markers too
        self.product_slots = crate::dedup::product_slots(&self.markup, &self.config);
        if self
            .selected
            .as_ref()
            .map_or(false, |id| self.markup.find_node(id).is_none())
        {
            self.selected = None;
        }
        Ok(())
    }

    /// Select a node for editing. Locked nodes cannot be selected.
    pub fn select(&mut self, node_id: &str) -> Result<(), EditorError> {
        let node = self
            .markup
            .find_node(node_id)
            .ok_or_else(|| EditorError::NodeNotFound(node_id.to_string()))?;
        if LockPolicy::new(&self.config).is_locked(node) {
            return Err(EditorError::Locked(node_id.to_string()));
        }
        self.selected = Some(node_id.to_string());
        Ok(())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Number of nodes carrying each identity token
    pub fn slot_occurrences(&self) -> BTreeMap<String, usize> {
        let mut counter = OccurrenceCounter {
            config: &self.config,
            counts: BTreeMap::new(),
        };
        counter.visit_markup(&self.markup);
        counter.counts
    }

    /// Highest product index per component, as of the last load or settle
    pub fn product_slots(&self) -> &BTreeMap<String, usize> {
        &self.product_slots
    }

    /// Replace the markers of the selected product slots with catalog values
    pub fn resolve_products(
        &mut self,
        catalog: &dyn ProductCatalog,
        selection: &ProductSelection,
    ) -> Result<usize, EditorError> {
        let products = catalog.list_catalog_products().map_err(EditorError::Catalog)?;
        resolve_products(&mut self.markup, &self.config, &products, selection)
    }

    /// Settle, serialize and persist. A preview failure only costs the
    /// thumbnail; a store failure is returned and the document is kept.
    pub fn save(
        &mut self,
        store: &mut dyn TemplateStore,
        preview: Option<&dyn PreviewCompiler>,
    ) -> Result<SaveOutcome, EditorError> {
        self.flush_pending();
        let markup = self.serialize();

        let thumbnail = preview.and_then(|compiler| match compiler.compile_to_preview_html(&markup) {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::warn!(
                    "[DocumentSession] preview for {} failed, saving without thumbnail: {}",
                    self.template_id,
                    err
                );
                None
            }
        });

        store
            .save_template(&self.template_id, &markup)
            .map_err(EditorError::Save)?;

        tracing::info!(
            "[DocumentSession] saved {} ({} bytes)",
            self.template_id,
            markup.len()
        );
        Ok(SaveOutcome { markup, thumbnail })
    }
}

/// Gives every node of an inserted subtree a fresh session id
struct IdAssigner<'a> {
    ids: &'a mut IdGenerator,
}

impl VisitorMut for IdAssigner<'_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        node.id = self.ids.new_id();
        walk_node_mut(self, node);
    }
}

struct OccurrenceCounter<'a> {
    config: &'a EngineConfig,
    counts: BTreeMap<String, usize>,
}

impl Visitor for OccurrenceCounter<'_> {
    fn visit_node(&mut self, node: &Node) {
        for token in identity_tokens(node, self.config) {
            *self.counts.entry(token.to_string()).or_insert(0) += 1;
        }
        walk_node(self, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::find_block;
    use crate::collaborators::{CollaboratorError, MemoryTemplateStore};

    struct FailingCompiler;

    impl PreviewCompiler for FailingCompiler {
        fn compile_to_preview_html(&self, _markup: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Compiler("boom".to_string()))
        }
    }

    struct FailingStore;

    impl TemplateStore for FailingStore {
        fn load_template(&self, id: &str) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::NotFound(id.to_string()))
        }

        fn save_template(&mut self, _id: &str, _markup: &str) -> Result<(), CollaboratorError> {
            Err(CollaboratorError::Unavailable("network down".to_string()))
        }
    }

    fn first_column(session: &DocumentSession) -> String {
        // second section: the first is the locked header
        let body = session.document().find_by_tag("mj-body").unwrap();
        let section = body.elements().nth(1).unwrap();
        section.elements().next().unwrap().id.clone()
    }

    #[test]
    fn test_blank_session_round_trips() {
        let session = DocumentSession::new(EngineConfig::default()).unwrap();
        assert_eq!(session.serialize(), BLANK_TEMPLATE);
        assert!(session.editable_markup().contains("img-slot--logo"));
        assert!(session.editable_markup().contains("locked-section"));
    }

    #[test]
    fn test_insert_then_flush_deduplicates() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let column = first_column(&session);
        let block = find_block("headline").unwrap();
        let node = session.instantiate(block).unwrap();

        let id = session.insert_node(NodeInsertedEvent::new(column, 99, node)).unwrap();
        assert!(session.has_pending());
        assert_eq!(session.slot_occurrences().get("content-slot--headline"), Some(&2));

        let renames = session.flush_pending();
        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].to, "headline-1");
        assert!(session.slot_occurrences().values().all(|&n| n == 1));

        let inserted = session.document().find_node(&id).unwrap();
        assert_eq!(inserted.attributes.get("css-class"), Some("content-slot--headline-1"));
        assert!(session.serialize().contains("{{content:headline-1}}"));
    }

    #[test]
    fn test_rejected_drop_leaves_document_untouched() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let before = session.editable_markup();
        let body = session.root_id().unwrap().to_string();
        let node = session.instantiate(find_block("text").unwrap()).unwrap();

        let result = session.insert_node(NodeInsertedEvent::new(body, 0, node));
        match result {
            Err(EditorError::Drop(failure)) => assert_eq!(failure.message, "needs a container"),
            other => panic!("expected drop failure, got {:?}", other.map(|_| ())),
        }
        assert_eq!(session.editable_markup(), before);
        assert!(!session.has_pending());
    }

    #[test]
    fn test_locked_header_cannot_be_selected_or_removed() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let header = session
            .document()
            .find_by_tag("mj-section")
            .unwrap()
            .id
            .clone();

        assert!(matches!(session.select(&header), Err(EditorError::Locked(_))));
        assert!(matches!(
            session.apply(Mutation::RemoveNode { node_id: header }),
            Err(EditorError::Locked(_))
        ));
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn test_save_without_thumbnail_when_preview_fails() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let mut store = MemoryTemplateStore::new();

        let outcome = session.save(&mut store, Some(&FailingCompiler as &dyn PreviewCompiler)).unwrap();
        assert_eq!(outcome.thumbnail, None);
        assert_eq!(store.get("untitled"), Some(BLANK_TEMPLATE));
    }

    #[test]
    fn test_store_failure_keeps_document() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let before = session.editable_markup();

        let result = session.save(&mut FailingStore, None);
        assert!(matches!(result, Err(EditorError::Save(_))));
        assert_eq!(session.editable_markup(), before);
    }

    #[test]
    fn test_product_slots_follow_text_edits() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let column = first_column(&session);
        let text_id = session
            .document()
            .find_node(&column)
            .unwrap()
            .elements()
            .next()
            .unwrap()
            .id
            .clone();
        assert!(session.product_slots().is_empty());

        session
            .apply(Mutation::UpdateText {
                node_id: text_id.clone(),
                content: "{{product:deals:2:name}}".to_string(),
            })
            .unwrap();
        assert_eq!(session.product_slots().get("deals"), Some(&2));

        session
            .apply(Mutation::UpdateText {
                node_id: text_id,
                content: "No products here".to_string(),
            })
            .unwrap();
        assert!(session.product_slots().is_empty());
    }

    #[test]
    fn test_product_card_drops_into_section() {
        let mut session = DocumentSession::new(EngineConfig::default()).unwrap();
        let body = session.document().find_by_tag("mj-body").unwrap();
        let section = body.elements().nth(1).unwrap().id.clone();
        let card = session.instantiate(find_block("product-card").unwrap()).unwrap();

        session.insert_node(NodeInsertedEvent::new(section, 1, card)).unwrap();
        session.flush_pending();
        assert_eq!(session.product_slots().get("product"), Some(&0));
        assert!(session
            .serialize()
            .contains("</mj-column><mj-column><mj-image src=\"{{product:product:0:image}}\""));
    }

    #[test]
    fn test_open_missing_template_fails() {
        let store = MemoryTemplateStore::new();
        let result = DocumentSession::open(&store, "nope", EngineConfig::default());
        assert!(matches!(result, Err(EditorError::Load(_))));
    }
}
