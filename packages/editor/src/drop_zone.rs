//! # Drop-Zone and Locking Policy
//!
//! Blocks are either `content` (dropped inside a container) or `structure`
//! (attached directly under the document root). A drag that stops without an
//! accepted insertion is reported as a failure naming what the block needed.
//!
//! Reserved regions (header/footer) are locked on load and on insertion.
//! Locking is one-way and cascades to every descendant.

use mailslot_parser::visitor::walk_node_mut;
use mailslot_parser::{Markup, Node, VisitorMut};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::grammar::{class_tokens, TrackingToken};
use crate::tracking::{add_token, has_token, node_tokens};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockClass {
    /// Must be dropped inside a container node
    Content,
    /// Must be dropped at the document's top level
    Structure,
}

impl BlockClass {
    /// Classify an element by its tag
    pub fn of(node: &Node, config: &EngineConfig) -> Self {
        if config.is_structure_tag(&node.tag) {
            Self::Structure
        } else {
            Self::Content
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            Self::Content => "needs a container",
            Self::Structure => "can only attach at top level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragPhase {
    Start,
    Stop,
}

/// A rejected or missing drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropFailure {
    pub block_class: BlockClass,
    pub message: String,
}

impl DropFailure {
    pub fn new(block_class: BlockClass) -> Self {
        Self {
            block_class,
            message: block_class.failure_message().to_string(),
        }
    }
}

impl std::fmt::Display for DropFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Drag state. Only the class of the block currently being dragged is kept.
#[derive(Debug, Default)]
pub struct DropZonePolicy {
    dragging: Option<BlockClass>,
    inserted: bool,
}

impl DropZonePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drag_start(&mut self, block_class: BlockClass) {
        self.dragging = Some(block_class);
        self.inserted = false;
    }

    /// Record an accepted insertion for the current drag
    pub fn node_inserted(&mut self) {
        self.inserted = true;
    }

    /// End the drag. Fails when nothing was inserted since `drag_start`.
    pub fn drag_stop(&mut self) -> Option<DropFailure> {
        let dragging = self.dragging.take()?;
        let inserted = std::mem::take(&mut self.inserted);
        (!inserted).then(|| DropFailure::new(dragging))
    }

    pub fn dragging(&self) -> Option<BlockClass> {
        self.dragging
    }
}

/// Check that `node` may be inserted under `parent_id`. Content blocks
/// rooted at a column go into a column container, other content blocks
/// into a container, structure blocks into the document root.
pub fn validate_drop(
    markup: &Markup,
    parent_id: &str,
    node: &Node,
    config: &EngineConfig,
) -> Result<(), DropFailure> {
    let block_class = BlockClass::of(node, config);
    let Some(parent) = markup.find_node(parent_id) else {
        return Err(DropFailure::new(block_class));
    };
    let accepted = match block_class {
        BlockClass::Content if config.is_column_tag(&node.tag) => {
            config.is_column_container_tag(&parent.tag)
        }
        BlockClass::Content => config.is_container_tag(&parent.tag),
        BlockClass::Structure => parent.tag == config.root_tag,
    };
    if accepted {
        Ok(())
    } else {
        Err(DropFailure::new(block_class))
    }
}

/// Reserved-region lock
pub struct LockPolicy<'a> {
    config: &'a EngineConfig,
}

impl<'a> LockPolicy<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Whether the node's tracking attribute names a reserved region, either
    /// as a plain class or as a content slot identity
    pub fn is_reserved(&self, node: &Node) -> bool {
        let Some(value) = node.attributes.get(&self.config.tracking_attribute) else {
            return false;
        };
        if class_tokens(value).any(|t| self.config.is_reserved_region(t)) {
            return true;
        }
        node_tokens(node, self.config).iter().any(|token| {
            matches!(token, TrackingToken::ContentSlot(id) if self.config.is_reserved_region(id))
        })
    }

    pub fn is_locked(&self, node: &Node) -> bool {
        has_token(node, self.config, &TrackingToken::LockedSection)
    }

    /// Lock every reserved region in the document. Returns the number of
    /// nodes newly locked.
    pub fn apply(&self, markup: &mut Markup) -> usize {
        let mut pass = LockPass {
            policy: self,
            locked: 0,
        };
        pass.visit_markup_mut(markup);
        pass.locked
    }

    /// Lock reserved regions within a detached subtree
    pub fn apply_node(&self, node: &mut Node) -> usize {
        let mut pass = LockPass {
            policy: self,
            locked: 0,
        };
        pass.visit_node_mut(node);
        pass.locked
    }

    fn lock_subtree(&self, node: &mut Node) -> usize {
        let mut locked = 0;
        if !self.is_locked(node) {
            add_token(node, self.config, &TrackingToken::LockedSection);
            locked += 1;
        }
        for child in node.children.iter_mut().filter_map(|c| c.as_element_mut()) {
            locked += self.lock_subtree(child);
        }
        locked
    }
}

struct LockPass<'p, 'a> {
    policy: &'p LockPolicy<'a>,
    locked: usize,
}

impl VisitorMut for LockPass<'_, '_> {
    fn visit_node_mut(&mut self, node: &mut Node) {
        if self.policy.is_reserved(node) {
            self.locked += self.policy.lock_subtree(node);
            return;
        }
        walk_node_mut(self, node);
    }
}
