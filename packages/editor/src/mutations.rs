//! # Document Mutations
//!
//! Semantic edits the visual editor sends once a document is loaded.
//!
//! ## Mutation Semantics
//!
//! ### UpdateText
//! - Atomic replacement of a text/button node's content
//! - The node keeps its tracking tokens, so a content slot stays a slot
//!
//! ### MoveNode
//! - Atomic relocation to a new parent
//! - Fails if the parent is missing or the move would create a cycle
//!
//! ### RemoveNode
//! - Removes the node and all descendants
//!
//! Locked nodes (reserved regions) reject every mutation.

use mailslot_parser::{Child, Markup};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::drop_zone::LockPolicy;
use crate::EditorError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Replace the content of a text/button node
    UpdateText { node_id: String, content: String },

    /// Set an attribute value
    SetAttribute {
        node_id: String,
        name: String,
        value: String,
    },

    /// Remove a node from the tree
    RemoveNode { node_id: String },

    /// Move a node to a new parent at index
    MoveNode {
        node_id: String,
        new_parent_id: String,
        index: usize,
    },
}

impl Mutation {
    pub fn node_id(&self) -> &str {
        match self {
            Mutation::UpdateText { node_id, .. }
            | Mutation::SetAttribute { node_id, .. }
            | Mutation::RemoveNode { node_id }
            | Mutation::MoveNode { node_id, .. } => node_id,
        }
    }

    /// Apply mutation to the document with validation
    pub fn apply(&self, markup: &mut Markup, config: &EngineConfig) -> Result<(), EditorError> {
        self.validate(markup, config)?;

        match self {
            Mutation::UpdateText { node_id, content } => {
                let node = markup
                    .find_node_mut(node_id)
                    .ok_or_else(|| EditorError::NodeNotFound(node_id.clone()))?;
                node.children = vec![Child::text(content.as_str())];
                Ok(())
            }

            Mutation::SetAttribute {
                node_id,
                name,
                value,
            } => {
                let node = markup
                    .find_node_mut(node_id)
                    .ok_or_else(|| EditorError::NodeNotFound(node_id.clone()))?;
                node.attributes.set(name.as_str(), value.as_str());
                Ok(())
            }

            Mutation::RemoveNode { node_id } => {
                markup
                    .remove_node(node_id)
                    .ok_or_else(|| EditorError::NodeNotFound(node_id.clone()))?;
                Ok(())
            }

            Mutation::MoveNode {
                node_id,
                new_parent_id,
                index,
            } => {
                let node = markup
                    .remove_node(node_id)
                    .ok_or_else(|| EditorError::NodeNotFound(node_id.clone()))?;
                markup
                    .insert_node(new_parent_id, *index, node)
                    .map_err(|_| EditorError::ParentNotFound(new_parent_id.clone()))
            }
        }
    }

    /// Validate without applying
    pub fn validate(&self, markup: &Markup, config: &EngineConfig) -> Result<(), EditorError> {
        let node_id = self.node_id();
        let node = markup
            .find_node(node_id)
            .ok_or_else(|| EditorError::NodeNotFound(node_id.to_string()))?;

        if LockPolicy::new(config).is_locked(node) {
            return Err(EditorError::Locked(node_id.to_string()));
        }

        match self {
            Mutation::UpdateText { .. } => {
                if config.is_text_tag(&node.tag) {
                    Ok(())
                } else {
                    Err(EditorError::NotText(node_id.to_string()))
                }
            }

            Mutation::MoveNode { new_parent_id, .. } => {
                markup
                    .find_node(new_parent_id)
                    .ok_or_else(|| EditorError::ParentNotFound(new_parent_id.clone()))?;

                if new_parent_id == node_id || node.find(new_parent_id).is_some() {
                    return Err(EditorError::CycleDetected);
                }
                Ok(())
            }

            Mutation::SetAttribute { .. } | Mutation::RemoveNode { .. } => Ok(()),
        }
    }
}
