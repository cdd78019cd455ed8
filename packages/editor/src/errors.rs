//! Error types for the editor

use thiserror::Error;

use crate::collaborators::CollaboratorError;
use crate::drop_zone::DropFailure;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Parse error: {0}")]
    Parse(#[from] mailslot_parser::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Node {0} is locked")]
    Locked(String),

    #[error("Node is not a text node: {0}")]
    NotText(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Drop rejected: {0}")]
    Drop(DropFailure),

    #[error("Unknown block: {0}")]
    UnknownBlock(String),

    #[error("Unknown product {product_id} selected for {component_id}:{index}")]
    UnknownProduct {
        component_id: String,
        index: usize,
        product_id: String,
    },

    #[error("Catalog unavailable: {0}")]
    Catalog(CollaboratorError),

    #[error("Save failed: {0}")]
    Save(CollaboratorError),

    #[error("Load failed: {0}")]
    Load(CollaboratorError),
}
