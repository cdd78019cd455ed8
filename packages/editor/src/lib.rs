//! # Mailslot Editor
//!
//! Slot transform and deduplication engine for the email layout builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup text → tree                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: DocumentSession                     │
//! │  - forward transform + reserved-region lock │
//! │  - events → dispatcher → settle (dedup)     │
//! │  - reverse transform + safety net on save   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ collaborators: store, preview, catalog      │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tracking tokens are the source of truth**: the reverse transform
//!    never reads dummy content
//! 2. **New copies get renamed**: pre-existing identities are never touched
//! 3. **Single writer**: one session owns one document; events are applied
//!    in order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mailslot_editor::{Dispatcher, DocumentSession, EngineConfig, MemoryTemplateStore};
//!
//! let mut store = MemoryTemplateStore::new().with_template("welcome", persisted);
//! let session = DocumentSession::open(&store, "welcome", EngineConfig::default())?;
//!
//! let mut dispatcher = Dispatcher::new(session);
//! dispatcher.drop_block("headline", &column_id, 0)?;
//! for notice in dispatcher.run() {
//!     println!("{:?}", notice);
//! }
//!
//! let mut session = dispatcher.into_session();
//! session.save(&mut store, None)?;
//! ```

pub mod blocks;
pub mod collaborators;
pub mod config;
pub mod dedup;
pub mod dispatcher;
pub mod drop_zone;
mod errors;
pub mod forward;
pub mod grammar;
pub mod mutations;
pub mod products;
pub mod reconstructor;
pub mod reverse;
pub mod session;
pub mod tracking;

pub use blocks::{find_block, Block, BLOCKS};
pub use collaborators::{
    CollaboratorError, CommandPreviewCompiler, FileTemplateStore, MemoryTemplateStore,
    PreviewCompiler, Product, ProductCatalog, TemplateStore,
};
pub use config::EngineConfig;
pub use dedup::{product_slots, DedupOutcome, SlotDeduplicator, SlotKind, SlotRename};
pub use dispatcher::{DragLifecycleEvent, Dispatcher, EditorEvent, Notice};
pub use drop_zone::{validate_drop, BlockClass, DragPhase, DropFailure, DropZonePolicy, LockPolicy};
pub use errors::EditorError;
pub use forward::ForwardTransform;
pub use grammar::{Marker, PlaceholderTable, ProductField, TrackingToken};
pub use mutations::Mutation;
pub use products::{resolve_products, ProductSelection, ProductSlot};
pub use reconstructor::AttributeReconstructor;
pub use reverse::{reverse_markup, ReverseTransform};
pub use session::{DocumentSession, NodeInsertedEvent, SaveOutcome, BLANK_TEMPLATE};

// Re-export the tree types callers need to build events
pub use mailslot_parser::{Markup, Node, NodeId};
