//! # Event Dispatcher
//!
//! The visual editor reports what happened through typed events. The
//! dispatcher applies them to its session one at a time, in arrival order,
//! and runs the settle phase (slot deduplication) right after every
//! insertion so the next event already sees unique identities.
//!
//! ```text
//! DragLifecycle(Start) → NodeInserted → settle → DragLifecycle(Stop)
//! ```

use std::collections::VecDeque;

use mailslot_parser::NodeId;
use serde::Serialize;

use crate::blocks::find_block;
use crate::dedup::SlotRename;
use crate::drop_zone::{BlockClass, DragPhase, DropFailure, DropZonePolicy};
use crate::mutations::Mutation;
use crate::session::{DocumentSession, NodeInsertedEvent};
use crate::EditorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragLifecycleEvent {
    pub phase: DragPhase,
    pub block_class: BlockClass,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    NodeInserted(NodeInsertedEvent),
    DragLifecycle(DragLifecycleEvent),
    Mutation(Mutation),
}

/// Transient, non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Notice {
    DropFailed(DropFailure),
    SlotRenamed(SlotRename),
    Rejected { message: String },
}

pub struct Dispatcher {
    session: DocumentSession,
    queue: VecDeque<EditorEvent>,
    drop_zone: DropZonePolicy,
    inserted: Vec<NodeId>,
}

impl Dispatcher {
    pub fn new(session: DocumentSession) -> Self {
        Self {
            session,
            queue: VecDeque::new(),
            drop_zone: DropZonePolicy::new(),
            inserted: Vec::new(),
        }
    }

    pub fn session(&self) -> &DocumentSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DocumentSession {
        &mut self.session
    }

    pub fn into_session(self) -> DocumentSession {
        self.session
    }

    /// Queue an event for the next [`run`](Self::run)
    pub fn dispatch(&mut self, event: EditorEvent) {
        self.queue.push_back(event);
    }

    /// Queue a full drag of a catalog block onto `parent_id`
    pub fn drop_block(&mut self, name: &str, parent_id: &str, index: usize) -> Result<(), EditorError> {
        let block = find_block(name).ok_or_else(|| EditorError::UnknownBlock(name.to_string()))?;
        let node = self.session.instantiate(block)?;

        self.dispatch(EditorEvent::DragLifecycle(DragLifecycleEvent {
            phase: DragPhase::Start,
            block_class: block.class,
        }));
        self.dispatch(EditorEvent::NodeInserted(NodeInsertedEvent::new(
            parent_id, index, node,
        )));
        self.dispatch(EditorEvent::DragLifecycle(DragLifecycleEvent {
            phase: DragPhase::Stop,
            block_class: block.class,
        }));
        Ok(())
    }

    /// Ids of nodes inserted so far, in order
    pub fn inserted(&self) -> &[NodeId] {
        &self.inserted
    }

    /// Drain the queue. Returns the notices raised along the way.
    pub fn run(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(event) = self.queue.pop_front() {
            self.handle(event, &mut notices);
        }
        notices
    }

    fn handle(&mut self, event: EditorEvent, notices: &mut Vec<Notice>) {
        match event {
            EditorEvent::NodeInserted(inserted) => match self.session.insert_node(inserted) {
                Ok(id) => {
                    self.drop_zone.node_inserted();
                    self.inserted.push(id);
                    // settle before the next event is looked at
                    notices.extend(self.session.flush_pending().into_iter().map(Notice::SlotRenamed));
                }
                // during a drag the failure surfaces when the drag stops
                Err(EditorError::Drop(failure)) => {
                    if self.drop_zone.dragging().is_none() {
                        notices.push(Notice::DropFailed(failure));
                    }
                }
                Err(err) => notices.push(Notice::Rejected {
                    message: err.to_string(),
                }),
            },

            EditorEvent::DragLifecycle(DragLifecycleEvent {
                phase: DragPhase::Start,
                block_class,
            }) => self.drop_zone.drag_start(block_class),

            EditorEvent::DragLifecycle(DragLifecycleEvent {
                phase: DragPhase::Stop,
                ..
            }) => {
                if let Some(failure) = self.drop_zone.drag_stop() {
                    tracing::debug!("[Dispatcher] drop failed: {}", failure);
                    notices.push(Notice::DropFailed(failure));
                }
            }

            EditorEvent::Mutation(mutation) => {
                if let Err(err) = self.session.apply(mutation) {
                    notices.push(Notice::Rejected {
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}
