//! Mutations requested from outside the render context
//!
//! Gesture handlers, UI controls and anything else off the render thread
//! send [`PoseCommand`]s instead of touching objects. Commands share the
//! delivery queue, so they interleave with tracking results in arrival order
//! and are applied by [`PoseTracker::pump`](crate::PoseTracker::pump).

use crate::object::ObjectId;
use crate::query::RaycastQuery;
use crate::subscription::Message;
use tokio::sync::mpsc::UnboundedSender;

/// A queued transform or interaction change
#[derive(Debug, Clone, PartialEq)]
pub enum PoseCommand {
    /// The interaction service started dragging an object
    BeginDrag(ObjectId),
    /// The drag ended
    EndDrag(ObjectId),
    /// Move the object to a new vertical position
    SetHeight {
        object: ObjectId,
        height: Option<f32>,
    },
    /// Rescale the object so its principal axis has this length
    SetUniformScale { object: ObjectId, scale: f32 },
    /// Run a single hit test and apply the best result
    UpdateOnce {
        object: ObjectId,
        query: RaycastQuery,
    },
    /// Stop tracking and remove the object
    Deselect(ObjectId),
}

impl PoseCommand {
    pub fn object(&self) -> ObjectId {
        match self {
            PoseCommand::BeginDrag(id) | PoseCommand::EndDrag(id) | PoseCommand::Deselect(id) => {
                *id
            }
            PoseCommand::SetHeight { object, .. }
            | PoseCommand::SetUniformScale { object, .. }
            | PoseCommand::UpdateOnce { object, .. } => *object,
        }
    }
}

/// Cloneable, thread-safe handle for queueing commands
#[derive(Debug, Clone)]
pub struct PoseCommandSender {
    tx: UnboundedSender<Message>,
}

impl PoseCommandSender {
    pub(crate) fn new(tx: UnboundedSender<Message>) -> Self {
        Self { tx }
    }

    /// Queue a command; returns `false` if the tracker has been dropped
    pub fn send(&self, command: PoseCommand) -> bool {
        self.tx.send(Message::Command(command)).is_ok()
    }

    pub fn begin_drag(&self, object: ObjectId) -> bool {
        self.send(PoseCommand::BeginDrag(object))
    }

    pub fn end_drag(&self, object: ObjectId) -> bool {
        self.send(PoseCommand::EndDrag(object))
    }

    pub fn set_height(&self, object: ObjectId, height: Option<f32>) -> bool {
        self.send(PoseCommand::SetHeight { object, height })
    }

    pub fn set_uniform_scale(&self, object: ObjectId, scale: f32) -> bool {
        self.send(PoseCommand::SetUniformScale { object, scale })
    }

    pub fn update_once(&self, object: ObjectId, query: RaycastQuery) -> bool {
        self.send(PoseCommand::UpdateOnce { object, query })
    }

    pub fn deselect(&self, object: ObjectId) -> bool {
        self.send(PoseCommand::Deselect(object))
    }
}
