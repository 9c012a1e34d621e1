//! Seams to the platform services the tracker drives
//!
//! Surface detection, anchors and the scene graph live outside this crate.
//! These traits describe only what the tracker needs from them.

use crate::object::ObjectId;
use crate::query::{HitResult, RaycastQuery};
use crate::subscription::DeliverySink;
use glam::Mat4;

/// Detector-side half of a tracking subscription
pub trait ServiceSubscription: Send {
    /// Stop producing results. Called at most once.
    fn cancel(&mut self);
}

/// For detectors that only rely on the sink's cancellation flag
impl ServiceSubscription for () {
    fn cancel(&mut self) {}
}

/// Real-world surface detection and anchoring
pub trait SurfaceDetector {
    /// Single synchronous hit test; zero or more results
    fn raycast(&mut self, query: &RaycastQuery) -> Vec<HitResult>;

    /// Start delivering results for `query` into `sink`, from any context,
    /// zero or more times, until cancelled
    fn track(&mut self, query: RaycastQuery, sink: DeliverySink) -> Box<dyn ServiceSubscription>;

    /// Create or move the persistent anchor for an object
    fn add_or_update_anchor(&mut self, object: ObjectId, transform: Mat4);

    /// Drop the persistent anchor for an object
    fn remove_anchor(&mut self, object: ObjectId);
}

/// The renderer's scene graph
///
/// The renderer reads transforms from the tracker each frame; this trait only
/// covers membership.
pub trait SceneGraph {
    /// Add an object to the visible scene
    fn attach(&mut self, object: ObjectId, transform: Mat4);

    /// Remove an object from the visible scene
    fn detach(&mut self, object: ObjectId);
}
