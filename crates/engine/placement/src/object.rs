//! Placeable virtual objects

use crate::query::{Alignment, RaycastQuery};
use crate::subscription::{Generation, TrackingHandle};
use glam::Mat4;
use std::fmt;

/// Opaque identifier of a virtual object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether the object has ever received a world pose
///
/// Kept separately from the transform so an object sitting exactly at the
/// origin is not mistaken for one that was never placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Unplaced,
    Placed,
}

/// How well the surface under an object is currently tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingStatus {
    /// No subscription
    #[default]
    Idle,
    /// Subscribed, nothing delivered yet
    Pending,
    /// Last delivery carried at least one result
    Tracking,
    /// Recent deliveries were empty; the last good pose is held
    Occluded { empty_streak: u32 },
    /// Empty for longer than the configured threshold; the pose is still held
    Lost { empty_streak: u32 },
}

/// A placeable entity whose pose follows a detected surface
#[derive(Debug)]
pub struct VirtualObject {
    pub(crate) id: ObjectId,
    /// Display name (usually the imported model's file stem)
    pub name: String,
    pub(crate) transform: Mat4,
    pub(crate) placement: Placement,
    /// Surfaces this object may attach to
    pub allowed_alignment: Alignment,
    pub(crate) tracked_query: Option<RaycastQuery>,
    pub(crate) tracking: Option<TrackingHandle>,
    pub(crate) generation: Generation,
    pub(crate) anchor_bound: bool,
    pub(crate) should_update_anchor: bool,
    pub(crate) attached: bool,
    pub(crate) is_selected: bool,
    pub(crate) is_being_dragged: bool,
    pub(crate) is_hidden: bool,
    pub(crate) status: TrackingStatus,
}

impl VirtualObject {
    /// Create an unplaced, hidden object
    ///
    /// The id is assigned when the object is handed to the tracker.
    pub fn new(name: impl Into<String>, allowed_alignment: Alignment) -> Self {
        Self {
            id: ObjectId(0),
            name: name.into(),
            transform: Mat4::IDENTITY,
            placement: Placement::Unplaced,
            allowed_alignment,
            tracked_query: None,
            tracking: None,
            generation: Generation::default(),
            anchor_bound: false,
            should_update_anchor: false,
            attached: false,
            is_selected: false,
            is_being_dragged: false,
            is_hidden: true,
            status: TrackingStatus::Idle,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Current world transform, always fully formed
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn is_placed(&self) -> bool {
        self.placement == Placement::Placed
    }

    /// Query of the live tracking subscription, if any
    pub fn tracked_query(&self) -> Option<&RaycastQuery> {
        self.tracked_query.as_ref()
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking.as_ref().is_some_and(|h| !h.is_cancelled())
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn anchor_bound(&self) -> bool {
        self.anchor_bound
    }

    /// Whether the object has been added to the scene graph
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn is_being_dragged(&self) -> bool {
        self.is_being_dragged
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    /// Drag updates of unconstrained objects get orientation smoothing
    pub(crate) fn wants_smoothing(&self) -> bool {
        self.is_being_dragged && self.allowed_alignment == Alignment::Any
    }

    /// Cancel the live subscription and forget its query
    pub(crate) fn stop_tracking(&mut self) {
        if let Some(mut handle) = self.tracking.take() {
            handle.cancel();
        }
        self.tracked_query = None;
        self.status = TrackingStatus::Idle;
    }

    /// Record a delivery outcome for staleness reporting
    pub(crate) fn note_delivery(&mut self, had_results: bool, lost_after: Option<u32>) {
        if had_results {
            self.status = TrackingStatus::Tracking;
            return;
        }

        let empty_streak = match self.status {
            TrackingStatus::Occluded { empty_streak } | TrackingStatus::Lost { empty_streak } => {
                empty_streak.saturating_add(1)
            }
            _ => 1,
        };

        self.status = match lost_after {
            Some(limit) if empty_streak >= limit => TrackingStatus::Lost { empty_streak },
            _ => TrackingStatus::Occluded { empty_streak },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_object_is_unplaced_and_hidden() {
        let obj = VirtualObject::new("chair", Alignment::Horizontal);
        assert_eq!(obj.transform(), Mat4::IDENTITY);
        assert!(!obj.is_placed());
        assert!(obj.is_hidden());
        assert!(!obj.is_tracking());
        assert!(!obj.is_attached());
        assert_eq!(obj.status(), TrackingStatus::Idle);
    }

    #[test]
    fn smoothing_only_for_unconstrained_drags() {
        let mut obj = VirtualObject::new("lamp", Alignment::Any);
        assert!(!obj.wants_smoothing());
        obj.is_being_dragged = true;
        assert!(obj.wants_smoothing());

        obj.allowed_alignment = Alignment::Horizontal;
        assert!(!obj.wants_smoothing());
    }

    #[test]
    fn empty_streak_escalates_to_lost() {
        let mut obj = VirtualObject::new("vase", Alignment::Any);
        obj.note_delivery(false, Some(3));
        assert_eq!(obj.status(), TrackingStatus::Occluded { empty_streak: 1 });
        obj.note_delivery(false, Some(3));
        obj.note_delivery(false, Some(3));
        assert_eq!(obj.status(), TrackingStatus::Lost { empty_streak: 3 });

        obj.note_delivery(true, Some(3));
        assert_eq!(obj.status(), TrackingStatus::Tracking);
    }

    #[test]
    fn no_threshold_stays_occluded() {
        let mut obj = VirtualObject::new("vase", Alignment::Any);
        for _ in 0..100 {
            obj.note_delivery(false, None);
        }
        assert_eq!(obj.status(), TrackingStatus::Occluded { empty_streak: 100 });
    }

    #[test]
    fn display_id() {
        assert_eq!(ObjectId(7).to_string(), "#7");
    }
}
