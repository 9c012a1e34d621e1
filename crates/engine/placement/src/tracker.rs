//! Pose tracker
//!
//! Owns every placed object and is the only writer of their transforms.
//! It lives on the render context: all mutation goes through `&mut self`,
//! while other contexts reach it only through [`DeliverySink`] and
//! [`PoseCommandSender`], which enqueue work for [`PoseTracker::pump`].

use crate::command::{PoseCommand, PoseCommandSender};
use crate::config::TrackingConfig;
use crate::error::{PlacementError, PlacementResult, PoseError, PoseResult};
use crate::object::{ObjectId, Placement, TrackingStatus, VirtualObject};
use crate::pose;
use crate::query::{HitResult, RaycastQuery};
use crate::service::{SceneGraph, SurfaceDetector};
use crate::subscription::{Delivery, DeliverySink, Message, SubscriptionId, TrackingHandle};
use glam::Mat4;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// What a single `pump` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PumpStats {
    /// Deliveries whose best result was applied
    pub applied: usize,
    /// Deliveries with no usable result (pose held)
    pub empty: usize,
    /// Deliveries from cancelled or superseded subscriptions
    pub stale: usize,
    /// Commands executed
    pub commands: usize,
}

impl PumpStats {
    pub fn total(&self) -> usize {
        self.applied + self.empty + self.stale + self.commands
    }
}

/// Keeps placed objects glued to the surfaces they were placed on
pub struct PoseTracker {
    config: TrackingConfig,
    objects: BTreeMap<ObjectId, VirtualObject>,
    next_id: u64,
    tx: UnboundedSender<Message>,
    rx: UnboundedReceiver<Message>,
}

impl PoseTracker {
    pub fn new(config: TrackingConfig) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            config,
            objects: BTreeMap::new(),
            next_id: 1,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Handle for queueing commands from other contexts
    pub fn commands(&self) -> PoseCommandSender {
        PoseCommandSender::new(self.tx.clone())
    }

    /// Take ownership of a new object and assign its id
    pub fn insert(&mut self, mut object: VirtualObject) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        object.id = id;
        tracing::debug!(object = %id, name = %object.name, "object registered");
        self.objects.insert(id, object);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&VirtualObject> {
        self.objects.get(&id)
    }

    pub fn transform(&self, id: ObjectId) -> Option<Mat4> {
        self.objects.get(&id).map(|o| o.transform)
    }

    pub fn objects(&self) -> impl Iterator<Item = &VirtualObject> {
        self.objects.values()
    }

    /// Transforms the renderer should draw this frame
    pub fn visible_transforms(&self) -> impl Iterator<Item = (ObjectId, Mat4)> + '_ {
        self.objects
            .values()
            .filter(|o| o.attached && !o.is_hidden)
            .map(|o| (o.id, o.transform))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Mark an object as being dragged (or not) by the interaction service
    pub fn set_dragging(&mut self, id: ObjectId, dragging: bool) {
        match self.objects.get_mut(&id) {
            Some(obj) => obj.is_being_dragged = dragging,
            None => tracing::warn!(object = %id, "drag state for unknown object"),
        }
    }

    /// Place an object and start following its surface
    ///
    /// Without a query there is nothing to place against: the object is
    /// deselected and removed. Otherwise tracking starts, the object becomes
    /// the single selection, and it is shown.
    pub fn place<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        id: ObjectId,
        query: Option<RaycastQuery>,
        initial: Option<HitResult>,
        detector: &mut D,
        scene: &mut S,
    ) -> PlacementResult<SubscriptionId> {
        if !self.objects.contains_key(&id) {
            return Err(PlacementError::UnknownObject(id));
        }

        let Some(query) = query else {
            tracing::warn!(object = %id, "cannot place object, try moving left or right");
            self.deselect(id, detector, scene);
            return Err(PlacementError::CannotPlace(id));
        };

        let subscription = self
            .begin_tracking(id, query, initial, detector, scene)
            .ok_or(PlacementError::UnknownObject(id))?;

        for obj in self.objects.values_mut() {
            obj.is_selected = obj.id == id;
        }
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.is_hidden = false;
            tracing::info!(object = %id, name = %obj.name, "object placed");
        }

        Ok(subscription)
    }

    /// Start a tracking subscription for an object
    ///
    /// An initial result, if given, is applied directly. Any earlier
    /// subscription for the object is cancelled and whatever it still has in
    /// flight will be discarded. Returns `None` for an unknown object.
    pub fn begin_tracking<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        id: ObjectId,
        query: RaycastQuery,
        initial: Option<HitResult>,
        detector: &mut D,
        scene: &mut S,
    ) -> Option<SubscriptionId> {
        let Some(obj) = self.objects.get_mut(&id) else {
            tracing::warn!(object = %id, "tracking requested for unknown object");
            return None;
        };

        if obj.tracking.is_some() {
            tracing::debug!(object = %id, generation = obj.generation.0, "superseding subscription");
        }
        obj.stop_tracking();

        if let Some(hit) = initial {
            obj.transform = hit.world_transform;
            obj.placement = Placement::Placed;
            bind_to_scene(obj, detector, scene);
        }

        obj.generation = obj.generation.next();
        let subscription = SubscriptionId {
            object: id,
            generation: obj.generation,
        };

        let cancelled = Arc::new(AtomicBool::new(false));
        let sink = DeliverySink::new(subscription, cancelled.clone(), self.tx.clone());
        let service = detector.track(query, sink);

        obj.tracking = Some(TrackingHandle::new(subscription, cancelled, service));
        obj.tracked_query = Some(query);
        obj.status = if initial.is_some() {
            TrackingStatus::Tracking
        } else {
            TrackingStatus::Pending
        };

        tracing::debug!(
            object = %id,
            generation = subscription.generation.0,
            initial = initial.is_some(),
            "tracking started"
        );
        Some(subscription)
    }

    /// Cancel an object's subscription but keep the object and its pose
    pub fn stop_tracking(&mut self, id: ObjectId) {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.stop_tracking();
                tracing::debug!(object = %id, "tracking stopped");
            }
            None => tracing::warn!(object = %id, "stop requested for unknown object"),
        }
    }

    /// Run one synchronous hit test and apply the nearest accepted result
    ///
    /// With no result the transform is left as it is.
    pub fn update_once<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        id: ObjectId,
        query: &RaycastQuery,
        detector: &mut D,
        scene: &mut S,
    ) {
        let smoothing = self.config.orientation_smoothing;
        let Some(obj) = self.objects.get_mut(&id) else {
            tracing::warn!(object = %id, "update requested for unknown object");
            return;
        };

        let results = query.filter(detector.raycast(query));
        match results.first() {
            Some(hit) => apply_hit(obj, hit, smoothing, detector, scene),
            None => tracing::debug!(object = %id, "{}, keeping last pose", PoseError::NoHitResult),
        }
    }

    /// Move an object to `height` on the up axis
    ///
    /// `height` is the current reference height, if one is known. Only the
    /// vertical translation changes.
    pub fn set_height(&mut self, id: ObjectId, height: Option<f32>) {
        match self.try_set_height(id, height) {
            Ok(Some(transform)) => {
                tracing::debug!(object = %id, y = transform.w_axis.y, "height set")
            }
            Ok(None) => tracing::warn!(object = %id, "height change for unknown object"),
            Err(e) => tracing::warn!(object = %id, "height unchanged: {e}"),
        }
    }

    fn try_set_height(&mut self, id: ObjectId, height: Option<f32>) -> PoseResult<Option<Mat4>> {
        let height = height
            .filter(|h| h.is_finite())
            .ok_or(PoseError::MissingReferenceHeight)?;
        let Some(obj) = self.objects.get_mut(&id) else {
            return Ok(None);
        };
        if !obj.is_placed() {
            return Err(PoseError::DegenerateTransform(id));
        }

        obj.transform = pose::with_height(&obj.transform, height);
        Ok(Some(obj.transform))
    }

    /// Rescale an object so its principal axis has length `scale`
    ///
    /// Orientation and position are kept. Unplaced objects are left alone.
    pub fn set_uniform_scale(&mut self, id: ObjectId, scale: f32) {
        match self.try_set_uniform_scale(id, scale) {
            Ok(Some(_)) => tracing::debug!(object = %id, scale, "scale set"),
            Ok(None) => tracing::warn!(object = %id, "scale change for unknown object"),
            Err(e) => tracing::warn!(object = %id, scale, "scale unchanged: {e}"),
        }
    }

    fn try_set_uniform_scale(&mut self, id: ObjectId, scale: f32) -> PoseResult<Option<Mat4>> {
        let Some(obj) = self.objects.get_mut(&id) else {
            return Ok(None);
        };
        if !obj.is_placed() {
            return Err(PoseError::DegenerateTransform(id));
        }

        obj.transform =
            pose::rescaled(&obj.transform, scale).ok_or(PoseError::DegenerateTransform(id))?;
        Ok(Some(obj.transform))
    }

    /// Stop tracking an object and remove it from the scene and the tracker
    pub fn deselect<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        id: ObjectId,
        detector: &mut D,
        scene: &mut S,
    ) -> Option<VirtualObject> {
        let Some(mut obj) = self.objects.remove(&id) else {
            tracing::warn!(object = %id, "deselect of unknown object");
            return None;
        };

        obj.stop_tracking();
        if obj.attached {
            scene.detach(id);
            obj.attached = false;
        }
        if obj.anchor_bound {
            detector.remove_anchor(id);
            obj.anchor_bound = false;
        }
        obj.is_selected = false;
        obj.is_being_dragged = false;

        tracing::info!(object = %id, name = %obj.name, "object deselected");
        Some(obj)
    }

    /// Session reset: drop every object
    pub fn reset<D: SurfaceDetector, S: SceneGraph>(&mut self, detector: &mut D, scene: &mut S) {
        let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        for id in ids {
            self.deselect(id, detector, scene);
        }
    }

    /// Apply queued deliveries and commands in arrival order
    ///
    /// Call once per frame on the render context.
    pub fn pump<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        detector: &mut D,
        scene: &mut S,
    ) -> PumpStats {
        let limit = self.config.max_deliveries_per_pump.unwrap_or(usize::MAX);
        let mut stats = PumpStats::default();

        while stats.total() < limit {
            let Ok(message) = self.rx.try_recv() else {
                break;
            };
            match message {
                Message::Delivery(delivery) => {
                    self.apply_delivery(delivery, detector, scene, &mut stats)
                }
                Message::Command(command) => {
                    stats.commands += 1;
                    self.execute(command, detector, scene);
                }
            }
        }

        if stats.total() > 0 {
            tracing::trace!(?stats, "pump");
        }
        stats
    }

    fn apply_delivery<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        delivery: Delivery,
        detector: &mut D,
        scene: &mut S,
        stats: &mut PumpStats,
    ) {
        let smoothing = self.config.orientation_smoothing;
        let lost_after = self.config.lost_after_empty_results;

        let Some(obj) = self.objects.get_mut(&delivery.object) else {
            stats.stale += 1;
            return;
        };
        if obj.generation != delivery.generation || !obj.is_tracking() {
            tracing::trace!(
                object = %delivery.object,
                generation = delivery.generation.0,
                current = obj.generation.0,
                "dropping stale delivery"
            );
            stats.stale += 1;
            return;
        }

        let results = match obj.tracked_query {
            Some(query) => query.filter(delivery.results),
            None => delivery.results,
        };

        let was_lost = matches!(obj.status, TrackingStatus::Lost { .. });
        obj.note_delivery(!results.is_empty(), lost_after);

        match results.first() {
            Some(hit) => {
                if was_lost {
                    tracing::info!(object = %obj.id, "surface tracking recovered");
                }
                apply_hit(obj, hit, smoothing, detector, scene);
                stats.applied += 1;
            }
            None => {
                if !was_lost && matches!(obj.status, TrackingStatus::Lost { .. }) {
                    tracing::info!(object = %obj.id, "surface tracking lost, holding last pose");
                }
                stats.empty += 1;
            }
        }
    }

    fn execute<D: SurfaceDetector, S: SceneGraph>(
        &mut self,
        command: PoseCommand,
        detector: &mut D,
        scene: &mut S,
    ) {
        match command {
            PoseCommand::BeginDrag(id) => self.set_dragging(id, true),
            PoseCommand::EndDrag(id) => self.set_dragging(id, false),
            PoseCommand::SetHeight { object, height } => self.set_height(object, height),
            PoseCommand::SetUniformScale { object, scale } => self.set_uniform_scale(object, scale),
            PoseCommand::UpdateOnce { object, query } => {
                self.update_once(object, &query, detector, scene)
            }
            PoseCommand::Deselect(id) => {
                self.deselect(id, detector, scene);
            }
        }
    }
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(TrackingConfig::default())
    }
}

/// Apply a hit from a refinement or a subscription
///
/// Dragged, unconstrained objects take the new position directly but only
/// move part of the way toward the new orientation; everything else snaps.
fn apply_hit<D: SurfaceDetector, S: SceneGraph>(
    obj: &mut VirtualObject,
    hit: &HitResult,
    smoothing: f32,
    detector: &mut D,
    scene: &mut S,
) {
    if obj.is_placed() && obj.wants_smoothing() {
        obj.transform = pose::smooth_toward(&obj.transform, &hit.world_transform, smoothing);
    } else {
        obj.transform = hit.world_transform;
    }
    obj.placement = Placement::Placed;
    bind_to_scene(obj, detector, scene);
}

/// First result for a parent-less object adds it to the scene and anchors it
fn bind_to_scene<D: SurfaceDetector, S: SceneGraph>(
    obj: &mut VirtualObject,
    detector: &mut D,
    scene: &mut S,
) {
    if !obj.attached {
        scene.attach(obj.id, obj.transform);
        obj.attached = true;
        obj.should_update_anchor = true;
    }

    if obj.should_update_anchor {
        obj.should_update_anchor = false;
        detector.add_or_update_anchor(obj.id, obj.transform);
        obj.anchor_bound = true;
    }
}
