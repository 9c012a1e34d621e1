//! Simulated AR session: one horizontal plane with noisy normals

use glam::{Mat4, Quat, Vec3};
use parking_lot::RwLock;
use placement::{
    DeliverySink, HitResult, ObjectId, RaycastQuery, ServiceSubscription, SurfaceAlignment,
    SurfaceDetector,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Mutable state of the simulated world, shared with delivery tasks
pub struct SurfaceState {
    /// Height of the detected plane
    pub height: f32,
    /// While set, every query comes back empty
    pub occluded: bool,
    /// Maximum tilt of the reported surface normal, in degrees
    pub jitter_deg: f32,
    rng: StdRng,
}

impl SurfaceState {
    pub fn shared(height: f32, jitter_deg: f32, seed: u64) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self {
            height,
            occluded: false,
            jitter_deg,
            rng: StdRng::seed_from_u64(seed),
        }))
    }

    /// Intersect a query with the plane
    pub fn hit(&mut self, query: &RaycastQuery) -> Vec<HitResult> {
        if self.occluded || !query.target.accepts(SurfaceAlignment::Horizontal) {
            return Vec::new();
        }

        let Some((position, distance)) = raycast_plane(query, self.height) else {
            return Vec::new();
        };

        let normal = self.noisy_normal();
        let rotation = Quat::from_rotation_arc(Vec3::Y, normal);
        vec![HitResult::new(
            Mat4::from_rotation_translation(rotation, position),
            SurfaceAlignment::Horizontal,
            distance,
        )]
    }

    fn noisy_normal(&mut self) -> Vec3 {
        if self.jitter_deg <= 0.0 {
            return Vec3::Y;
        }
        let max = self.jitter_deg.to_radians();
        let tilt_x = self.rng.random_range(-max..max);
        let tilt_z = self.rng.random_range(-max..max);
        (Quat::from_rotation_x(tilt_x) * Quat::from_rotation_z(tilt_z) * Vec3::Y).normalize()
    }
}

/// Ray/plane intersection for a horizontal plane at `height`
fn raycast_plane(query: &RaycastQuery, height: f32) -> Option<(Vec3, f32)> {
    let denom = Vec3::Y.dot(query.direction);

    // Ray parallel to plane
    if denom.abs() < 1e-6 {
        return None;
    }

    let t = (height - query.origin.y) / denom;

    // Intersection behind the ray origin
    if t < 0.0 {
        return None;
    }

    Some((query.point_at(t), t))
}

struct TaskSubscription(JoinHandle<()>);

impl ServiceSubscription for TaskSubscription {
    fn cancel(&mut self) {
        self.0.abort();
    }
}

/// Surface detector backed by [`SurfaceState`]
///
/// Each tracking subscription runs as its own tokio task and delivers from
/// the runtime's worker threads, like a platform tracking service would.
pub struct SimulatedSession {
    surface: Arc<RwLock<SurfaceState>>,
    delivery_interval: Duration,
    anchors: HashMap<ObjectId, Mat4>,
}

impl SimulatedSession {
    pub fn new(surface: Arc<RwLock<SurfaceState>>, delivery_interval: Duration) -> Self {
        Self {
            surface,
            delivery_interval,
            anchors: HashMap::new(),
        }
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }
}

impl SurfaceDetector for SimulatedSession {
    fn raycast(&mut self, query: &RaycastQuery) -> Vec<HitResult> {
        self.surface.write().hit(query)
    }

    fn track(&mut self, query: RaycastQuery, sink: DeliverySink) -> Box<dyn ServiceSubscription> {
        let surface = self.surface.clone();
        let period = self.delivery_interval;
        let subscription = sink.subscription();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let results = surface.write().hit(&query);
                if !sink.push(results) {
                    break;
                }
            }
            tracing::debug!(
                object = %subscription.object,
                generation = subscription.generation.0,
                "delivery task finished"
            );
        });

        Box::new(TaskSubscription(task))
    }

    fn add_or_update_anchor(&mut self, object: ObjectId, transform: Mat4) {
        tracing::debug!(object = %object, position = ?transform.w_axis.truncate(), "anchor updated");
        self.anchors.insert(object, transform);
    }

    fn remove_anchor(&mut self, object: ObjectId) {
        if self.anchors.remove(&object).is_some() {
            tracing::debug!(object = %object, "anchor removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placement::Alignment;

    #[test]
    fn ray_hits_plane_below() {
        let surface = SurfaceState::shared(0.5, 0.0, 1);
        let query = RaycastQuery::new(Vec3::new(1.0, 2.0, 0.0), Vec3::NEG_Y, Alignment::Any).unwrap();

        let hits = surface.write().hit(&query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].position(), Vec3::new(1.0, 0.5, 0.0));
        assert!((hits[0].distance - 1.5).abs() < 1e-6);
    }

    #[test]
    fn parallel_or_backward_rays_miss() {
        let surface = SurfaceState::shared(0.0, 0.0, 1);
        let parallel = RaycastQuery::new(Vec3::Y, Vec3::X, Alignment::Any).unwrap();
        let upward = RaycastQuery::new(Vec3::Y, Vec3::Y, Alignment::Any).unwrap();

        assert!(surface.write().hit(&parallel).is_empty());
        assert!(surface.write().hit(&upward).is_empty());
    }

    #[test]
    fn occlusion_and_vertical_only_queries_miss() {
        let surface = SurfaceState::shared(0.0, 0.0, 1);
        let walls = RaycastQuery::new(Vec3::Y, Vec3::NEG_Y, Alignment::Vertical).unwrap();
        assert!(surface.write().hit(&walls).is_empty());

        surface.write().occluded = true;
        let floor = RaycastQuery::new(Vec3::Y, Vec3::NEG_Y, Alignment::Any).unwrap();
        assert!(surface.write().hit(&floor).is_empty());
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let surface = SurfaceState::shared(0.0, 5.0, 7);
        let query = RaycastQuery::new(Vec3::Y, Vec3::NEG_Y, Alignment::Any).unwrap();
        for _ in 0..50 {
            let hit = surface.write().hit(&query)[0];
            let up = hit.world_transform.transform_vector3(Vec3::Y);
            // two independent tilts of at most 5 degrees each
            assert!(up.angle_between(Vec3::Y) <= 10f32.to_radians() + 1e-4);
        }
    }
}
