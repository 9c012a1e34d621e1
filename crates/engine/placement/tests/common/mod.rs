//! Test doubles for the surface detector and scene graph

#![allow(dead_code)]

use placement::glam::{Mat4, Quat, Vec3};
use placement::{
    DeliverySink, HitResult, ObjectId, RaycastQuery, SceneGraph, ServiceSubscription,
    SurfaceAlignment, SurfaceDetector,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct CountedSubscription(pub Arc<AtomicUsize>);

impl ServiceSubscription for CountedSubscription {
    fn cancel(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Detector whose synchronous answers are scripted and whose subscriptions
/// hand their sinks back to the test
#[derive(Default)]
pub struct ScriptedDetector {
    pub raycast_answers: VecDeque<Vec<HitResult>>,
    pub sinks: Vec<DeliverySink>,
    pub queries: Vec<RaycastQuery>,
    pub anchors: Vec<(ObjectId, Mat4)>,
    pub removed_anchors: Vec<ObjectId>,
    pub cancelled: Arc<AtomicUsize>,
}

impl ScriptedDetector {
    pub fn answer(&mut self, results: Vec<HitResult>) {
        self.raycast_answers.push_back(results);
    }

    pub fn last_sink(&self) -> DeliverySink {
        self.sinks.last().cloned().expect("no subscription opened")
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl SurfaceDetector for ScriptedDetector {
    fn raycast(&mut self, _query: &RaycastQuery) -> Vec<HitResult> {
        self.raycast_answers.pop_front().unwrap_or_default()
    }

    fn track(&mut self, query: RaycastQuery, sink: DeliverySink) -> Box<dyn ServiceSubscription> {
        self.queries.push(query);
        self.sinks.push(sink);
        Box::new(CountedSubscription(self.cancelled.clone()))
    }

    fn add_or_update_anchor(&mut self, object: ObjectId, transform: Mat4) {
        self.anchors.push((object, transform));
    }

    fn remove_anchor(&mut self, object: ObjectId) {
        self.removed_anchors.push(object);
    }
}

#[derive(Default)]
pub struct RecordingScene {
    pub attached: Vec<ObjectId>,
    pub detached: Vec<ObjectId>,
}

impl SceneGraph for RecordingScene {
    fn attach(&mut self, object: ObjectId, _transform: Mat4) {
        self.attached.push(object);
    }

    fn detach(&mut self, object: ObjectId) {
        self.detached.push(object);
    }
}

pub fn floor_hit(position: Vec3) -> HitResult {
    HitResult::new(
        Mat4::from_translation(position),
        SurfaceAlignment::Horizontal,
        position.length(),
    )
}

pub fn rotated_hit(rotation: Quat, position: Vec3) -> HitResult {
    HitResult::new(
        Mat4::from_rotation_translation(rotation, position),
        SurfaceAlignment::Horizontal,
        position.length(),
    )
}

pub fn wall_hit(position: Vec3) -> HitResult {
    HitResult::new(
        Mat4::from_rotation_translation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2), position),
        SurfaceAlignment::Vertical,
        position.length(),
    )
}

pub fn down_query() -> RaycastQuery {
    RaycastQuery::new(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, placement::Alignment::Any)
        .expect("valid direction")
}
