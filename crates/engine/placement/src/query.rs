//! Raycast queries and hit results
//!
//! A [`RaycastQuery`] is a world-space ray plus the surface alignment a
//! placed object is allowed to attach to. The surface detector answers with
//! zero or more [`HitResult`] snapshots, which are consumed once and dropped.

use glam::{Mat4, Vec2, Vec3};

/// Orientation of a detected real-world surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceAlignment {
    /// Floors, tables
    Horizontal,
    /// Walls
    Vertical,
}

/// Which surfaces an object may be placed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    Horizontal,
    Vertical,
    /// Unconstrained; the object follows whatever surface is hit
    #[default]
    Any,
}

impl Alignment {
    /// Check whether a surface of the given orientation satisfies this constraint
    pub fn accepts(self, surface: SurfaceAlignment) -> bool {
        match self {
            Alignment::Any => true,
            Alignment::Horizontal => surface == SurfaceAlignment::Horizontal,
            Alignment::Vertical => surface == SurfaceAlignment::Vertical,
        }
    }
}

/// Immutable snapshot of a single ray/surface intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// World transform of the hit point, oriented to the surface
    pub world_transform: Mat4,
    /// Which kind of surface was hit
    pub alignment: SurfaceAlignment,
    /// Distance from the ray origin
    pub distance: f32,
}

impl HitResult {
    pub fn new(world_transform: Mat4, alignment: SurfaceAlignment, distance: f32) -> Self {
        Self {
            world_transform,
            alignment,
            distance,
        }
    }

    /// World-space hit position
    pub fn position(&self) -> Vec3 {
        self.world_transform.w_axis.truncate()
    }
}

/// A ray against detected surfaces, restricted to an alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastQuery {
    /// Ray origin in world space
    pub origin: Vec3,
    /// Normalized ray direction
    pub direction: Vec3,
    /// Surfaces the query may report
    pub target: Alignment,
}

impl RaycastQuery {
    /// Create a query; returns `None` for a zero or non-finite direction
    pub fn new(origin: Vec3, direction: Vec3, target: Alignment) -> Option<Self> {
        let direction = direction.try_normalize()?;
        Some(Self {
            origin,
            direction,
            target,
        })
    }

    /// Build a query through a screen-space point of a perspective camera
    ///
    /// `point` is in pixels with the origin at the top-left corner of a
    /// viewport of size `viewport`. The ray starts at the camera position.
    pub fn from_screen_point(
        point: Vec2,
        viewport: Vec2,
        view: Mat4,
        projection: Mat4,
        target: Alignment,
    ) -> Option<Self> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }

        let proj_view = projection * view;
        let det = proj_view.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_proj_view = proj_view.inverse();

        let ndc = Vec2::new(
            2.0 * point.x / viewport.x - 1.0,
            1.0 - 2.0 * point.y / viewport.y,
        );

        // Depth 0.5 is finite for both [0, 1] and [-1, 1] clip conventions
        let through = inv_proj_view.project_point3(ndc.extend(0.5));
        let origin = view.inverse().w_axis.truncate();

        Self::new(origin, through - origin, target)
    }

    /// Point along the ray at distance `t`
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Keep only results on surfaces this query accepts, nearest first
    pub fn filter(&self, results: Vec<HitResult>) -> Vec<HitResult> {
        let mut kept: Vec<HitResult> = results
            .into_iter()
            .filter(|hit| self.target.accepts(hit.alignment))
            .collect();
        kept.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        kept
    }
}
