//! Placement simulator
//!
//! Runs the pose tracker against a simulated AR session: an object is placed
//! from the screen centre, tracked while the surface reports noisy normals,
//! dragged across the screen, occluded for a while, then rescaled.
//! Use `--config <path>` to load tracker settings from TOML.

mod scene;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Mat4, Vec2, Vec3};
use placement::pose::{axis_scale, orientation, translation};
use placement::{
    Alignment, PoseTracker, RaycastQuery, SurfaceDetector, TrackingConfig, VirtualObject,
};
use scene::LoggingScene;
use session::{SimulatedSession, SurfaceState};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "placement-sim")]
#[command(about = "Drive the pose tracker with a simulated AR session", long_about = None)]
struct Args {
    /// Tracker config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the object to place
    #[arg(long, default_value = "chair")]
    model: String,

    /// Number of frames to simulate
    #[arg(long, default_value = "240")]
    frames: u32,

    /// Frame time in milliseconds
    #[arg(long, default_value = "16")]
    frame_ms: u64,

    /// Interval between tracking deliveries in milliseconds
    #[arg(long, default_value = "33")]
    delivery_ms: u64,

    /// Height of the detected floor plane
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    plane_height: f32,

    /// Maximum tilt of reported surface normals in degrees
    #[arg(long, default_value = "4.0")]
    jitter: f32,

    /// Seed for the surface noise
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Frame at which the drag starts
    #[arg(long, default_value = "60")]
    drag_from_frame: u32,

    /// Length of the drag in frames
    #[arg(long, default_value = "60")]
    drag_frames: u32,

    /// Frame at which the surface stops being tracked
    #[arg(long, default_value = "150")]
    occlude_from_frame: u32,

    /// Length of the occlusion in frames
    #[arg(long, default_value = "40")]
    occlude_frames: u32,

    /// Principal-axis scale applied once the run is over
    #[arg(long, default_value = "0.5")]
    scale: f32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Fixed handheld camera looking at the floor in front of the user
struct Camera {
    view: Mat4,
    projection: Mat4,
    viewport: Vec2,
}

impl Camera {
    fn handheld(floor: f32) -> Self {
        let eye = Vec3::new(0.0, floor + 1.4, 1.0);
        let target = Vec3::new(0.0, floor, -1.0);
        let viewport = Vec2::new(1170.0, 2532.0);
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(65f32.to_radians(), viewport.x / viewport.y, 0.01, 100.0),
            viewport,
        }
    }

    fn query_at(&self, point: Vec2) -> Option<RaycastQuery> {
        RaycastQuery::from_screen_point(point, self.viewport, self.view, self.projection, Alignment::Any)
    }

    fn centre(&self) -> Vec2 {
        self.viewport * 0.5
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = args.log_level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("placement={log_level},placement_sim={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Placement simulator v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => TrackingConfig::from_file(path)
            .with_context(|| format!("Failed to load tracker config {}", path.display()))?,
        None => TrackingConfig::default(),
    };
    tracing::info!(?config, "tracker config");

    let surface = SurfaceState::shared(args.plane_height, args.jitter, args.seed);
    let mut session = SimulatedSession::new(surface.clone(), Duration::from_millis(args.delivery_ms));
    let mut scene = LoggingScene::default();
    let mut tracker = PoseTracker::new(config);
    let camera = Camera::handheld(args.plane_height);

    // Place from the screen centre, like tapping the focus indicator
    let query = camera.query_at(camera.centre());
    let initial = query.and_then(|q| session.raycast(&q).into_iter().next());
    let id = tracker.insert(VirtualObject::new(args.model.clone(), Alignment::Any));
    tracker
        .place(id, query, initial, &mut session, &mut scene)
        .context("Initial placement failed")?;

    let commands = tracker.commands();
    let drag_end = args.drag_from_frame + args.drag_frames;
    let occlude_end = args.occlude_from_frame + args.occlude_frames;
    let mut interval = tokio::time::interval(Duration::from_millis(args.frame_ms));
    let mut last_query = query;

    for frame in 0..args.frames {
        interval.tick().await;

        // While dragging, the finger's own hit tests replace the tracked raycast
        if frame == args.drag_from_frame {
            tracing::info!(frame, "drag started");
            tracker.stop_tracking(id);
            commands.begin_drag(id);
        }
        if (args.drag_from_frame..drag_end).contains(&frame) {
            // Finger sweeps from the centre toward the right edge
            let progress = (frame - args.drag_from_frame) as f32 / args.drag_frames.max(1) as f32;
            let finger = camera.centre() + Vec2::new(progress * camera.viewport.x * 0.35, 0.0);
            if let Some(q) = camera.query_at(finger) {
                commands.update_once(id, q);
                last_query = Some(q);
            }
        }
        if frame == drag_end {
            tracing::info!(frame, "drag ended");
            commands.end_drag(id);
            if let Some(q) = last_query {
                tracker.begin_tracking(id, q, None, &mut session, &mut scene);
            }
        }

        if frame == args.occlude_from_frame {
            tracing::info!(frame, "surface occluded");
            surface.write().occluded = true;
        }
        if frame == occlude_end {
            tracing::info!(frame, "surface visible again");
            surface.write().occluded = false;
        }

        let stats = tracker.pump(&mut session, &mut scene);

        if frame % 20 == 0 {
            if let Some(obj) = tracker.object(id) {
                let t = obj.transform();
                let (axis, angle) = orientation(&t).to_axis_angle();
                tracing::info!(
                    frame,
                    position = ?translation(&t),
                    tilt_deg = angle.to_degrees(),
                    axis = ?axis,
                    scale = axis_scale(&t).x,
                    status = ?obj.status(),
                    applied = stats.applied,
                    empty = stats.empty,
                    stale = stats.stale,
                    "pose"
                );
            }
        }
    }

    // Freeze the object before rescaling; the next tracked hit would restore unit scale
    tracker.stop_tracking(id);
    tracker.set_uniform_scale(id, args.scale);
    if let Some(t) = tracker.transform(id) {
        tracing::info!(position = ?translation(&t), scale = axis_scale(&t).x, "final pose");
    }

    tracing::info!(
        anchors = session.anchor_count(),
        scene_nodes = scene.len(),
        "session ending"
    );
    tracker.reset(&mut session, &mut scene);

    Ok(())
}
