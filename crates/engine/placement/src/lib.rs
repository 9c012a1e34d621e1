//! Surface-anchored pose tracking for AR object placement
//!
//! This crate keeps placed virtual objects glued to the real-world surfaces
//! they sit on. A surface detector answers raycast queries with hit results,
//! either once or continuously through a subscription; the [`PoseTracker`]
//! turns those results into object transforms without visible pops.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  DeliverySink   ┌─────────────────────────┐
//! │ SurfaceDetector      │ ──────────────▶ │                         │
//! │ (any context)        │                 │  queue (tokio mpsc)     │
//! └──────────────────────┘                 │                         │
//! ┌──────────────────────┐ PoseCommandSender                        │
//! │ Gestures / UI        │ ──────────────▶ │                         │
//! └──────────────────────┘                 └────────────┬────────────┘
//!                                                       │ pump()
//!                                          ┌────────────▼────────────┐
//!                                          │ PoseTracker             │
//!                                          │ (render context, only   │
//!                                          │  writer of transforms)  │
//!                                          └────────────┬────────────┘
//!                                                       │ visible_transforms()
//!                                                       ▼
//!                                                   renderer
//! ```
//!
//! # Update rules
//!
//! - An initial placement result is applied as-is.
//! - While an object with [`Alignment::Any`] is dragged, position follows the
//!   hit exactly and orientation moves 10% of the way toward the hit
//!   orientation per update.
//! - Otherwise the hit transform is applied as-is.
//! - No result means no change: the last good pose is held.
//!
//! # Example
//!
//! ```rust,ignore
//! use placement::{Alignment, PoseTracker, RaycastQuery, TrackingConfig, VirtualObject};
//!
//! let mut tracker = PoseTracker::new(TrackingConfig::default());
//! let chair = tracker.insert(VirtualObject::new("chair", Alignment::Horizontal));
//! tracker.place(chair, Some(query), initial_hit, &mut session, &mut scene)?;
//!
//! // every frame, on the render thread
//! tracker.pump(&mut session, &mut scene);
//! for (id, transform) in tracker.visible_transforms() {
//!     renderer.draw(id, transform);
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod object;
pub mod pose;
pub mod query;
pub mod service;
pub mod subscription;
mod tracker;

pub use command::{PoseCommand, PoseCommandSender};
pub use config::TrackingConfig;
pub use error::{ConfigError, PlacementError, PlacementResult, PoseError, PoseResult};
pub use object::{ObjectId, Placement, TrackingStatus, VirtualObject};
pub use query::{Alignment, HitResult, RaycastQuery, SurfaceAlignment};
pub use service::{SceneGraph, ServiceSubscription, SurfaceDetector};
pub use subscription::{Delivery, DeliverySink, Generation, SubscriptionId, TrackingHandle};
pub use tracker::{PoseTracker, PumpStats};

// Re-export glam for convenience
pub use glam;
