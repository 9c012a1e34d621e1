//! Error types for the placement crate

use crate::ObjectId;
use thiserror::Error;

/// Conditions the pose tracker handles locally
///
/// None of these are failures from the caller's point of view: the tracker
/// logs them and keeps the last known good transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoseError {
    /// The query produced no results (surface momentarily not tracked)
    #[error("no hit result")]
    NoHitResult,

    /// The object has no established placement, or its scale has collapsed
    #[error("object {0} has no usable transform")]
    DegenerateTransform(ObjectId),

    /// No height baseline is available yet
    #[error("no reference height available")]
    MissingReferenceHeight,
}

/// Errors returned from placement requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The surface detector has no query to place against yet
    #[error("cannot place object {0}: no raycast query available")]
    CannotPlace(ObjectId),

    /// The object id is not known to the tracker
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
}

/// Errors loading a tracking configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for pose updates
pub type PoseResult<T> = std::result::Result<T, PoseError>;

/// Result type for placement requests
pub type PlacementResult<T> = std::result::Result<T, PlacementError>;
