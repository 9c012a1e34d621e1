use crate::error::ConfigError;
use crate::pose::ORIENTATION_SMOOTHING;
use serde::Deserialize;
use std::path::Path;

/// Tuning for the pose tracker, loadable from a TOML file
///
/// ```toml
/// orientation_smoothing = 0.1
/// lost_after_empty_results = 30
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Slerp factor applied to orientation while an unconstrained object is dragged
    pub orientation_smoothing: f32,
    /// Consecutive empty deliveries after which an object is reported as lost.
    /// The transform is kept either way.
    pub lost_after_empty_results: Option<u32>,
    /// Upper bound on queued messages applied per `pump`; `None` drains everything
    pub max_deliveries_per_pump: Option<usize>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            orientation_smoothing: ORIENTATION_SMOOTHING,
            lost_after_empty_results: Some(30),
            max_deliveries_per_pump: None,
        }
    }
}

impl TrackingConfig {
    /// Load and validate a config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text; missing keys take their defaults
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: TrackingConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = self.orientation_smoothing;
        if !(s > 0.0 && s <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "orientation_smoothing must be in (0, 1], got {s}"
            )));
        }
        if self.lost_after_empty_results == Some(0) {
            return Err(ConfigError::Invalid(
                "lost_after_empty_results must be at least 1".to_string(),
            ));
        }
        if self.max_deliveries_per_pump == Some(0) {
            return Err(ConfigError::Invalid(
                "max_deliveries_per_pump must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
